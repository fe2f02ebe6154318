//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d};

pub use crate::data::slab::{AnyProjection, AnySlab};
pub use crate::data::{
    AnyVolume, ImgWriteVis, LevelWindow, ProjectedSlice, ScalarType, SlabPixel, Volume, VoxelSlab,
};

pub use crate::geometry::clipping::{calculate_clipped_plane_bounds, ClipRect, ClippedBounds};
pub use crate::geometry::reslice::{reslice, reslice_thick, ResliceInterpolation};
pub use crate::geometry::{AffineTransform3d, PlaneFrame, PlaneOrientation, VolumeGeometry};

pub use crate::thick::{project_any, project_thick_slab, ThickSliceMode};

pub use crate::color::{
    ColorMapping, ColorTransferFunction, LevelWindowFilter, LookupTable, LookupTableType,
    ScalarsToColors,
};

pub use crate::mapper::{MapperProps, RenderedSlice, RenderingMode, SliceMapper, ViewContext};
