#![warn(missing_docs)]

//! 核心库. 提供医学体数据的二维切片显示管线: 任意切面的裁剪与重采样,
//! 厚层投影, 窗宽窗位与伪彩着色, 以及按视图缓存的切片映射器.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 约定
//!
//! 1. 体数据数组按 `(z, H, W)` 组织, 与 nii 文件的 `(W, H, z)` 互为转置.
//! 2. 几何上的索引坐标写作 `[x, y, z]`, 对应数组的 `(W, H, z)`.
//! 3. 切片 (二维) 按 `(H, W)` 组织, 纹理像素 `(x, y)` 对应 `(W, H)`.
//!
//! # 开发计划
//!
//! ### 切面裁剪 ✅
//!
//! 体数据包围盒的 12 条边与切面求交, 得到切面上可见区域的矩形边界.
//!
//! 实现位于 `slice-berry/src/geometry/clipping.rs`.
//!
//! ### 任意切面重采样 ✅
//!
//! 最近邻与三线性插值; 厚层模式下沿法向多采样若干层.
//! 三次插值暂不提供.
//!
//! 实现位于 `slice-berry/src/geometry/reslice.rs`.
//!
//! ### 厚层投影 ✅
//!
//! MIP / MinIP / SUM / MEAN / WEIGHTED 五种合并规则.
//!
//! 实现位于 `slice-berry/src/thick`.
//!
//! ### 窗宽窗位与着色 ✅
//!
//! 1. 窗宽窗位对象及其一致性修正规则. ✅
//! 2. 查找表 (含预设), 颜色传递函数, 不透明度函数. ✅
//! 3. 查找表快速路径与通用路径, 裁剪矩形. ✅
//! 4. RGB(A) 图像只调整 HSI 空间的亮度分量. ✅
//!
//! 实现位于 `slice-berry/src/data/window.rs` 与 `slice-berry/src/color`.
//!
//! ### 切片映射器 ✅
//!
//! 按视图缓存输出, 仅在体数据, 切面或显示属性变化后重新生成;
//! 二值图像轮廓线.
//!
//! 实现位于 `slice-berry/src/mapper`.
//!
//! ### 三维多切面合成 ⌛️
//!
//! 暂不考虑.

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 对动态类型枚举 `$any` 的每个分支执行相同的表达式.
macro_rules! dispatch_any {
    ($enum: ident, $any: expr, $v: ident => $body: expr) => {
        match $any {
            $enum::UInt8($v) => $body,
            $enum::Int8($v) => $body,
            $enum::UInt16($v) => $body,
            $enum::Int16($v) => $body,
            $enum::UInt32($v) => $body,
            $enum::Int32($v) => $body,
            $enum::UInt64($v) => $body,
            $enum::Int64($v) => $body,
            $enum::Float32($v) => $body,
            $enum::Float64($v) => $body,
        }
    };
}

macro_rules! impl_any_from {
    ($name: ident, $inner: ident, $($ty: ty => $variant: ident),+ $(,)?) => {
        $(
            impl From<$inner<$ty>> for $name {
                #[inline]
                fn from(v: $inner<$ty>) -> Self {
                    Self::$variant(v)
                }
            }
        )+
    };
}

/// 生成以体素类型区分分支的动态类型枚举 `$name`, 每个分支包裹 `$inner<T>`.
macro_rules! any_pixel_enum {
    ($(#[$meta: meta])* $name: ident($inner: ident)) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub enum $name {
            /// `u8`.
            UInt8($inner<u8>),
            /// `i8`.
            Int8($inner<i8>),
            /// `u16`.
            UInt16($inner<u16>),
            /// `i16`.
            Int16($inner<i16>),
            /// `u32`.
            UInt32($inner<u32>),
            /// `i32`.
            Int32($inner<i32>),
            /// `u64`.
            UInt64($inner<u64>),
            /// `i64`.
            Int64($inner<i64>),
            /// `f32`.
            Float32($inner<f32>),
            /// `f64`.
            Float64($inner<f64>),
        }

        impl_any_from!(
            $name,
            $inner,
            u8 => UInt8,
            i8 => Int8,
            u16 => UInt16,
            i16 => Int16,
            u32 => UInt32,
            i32 => Int32,
            u64 => UInt64,
            i64 => Int64,
            f32 => Float32,
            f64 => Float64,
        );
    };
}

pub mod consts;

/// 体数据, 切片与窗宽窗位.
pub mod data;

pub mod color;
pub mod geometry;
pub mod mapper;
pub mod prelude;
pub mod stamp;
pub mod thick;

pub use data::{
    looks_binary, AnyVolume, ImgWriteVis, LevelWindow, OpenVolumeError, ProjectedSlice,
    ScalarStatistics, ScalarType, SlabPixel, Volume, VoxelSlab,
};
pub use color::{LevelWindowFilter, LookupTable, RgbaTexture, ScalarsToColors};
pub use geometry::clipping::{calculate_clipped_plane_bounds, ClipRect, ClippedBounds};
pub use mapper::{MapperError, MapperProps, RenderedSlice, SliceMapper};
pub use geometry::{AffineTransform3d, AxisAlignedBox3d, PlaneFrame, PlaneOrientation, VolumeGeometry};
pub use stamp::ModifiedTime;
pub use thick::{project_any, project_thick_slab, ProjectError, ThickSliceMode};
