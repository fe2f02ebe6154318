//! 厚层投影的输入 (体素板) 与输出 (二维切片).

use crate::data::SlabPixel;
use crate::Idx2d;
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, ArrayViewMut2, Axis};
use std::ops::Index;

mod save;

pub use save::ImgWriteVis;

/// 沿切面法向堆叠的一叠重切片, 按 `(depth, H, W)` 组织.
///
/// 第 0 层对应 z 索引 `z_origin`, 因此层索引可以为负.
#[derive(Debug, Clone)]
pub struct VoxelSlab<T> {
    data: Array3<T>,
    z_origin: i64,
}

impl<T: SlabPixel> VoxelSlab<T> {
    /// 由 `(depth, H, W)` 数组创建, 第 0 层的 z 索引为 `z_origin`.
    #[inline]
    pub fn new(data: Array3<T>, z_origin: i64) -> Self {
        Self { data, z_origin }
    }

    /// `(depth, H, W)` 视图.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, T> {
        self.data.view()
    }

    /// 第 0 层的 z 索引.
    #[inline]
    pub fn z_origin(&self) -> i64 {
        self.z_origin
    }

    /// 层数.
    #[inline]
    pub fn depth(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// 每层的形状 `(H, W)`.
    #[inline]
    pub fn layer_shape(&self) -> Idx2d {
        let (_, h, w) = self.data.dim();
        (h, w)
    }

    /// 闭区间 `[z_first, z_last]`. 空板的 `z_last < z_first`.
    #[inline]
    pub fn z_extent(&self) -> (i64, i64) {
        (self.z_origin, self.z_origin + self.depth() as i64 - 1)
    }

    /// z 索引为 `z` 的层. 不存在时返回 `None`.
    pub fn layer(&self, z: i64) -> Option<ArrayView2<'_, T>> {
        let local = usize::try_from(z - self.z_origin).ok()?;
        (local < self.depth()).then(|| self.data.index_axis(Axis(0), local))
    }

    /// 取出底层数组.
    #[inline]
    pub fn into_raw(self) -> Array3<T> {
        self.data
    }
}

/// 单张二维切片, 按 `(H, W)` 组织. 重切片与厚层投影都输出该类型.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedSlice<T> {
    data: Array2<T>,
}

impl<T> Index<Idx2d> for ProjectedSlice<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl<T: SlabPixel> ProjectedSlice<T> {
    /// 由 `(H, W)` 数组创建.
    #[inline]
    pub fn new(data: Array2<T>) -> Self {
        Self { data }
    }

    /// 形状为 `(H, W)`, 以 `value` 填充.
    #[inline]
    pub fn from_elem(shape: Idx2d, value: T) -> Self {
        Self::new(Array2::from_elem(shape, value))
    }

    /// `(H, W)`.
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }

    /// 不可变视图.
    #[inline]
    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    /// 可变视图.
    #[inline]
    pub fn view_mut(&mut self) -> ArrayViewMut2<'_, T> {
        self.data.view_mut()
    }

    /// 越界时返回 `None`.
    #[inline]
    pub fn get(&self, index: Idx2d) -> Option<T> {
        self.data.get(index).copied()
    }

    /// 取出底层数组.
    #[inline]
    pub fn into_raw(self) -> Array2<T> {
        self.data
    }
}

any_pixel_enum!(
    /// 任意受支持标量类型的体素板.
    AnySlab(VoxelSlab)
);

any_pixel_enum!(
    /// 任意受支持标量类型的二维切片.
    AnyProjection(ProjectedSlice)
);

impl AnySlab {
    /// 闭区间 `[z_first, z_last]`.
    pub fn z_extent(&self) -> (i64, i64) {
        dispatch_any!(AnySlab, self, s => s.z_extent())
    }
}

impl AnyProjection {
    /// `(H, W)`.
    pub fn shape(&self) -> Idx2d {
        dispatch_any!(AnyProjection, self, s => s.shape())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, Array3};

    #[test]
    fn test_voxel_slab_extent() {
        let slab = VoxelSlab::new(Array3::<i16>::zeros((5, 2, 3)), -2);
        assert_eq!(slab.z_extent(), (-2, 2));
        assert_eq!(slab.depth(), 5);
        assert_eq!(slab.layer_shape(), (2, 3));
        assert!(slab.layer(-3).is_none());
        assert!(slab.layer(-2).is_some());
        assert!(slab.layer(2).is_some());
        assert!(slab.layer(3).is_none());

        let empty = VoxelSlab::new(Array3::<u8>::zeros((0, 2, 2)), 0);
        let (lo, hi) = empty.z_extent();
        assert!(hi < lo);
    }

    #[test]
    fn test_projected_slice() {
        let s = ProjectedSlice::new(arr2(&[[1u8, 2, 3], [4, 5, 6]]));
        assert_eq!(s.shape(), (2, 3));
        assert_eq!(s[(1, 2)], 6);
        assert_eq!(s.get((2, 0)), None);
        let z = ProjectedSlice::from_elem((1, 2), 7i32);
        assert_eq!(z.into_raw(), arr2(&[[7, 7]]));
    }
}
