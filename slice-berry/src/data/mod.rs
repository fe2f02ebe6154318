use std::fmt::{Display, Formatter};
use std::ops::{Add, Index, Mul};
use std::path::Path;

use nalgebra::{Matrix3, Quaternion, UnitQuaternion, Vector3};
use ndarray::{Array3, ArrayView2, ArrayView3, ArrayViewMut3, Axis, Ix3};
use nifti::{DataElement, InMemNiftiObject, IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::geometry::{AffineTransform3d, AxisAlignedBox3d, VolumeGeometry};
use crate::stamp::ModifiedTime;
use crate::{Idx2d, Idx3d};

mod pixel;
/// 厚层投影的输入与输出.
pub mod slab;
mod stats;
/// 窗宽窗位.
pub mod window;

pub use pixel::{ScalarType, SlabPixel};
pub use slab::{ImgWriteVis, ProjectedSlice, VoxelSlab};
pub use stats::{looks_binary, ScalarStatistics};
pub use window::LevelWindow;

/// 打开体数据文件时的错误.
#[derive(Debug, Clone, PartialEq)]
pub enum OpenVolumeError {
    /// 文件读取或解析失败.
    Nifti(String),

    /// 头部 `datatype` 不是受支持的标量类型.
    UnsupportedScalarType(i16),

    /// 数据不是三维的.
    Shape,
}

impl Display for OpenVolumeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nifti(e) => write!(f, "无法读取 nii 文件: {e}"),
            Self::UnsupportedScalarType(code) => write!(f, "不支持的体素类型 (datatype = {code})"),
            Self::Shape => f.write_str("体数据必须是三维的"),
        }
    }
}

impl std::error::Error for OpenVolumeError {}

impl From<nifti::NiftiError> for OpenVolumeError {
    fn from(e: nifti::NiftiError) -> Self {
        Self::Nifti(e.to_string())
    }
}

impl From<ndarray::ShapeError> for OpenVolumeError {
    fn from(_: ndarray::ShapeError) -> Self {
        Self::Shape
    }
}

/// 打开体数据的结果.
pub type OpenVolumeResult<T> = Result<T, OpenVolumeError>;

/// 由 nii 头部推断索引到世界坐标的变换.
///
/// 依次尝试: `sform_code > 0` 时使用 `srow_*` 仿射矩阵;
/// `qform_code > 0` 时使用四元数旋转, `pixdim` 缩放 (含 `qfac`) 与 `qoffset`;
/// 都没有时只使用 `pixdim` 对角缩放.
/// nii 的体素坐标指向体素中心, 因此总是图像几何.
fn geometry_from_header(h: &NiftiHeader) -> VolumeGeometry {
    let m = if h.sform_code > 0 {
        let row = |r: [f32; 4]| r.map(f64::from);
        AffineTransform3d::from_rows([
            row(h.srow_x),
            row(h.srow_y),
            row(h.srow_z),
            [0.0, 0.0, 0.0, 1.0],
        ])
    } else if h.qform_code > 0 {
        qform_transform(h)
    } else {
        AffineTransform3d::scaling(pixdim_spacing(h))
    };
    VolumeGeometry::new(m, true)
}

/// `pixdim[1..4]`, 非正值按 1 处理.
fn pixdim_spacing(h: &NiftiHeader) -> [f64; 3] {
    let [_, pw, ph, pz, ..] = h.pixdim;
    [pw, ph, pz].map(|v| if v > 0.0 { f64::from(v) } else { 1.0 })
}

/// qform: `R * diag(dx, dy, qfac * dz)`, 平移为 `quatern_{x,y,z}`.
///
/// 四元数只存 `(b, c, d)`, `a` 由单位长度补出; `b² + c² + d² > 1` 时取 `a = 0`
/// 并重新单位化. `pixdim[0] < 0` 时 `qfac = -1`, 其余情况为 `1`.
fn qform_transform(h: &NiftiHeader) -> AffineTransform3d {
    let [b, c, d] = [h.quatern_b, h.quatern_c, h.quatern_d].map(f64::from);
    let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();
    let rotation = UnitQuaternion::from_quaternion(Quaternion::new(a, b, c, d)).to_rotation_matrix();
    let qfac = if h.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
    let [dx, dy, dz] = pixdim_spacing(h);
    let linear = rotation.matrix() * Matrix3::from_diagonal(&Vector3::new(dx, dy, qfac * dz));
    let col = |k: usize| [linear[(0, k)], linear[(1, k)], linear[(2, k)]];
    let offset = [h.quatern_x, h.quatern_y, h.quatern_z].map(f64::from);
    AffineTransform3d::from_columns(col(0), col(1), col(2), offset)
}

/// 三维标量体数据, 附带空间几何和修改时间.
///
/// 数据按 `(z, H, W)` 组织. 以后均按照该模式访问.
#[derive(Debug, Clone)]
pub struct Volume<T> {
    data: Array3<T>,
    geometry: VolumeGeometry,
    mtime: ModifiedTime,
}

impl<T> Index<Idx3d> for Volume<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl<T: SlabPixel> Volume<T> {
    /// 由 `(z, H, W)` 数组和几何创建.
    #[inline]
    pub fn new(data: Array3<T>, geometry: VolumeGeometry) -> Self {
        Self {
            data,
            geometry,
            mtime: ModifiedTime::now(),
        }
    }

    /// 数据的不可变视图.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, T> {
        self.data.view()
    }

    /// 数据的可变视图. 会更新修改时间.
    #[inline]
    pub fn data_mut(&mut self) -> ArrayViewMut3<'_, T> {
        self.touch();
        self.data.view_mut()
    }

    /// 空间几何.
    #[inline]
    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    /// 替换几何. 会更新修改时间.
    pub fn set_geometry(&mut self, geometry: VolumeGeometry) {
        self.geometry = geometry;
        self.touch();
    }

    /// 最近修改时间.
    #[inline]
    pub fn mtime(&self) -> ModifiedTime {
        self.mtime
    }

    /// 标记数据已被修改.
    #[inline]
    pub fn touch(&mut self) {
        self.mtime = ModifiedTime::now();
    }

    /// 以 `(w, h, d)` 表示的形状, 与索引坐标 `[x, y, z]` 的顺序一致.
    #[inline]
    pub fn shape_xyz(&self) -> Idx3d {
        let (z, h, w) = self.data.dim();
        (w, h, z)
    }

    /// 水平切片形状 `(H, W)`.
    #[inline]
    pub fn slice_shape(&self) -> Idx2d {
        let (_, h, w) = self.data.dim();
        (h, w)
    }

    /// 水平切片个数.
    #[inline]
    pub fn len_z(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// 索引空间包围盒.
    #[inline]
    pub fn bounding_box(&self) -> AxisAlignedBox3d {
        AxisAlignedBox3d::from_shape(self.shape_xyz())
    }

    /// 按索引坐标 `[x, y, z]` 取值, 越界返回 `None`.
    #[inline]
    pub fn get_index(&self, x: usize, y: usize, z: usize) -> Option<T> {
        self.data.get((z, y, x)).copied()
    }

    /// 第 `z_index` 层水平切片. 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> ArrayView2<'_, T> {
        self.data.index_axis(Axis(0), z_index)
    }

    /// 全体数据的统计量. 空体数据返回 `None`.
    pub fn statistics(&self) -> Option<ScalarStatistics> {
        ScalarStatistics::from_values(self.data.iter().map(|v| v.to_f64()))
    }
}

impl<T> Volume<T>
where
    T: SlabPixel + DataElement + Add<Output = T> + Mul<Output = T>,
{
    /// 打开 nii 文件格式的体数据. 文件中的体素会被转换为 `T`.
    pub fn open<P: AsRef<Path>>(path: P) -> OpenVolumeResult<Self> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        Self::from_object(obj)
    }

    fn from_object(obj: InMemNiftiObject) -> OpenVolumeResult<Self> {
        let geometry = geometry_from_header(obj.header());

        // [W, H, z] -> [z, H, W].
        // hint: 原第一维向下增长, 原第二维向右增长.
        let data = obj
            .into_volume()
            .into_ndarray::<T>()?
            .permuted_axes([2, 1, 0].as_slice());
        let data = data
            .as_standard_layout()
            .into_owned()
            .into_dimensionality::<Ix3>()?;
        Ok(Self::new(data, geometry))
    }
}

any_pixel_enum!(
    /// 任意受支持标量类型的体数据.
    AnyVolume(Volume)
);

impl AnyVolume {
    /// 打开 nii 文件, 按头部 `datatype` 选择体素类型.
    ///
    /// 不受支持的类型 (复数, RGB 等) 返回 [`OpenVolumeError::UnsupportedScalarType`].
    pub fn open<P: AsRef<Path>>(path: P) -> OpenVolumeResult<Self> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let code = obj.header().datatype;
        let ty = ScalarType::from_nifti_code(code)
            .ok_or(OpenVolumeError::UnsupportedScalarType(code))?;
        log::debug!("打开体数据: datatype = {code} ({ty})");
        let ans = match ty {
            ScalarType::UInt8 => Self::UInt8(Volume::from_object(obj)?),
            ScalarType::Int8 => Self::Int8(Volume::from_object(obj)?),
            ScalarType::UInt16 => Self::UInt16(Volume::from_object(obj)?),
            ScalarType::Int16 => Self::Int16(Volume::from_object(obj)?),
            ScalarType::UInt32 => Self::UInt32(Volume::from_object(obj)?),
            ScalarType::Int32 => Self::Int32(Volume::from_object(obj)?),
            ScalarType::UInt64 => Self::UInt64(Volume::from_object(obj)?),
            ScalarType::Int64 => Self::Int64(Volume::from_object(obj)?),
            ScalarType::Float32 => Self::Float32(Volume::from_object(obj)?),
            ScalarType::Float64 => Self::Float64(Volume::from_object(obj)?),
        };
        Ok(ans)
    }

    /// 体素类型.
    pub fn scalar_type(&self) -> ScalarType {
        fn of<T: SlabPixel>(_: &Volume<T>) -> ScalarType {
            T::SCALAR
        }
        dispatch_any!(AnyVolume, self, v => of(v))
    }

    /// 以 `(w, h, d)` 表示的形状.
    pub fn shape_xyz(&self) -> Idx3d {
        dispatch_any!(AnyVolume, self, v => v.shape_xyz())
    }

    /// 空间几何.
    pub fn geometry(&self) -> &VolumeGeometry {
        dispatch_any!(AnyVolume, self, v => v.geometry())
    }

    /// 全体数据的统计量.
    pub fn statistics(&self) -> Option<ScalarStatistics> {
        dispatch_any!(AnyVolume, self, v => v.statistics())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> VolumeGeometry {
        VolumeGeometry::from_spacing([0.5, 0.5, 2.0], [0.0; 3], true)
    }

    #[test]
    fn test_volume_shape_and_index() {
        let data = Array3::from_shape_fn((2, 3, 4), |(z, h, w)| (z * 100 + h * 10 + w) as i16);
        let v = Volume::new(data, geometry());
        assert_eq!(v.shape_xyz(), (4, 3, 2));
        assert_eq!(v.slice_shape(), (3, 4));
        assert_eq!(v.len_z(), 2);
        assert_eq!(v.get_index(3, 2, 1), Some(123));
        assert_eq!(v.get_index(4, 0, 0), None);
        assert_eq!(v[(1, 2, 3)], 123);
        assert_eq!(v.slice_at(1)[(0, 1)], 101);
        assert_eq!(v.bounding_box().max(), [4.0, 3.0, 2.0]);
    }

    #[test]
    fn test_volume_mtime() {
        let mut v = Volume::new(Array3::<u8>::zeros((1, 1, 1)), geometry());
        let t0 = v.mtime();
        v.data_mut()[(0, 0, 0)] = 1;
        assert!(v.mtime() > t0);
        let t1 = v.mtime();
        v.set_geometry(geometry());
        assert!(v.mtime() > t1);
    }

    #[test]
    fn test_any_volume() {
        let v: AnyVolume = Volume::new(Array3::<f32>::zeros((2, 2, 2)), geometry()).into();
        assert_eq!(v.scalar_type(), ScalarType::Float32);
        assert_eq!(v.shape_xyz(), (2, 2, 2));
        assert_eq!(v.geometry().spacing(), [0.5, 0.5, 2.0]);
        assert_eq!(v.statistics().map(|s| s.max), Some(0.0));
    }

    fn assert_point_eq(actual: [f64; 3], expected: [f64; 3]) {
        for (a, e) in actual.into_iter().zip(expected) {
            assert!((a - e).abs() < 1e-5, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn test_geometry_from_header_pixdim() {
        let mut h = NiftiHeader::default();
        h.sform_code = 0;
        h.qform_code = 0;
        h.pixdim = [1.0, 0.8, 0.8, 2.5, 0.0, 0.0, 0.0, 0.0];
        let g = geometry_from_header(&h);
        assert!(g.is_image_geometry());
        assert_point_eq(g.index_to_world().transform_point([1.0, 1.0, 2.0]), [0.8, 0.8, 5.0]);

        // 非正间距按 1 处理
        h.pixdim = [1.0, 0.0, -2.0, 2.5, 0.0, 0.0, 0.0, 0.0];
        let g = geometry_from_header(&h);
        assert_point_eq(g.index_to_world().transform_point([1.0, 1.0, 2.0]), [1.0, 1.0, 5.0]);
    }

    #[test]
    fn test_geometry_from_header_qform() {
        let mut h = NiftiHeader::default();
        h.sform_code = 0;
        h.qform_code = 1;
        // 绕 z 轴旋转 180 度, qfac = -1
        h.quatern_b = 0.0;
        h.quatern_c = 0.0;
        h.quatern_d = 1.0;
        h.quatern_x = 10.0;
        h.quatern_y = 20.0;
        h.quatern_z = -5.0;
        h.pixdim = [-1.0, 0.8, 0.8, 2.5, 0.0, 0.0, 0.0, 0.0];
        let g = geometry_from_header(&h);
        assert!(g.is_image_geometry());
        assert_point_eq(g.index_to_world().transform_point([0.0; 3]), [10.0, 20.0, -5.0]);
        assert_point_eq(g.index_to_world().transform_point([1.0, 2.0, 3.0]), [9.2, 18.4, -12.5]);

        // 单位四元数: 只剩缩放与平移
        h.quatern_d = 0.0;
        h.pixdim[0] = 1.0;
        let g = geometry_from_header(&h);
        assert_point_eq(g.index_to_world().transform_point([1.0, 2.0, 3.0]), [10.8, 21.6, 2.5]);
    }

    #[test]
    fn test_geometry_from_header_sform() {
        let mut h = NiftiHeader::default();
        h.sform_code = 1;
        h.qform_code = 1;
        h.quatern_d = 1.0;
        h.srow_x = [-1.0, 0.0, 0.0, 10.0];
        h.srow_y = [0.0, -1.0, 0.0, 20.0];
        h.srow_z = [0.0, 0.0, 3.0, -5.0];
        // sform 优先于 qform
        let g = geometry_from_header(&h);
        assert_eq!(g.index_to_world().transform_point([1.0, 2.0, 3.0]), [9.0, 18.0, 4.0]);
    }

    #[test]
    fn test_open_missing_file() {
        let path = std::env::temp_dir().join("slice-berry-does-not-exist.nii");
        assert!(matches!(Volume::<i16>::open(&path), Err(OpenVolumeError::Nifti(_))));
        assert!(matches!(AnyVolume::open(&path), Err(OpenVolumeError::Nifti(_))));
    }
}
