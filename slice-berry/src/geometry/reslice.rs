//! 沿任意切面对体数据重采样.

use super::{norm, normalized, AffineTransform3d, PlaneFrame, Vec3, VolumeGeometry};
use crate::data::slab::AnySlab;
use crate::data::{AnyVolume, ProjectedSlice, SlabPixel, Volume, VoxelSlab};
use ndarray::{Array2, Array3, ArrayView3, ArrayViewMut1, ArrayViewMut2, Axis};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
    }
}

/// 重采样插值方式.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ResliceInterpolation {
    /// 最近邻.
    #[default]
    Nearest,
    /// 三线性.
    Linear,
}

/// 厚层模式下相邻两层之间的距离 (毫米): `1 / |W2I(n)|`, 即沿法向前进一个体素的长度.
///
/// 法向为零或体数据几何奇异时返回 `None`.
pub fn thick_slab_z_spacing(normal_world: Vec3, geometry: &VolumeGeometry) -> Option<f64> {
    let n = normalized(normal_world)?;
    let len = norm(geometry.world_to_index()?.transform_vector(n));
    (len > 0.0).then(|| 1.0 / len)
}

/// 体数据在连续索引坐标下的采样器. 体素中心已平移到整数索引.
struct Sampler<'a, T> {
    data: ArrayView3<'a, T>,
    center: f64,
    interpolation: ResliceInterpolation,
    background: T,
}

impl<T: SlabPixel> Sampler<'_, T> {
    fn sample(&self, idx: Vec3) -> T {
        let (d, h, w) = self.data.dim();
        let [x, y, z] = idx.map(|v| v - self.center);
        match self.interpolation {
            ResliceInterpolation::Nearest => {
                let [i, j, k] = [x, y, z].map(|v| (v + 0.5).floor());
                if i < 0.0 || j < 0.0 || k < 0.0 {
                    return self.background;
                }
                let (i, j, k) = (i as usize, j as usize, k as usize);
                if i < w && j < h && k < d {
                    self.data[(k, j, i)]
                } else {
                    self.background
                }
            }
            ResliceInterpolation::Linear => {
                let inside = |v: f64, n: usize| n > 0 && v >= 0.0 && v <= (n - 1) as f64;
                if !(inside(x, w) && inside(y, h) && inside(z, d)) {
                    return self.background;
                }
                let (x0, y0, z0) = (x.floor(), y.floor(), z.floor());
                let (fx, fy, fz) = (x - x0, y - y0, z - z0);
                let (x0, y0, z0) = (x0 as usize, y0 as usize, z0 as usize);
                let (x1, y1, z1) = ((x0 + 1).min(w - 1), (y0 + 1).min(h - 1), (z0 + 1).min(d - 1));
                let at = |k: usize, j: usize, i: usize| self.data[(k, j, i)].to_f64();
                let lerp = |a: f64, b: f64, t: f64| a + (b - a) * t;
                let c00 = lerp(at(z0, y0, x0), at(z0, y0, x1), fx);
                let c01 = lerp(at(z0, y1, x0), at(z0, y1, x1), fx);
                let c10 = lerp(at(z1, y0, x0), at(z1, y0, x1), fx);
                let c11 = lerp(at(z1, y1, x0), at(z1, y1, x1), fx);
                let v = lerp(lerp(c00, c01, fy), lerp(c10, c11, fy), fz);
                if T::SCALAR.is_integer() {
                    T::from_f64(v.round())
                } else {
                    T::from_f64(v)
                }
            }
        }
    }

    /// 填充切面的第 `j` 行. `offset` 是附加在每个采样点上的索引空间偏移.
    fn fill_row(&self, plane_to_index: &AffineTransform3d, offset: Vec3, j: usize, mut row: ArrayViewMut1<T>) {
        for (i, out) in row.iter_mut().enumerate() {
            let p = plane_to_index.transform_point([i as f64, j as f64, 0.0]);
            *out = self.sample([p[0] + offset[0], p[1] + offset[1], p[2] + offset[2]]);
        }
    }

    fn fill_layer(&self, plane_to_index: &AffineTransform3d, offset: Vec3, mut layer: ArrayViewMut2<T>) {
        cfg_if::cfg_if! {
            if #[cfg(feature = "rayon")] {
                layer
                    .axis_iter_mut(Axis(0))
                    .into_par_iter()
                    .enumerate()
                    .for_each(|(j, row)| self.fill_row(plane_to_index, offset, j, row));
            } else {
                layer
                    .axis_iter_mut(Axis(0))
                    .enumerate()
                    .for_each(|(j, row)| self.fill_row(plane_to_index, offset, j, row));
            }
        }
    }
}

/// 切面像素索引 -> 体数据索引.
fn plane_to_index<T>(volume: &Volume<T>, plane: &PlaneFrame) -> Option<AffineTransform3d>
where
    T: SlabPixel,
{
    let w2i = volume.geometry().world_to_index()?;
    Some(plane.transform().then(&w2i))
}

fn sampler<T: SlabPixel>(
    volume: &Volume<T>,
    interpolation: ResliceInterpolation,
    background: T,
) -> Sampler<'_, T> {
    Sampler {
        data: volume.data(),
        center: volume.geometry().voxel_center_offset(),
        interpolation,
        background,
    }
}

/// 在切面像素 `(i, j, 0)` 处采样, 输出 `(H, W)` 切片. 体数据之外的采样点取 `background`.
///
/// 体数据几何奇异时返回 `None`.
pub fn reslice<T: SlabPixel>(
    volume: &Volume<T>,
    plane: &PlaneFrame,
    interpolation: ResliceInterpolation,
    background: T,
) -> Option<ProjectedSlice<T>> {
    let to_index = plane_to_index(volume, plane)?;
    let (w, h) = plane.extent();
    let mut out = Array2::from_elem((h, w), background);
    sampler(volume, interpolation, background).fill_layer(&to_index, [0.0; 3], out.view_mut());
    Some(ProjectedSlice::new(out))
}

/// 沿法向采样 `2 * num + 1` 层, 层间距见 [`thick_slab_z_spacing`].
///
/// 第 `k` 层 (`k` 属于 `[-num, num]`) 的采样点为切面像素沿法向平移 `k * dz` 毫米,
/// 输出体素板的 z 范围为 `[-num, num]`. 几何奇异时返回 `None`.
pub fn reslice_thick<T: SlabPixel>(
    volume: &Volume<T>,
    plane: &PlaneFrame,
    interpolation: ResliceInterpolation,
    background: T,
    num: u32,
) -> Option<VoxelSlab<T>> {
    let to_index = plane_to_index(volume, plane)?;
    let w2i = volume.geometry().world_to_index()?;
    let normal = plane.normal();
    let dz = thick_slab_z_spacing(normal, volume.geometry())?;
    let step = w2i.transform_vector(normal.map(|v| v * dz));

    let num = i64::from(num);
    let (w, h) = plane.extent();
    let depth = (2 * num + 1) as usize;
    let mut out = Array3::from_elem((depth, h, w), background);
    let sampler = sampler(volume, interpolation, background);
    for (layer, k) in out.axis_iter_mut(Axis(0)).zip(-num..=num) {
        let kf = k as f64;
        sampler.fill_layer(&to_index, step.map(|v| v * kf), layer);
    }
    Some(VoxelSlab::new(out, -num))
}

impl AnyVolume {
    /// [`reslice_thick`] 的动态类型版本, 背景值为 0.
    pub fn reslice_thick(
        &self,
        plane: &PlaneFrame,
        interpolation: ResliceInterpolation,
        num: u32,
    ) -> Option<AnySlab> {
        dispatch_any!(AnyVolume, self, v => {
            reslice_thick(v, plane, interpolation, SlabPixel::zero(), num).map(AnySlab::from)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PlaneOrientation;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// 值等于 `100 z + 10 y + x` 的 4x3x5 体数据.
    fn ramp(image_geometry: bool) -> Volume<i32> {
        let data = Array3::from_shape_fn((5, 3, 4), |(z, y, x)| (100 * z + 10 * y + x) as i32);
        Volume::new(data, VolumeGeometry::from_spacing([1.0, 1.0, 2.0], [0.0; 3], image_geometry))
    }

    #[test]
    fn test_z_spacing() {
        let g = VolumeGeometry::from_spacing([0.5, 0.5, 2.5], [0.0; 3], true);
        assert!(f64_eq(thick_slab_z_spacing([0.0, 0.0, 1.0], &g).unwrap(), 2.5));
        assert!(f64_eq(thick_slab_z_spacing([3.0, 0.0, 0.0], &g).unwrap(), 0.5));
        assert!(thick_slab_z_spacing([0.0; 3], &g).is_none());
    }

    #[test]
    fn test_reslice_axial_matches_slice() {
        for image_geometry in [true, false] {
            let v = ramp(image_geometry);
            let plane = PlaneFrame::standard(PlaneOrientation::Axial, v.geometry(), v.shape_xyz(), 3)
                .unwrap();
            for interp in [ResliceInterpolation::Nearest, ResliceInterpolation::Linear] {
                let s = reslice(&v, &plane, interp, -1).unwrap();
                assert_eq!(s.view(), v.slice_at(3));
            }
        }
    }

    #[test]
    fn test_reslice_background() {
        let v = ramp(true);
        let plane = PlaneFrame::new([-10.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0; 3], (12, 1))
            .unwrap();
        let s = reslice(&v, &plane, ResliceInterpolation::Nearest, -7).unwrap();
        assert_eq!(s[(0, 0)], -7);
        assert_eq!(s[(0, 10)], 0);
        assert_eq!(s[(0, 11)], 1);
    }

    #[test]
    fn test_reslice_linear_midpoint() {
        let v = ramp(true);
        // 位于 x = 0.5 处, 两个体素中心的正中.
        let plane = PlaneFrame::new([0.5, 1.0, 2.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0; 3], (1, 1))
            .unwrap();
        let v = Volume::new(
            v.data().mapv(|x| x as f32),
            *v.geometry(),
        );
        let s = reslice(&v, &plane, ResliceInterpolation::Linear, 0.0).unwrap();
        assert!(f64_eq(s[(0, 0)] as f64, 110.5));
    }

    #[test]
    fn test_reslice_thick_layers() {
        let v = ramp(true);
        let plane = PlaneFrame::standard(PlaneOrientation::Axial, v.geometry(), v.shape_xyz(), 2)
            .unwrap();
        let slab = reslice_thick(&v, &plane, ResliceInterpolation::Nearest, -1, 2).unwrap();
        assert_eq!(slab.z_extent(), (-2, 2));
        for k in -2..=2i64 {
            let expected = v.slice_at((2 + k) as usize);
            assert_eq!(slab.layer(k).unwrap(), expected);
        }

        // 越出体数据的层取背景值.
        let plane = PlaneFrame::standard(PlaneOrientation::Axial, v.geometry(), v.shape_xyz(), 0)
            .unwrap();
        let slab = reslice_thick(&v, &plane, ResliceInterpolation::Nearest, -1, 1).unwrap();
        assert!(slab.layer(-1).unwrap().iter().all(|&x| x == -1));
        assert_eq!(slab.layer(0).unwrap(), v.slice_at(0));
    }

    #[test]
    fn test_any_volume_thick_pipeline() {
        let v = ramp(true);
        let plane = PlaneFrame::standard(PlaneOrientation::Axial, v.geometry(), v.shape_xyz(), 2)
            .unwrap();
        let any: AnyVolume = v.into();
        let slab = any.reslice_thick(&plane, ResliceInterpolation::Nearest, 1).unwrap();
        assert_eq!(slab.z_extent(), (-1, 1));
        let out = crate::thick::project_any(&slab, -1, 1, crate::ThickSliceMode::Mip).unwrap();
        assert_eq!(out.shape(), (3, 4));
        match out {
            crate::data::slab::AnyProjection::Int32(p) => assert_eq!(p[(2, 3)], 323),
            other => panic!("类型不一致: {other:?}"),
        }
    }
}
