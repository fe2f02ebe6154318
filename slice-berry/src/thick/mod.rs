//! 厚层投影: 把沿法向堆叠的若干层重切片合并为一张切片.
//!
//! 支持五种合并规则, 见 [`ThickSliceMode`]. MIP / MinIP / SUM / MEAN
//! 在像素原生类型上计算 (整数加法回绕, 整数除法截断), WEIGHTED 在浮点上计算,
//! 最后转换回像素类型.

use crate::data::slab::{AnyProjection, AnySlab};
use crate::data::{ProjectedSlice, SlabPixel, VoxelSlab};
use ndarray::{s, Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod error;

pub use error::{ProjectError, ProjectResult};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
    }
}

/// 厚层合并规则.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ThickSliceMode {
    /// 最大密度投影.
    Mip,
    /// 求和后除以层数 `N`. 名为求和, 实为均值.
    Sum,
    /// 高斯加权平均. 第一层不参与加权.
    Weighted,
    /// 最小密度投影.
    MinIp,
    /// 求和后除以 `N - 1` (单层时除以 1).
    Mean,
}

impl ThickSliceMode {
    /// 由模式编号解析: `0=MIP 1=SUM 2=WEIGHTED 3=MINIP 4=MEAN`.
    pub fn from_id(id: u8) -> Option<Self> {
        let ans = match id {
            0 => Self::Mip,
            1 => Self::Sum,
            2 => Self::Weighted,
            3 => Self::MinIp,
            4 => Self::Mean,
            _ => return None,
        };
        Some(ans)
    }

    /// 模式编号.
    pub const fn id(&self) -> u8 {
        match self {
            Self::Mip => 0,
            Self::Sum => 1,
            Self::Weighted => 2,
            Self::MinIp => 3,
            Self::Mean => 4,
        }
    }

    /// 由显示属性取值解析. `0` 表示关闭厚层模式, 其余取值为模式编号加一.
    #[inline]
    pub fn from_property(value: u8) -> Option<Self> {
        value.checked_sub(1).and_then(Self::from_id)
    }

    /// 对应的显示属性取值.
    #[inline]
    pub const fn property(&self) -> u8 {
        self.id() + 1
    }
}

/// 每个像素上的合并规则, 含预先算好的系数.
enum Kernel {
    Mip,
    MinIp,
    Sum { factor: f64 },
    Mean { divisor: usize },
    /// `weights[k]` 对应第 `k + 1` 层.
    Weighted { weights: Vec<f64> },
}

impl Kernel {
    fn new(mode: ThickSliceMode, z_min: i64, z_max: i64) -> Self {
        let span = (z_max - z_min) as usize;
        match mode {
            ThickSliceMode::Mip => Self::Mip,
            ThickSliceMode::MinIp => Self::MinIp,
            ThickSliceMode::Sum => Self::Sum {
                factor: 1.0 / (span + 1) as f64,
            },
            ThickSliceMode::Mean => Self::Mean {
                divisor: span.max(1),
            },
            ThickSliceMode::Weighted => Self::Weighted {
                weights: gaussian_weights(z_min, z_max),
            },
        }
    }

    fn combine<T: SlabPixel>(&self, lane: ArrayView1<T>) -> T {
        match self {
            Self::Mip => lane
                .iter()
                .skip(1)
                .fold(lane[0], |m, &v| if v > m { v } else { m }),
            Self::MinIp => lane
                .iter()
                .skip(1)
                .fold(lane[0], |m, &v| if v < m { v } else { m }),
            Self::Sum { factor } => {
                let sum = lane.iter().fold(T::zero(), |s, &v| s.native_add(v));
                T::from_f64(sum.to_f64() * factor)
            }
            Self::Mean { divisor } => lane
                .iter()
                .fold(T::zero(), |s, &v| s.native_add(v))
                .div_count(*divisor),
            Self::Weighted { weights } if weights.is_empty() => lane[0],
            Self::Weighted { weights } => {
                let v: f64 = weights
                    .iter()
                    .zip(lane.iter().skip(1))
                    .map(|(w, v)| w * v.to_f64())
                    .sum();
                T::from_f64(v)
            }
        }
    }

    /// `src` 为 `(depth, W)`, 即输出一行对应的所有层.
    fn fill_row<T: SlabPixel>(&self, src: ArrayView2<T>, mut row: ArrayViewMut1<T>) {
        for (out, lane) in row.iter_mut().zip(src.axis_iter(Axis(1))) {
            *out = self.combine(lane);
        }
    }
}

/// 第 `zMin + 1` 到 `zMax` 层的归一化高斯权重.
///
/// 权重为 `exp(-((z - mean) / sigma2))`, 其中 `mean = (zMin + zMax) / 2`,
/// `sigma2 = ((zMax - zMin) / 6)^2`. 单层时返回空表.
fn gaussian_weights(z_min: i64, z_max: i64) -> Vec<f64> {
    if z_max <= z_min {
        return Vec::new();
    }
    let mean = 0.5 * (z_min + z_max) as f64;
    let sigma = (z_max - z_min) as f64 / 6.0;
    let sigma2 = sigma * sigma;
    let mut weights: Vec<f64> = (z_min + 1..=z_max)
        .map(|z| (-((z as f64 - mean) / sigma2)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    weights.iter_mut().for_each(|w| *w /= total);
    weights
}

/// 把体素板在 `[z_min, z_max]` 内的层合并为一张切片.
///
/// 请求范围先裁剪到体素板的 z 范围; 裁剪后为空时返回 [`ProjectError::EmptyRange`],
/// 不产生输出. 结果只由输入决定.
pub fn project_thick_slab<T: SlabPixel>(
    slab: &VoxelSlab<T>,
    z_min: i64,
    z_max: i64,
    mode: ThickSliceMode,
) -> ProjectResult<ProjectedSlice<T>> {
    let (first, last) = slab.z_extent();
    let z_min = z_min.max(first);
    let z_max = z_max.min(last);
    if z_max < z_min {
        return Err(ProjectError::EmptyRange { z_min, z_max });
    }

    let lo = (z_min - first) as usize;
    let hi = (z_max - first) as usize;
    let data = slab.data();
    let layers = data.slice(s![lo..=hi, .., ..]);
    let kernel = Kernel::new(mode, z_min, z_max);
    log::trace!("厚层投影: {mode:?}, z = [{z_min}, {z_max}]");

    let mut out = Array2::from_elem(slab.layer_shape(), T::zero());
    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            out.axis_iter_mut(Axis(0))
                .into_par_iter()
                .zip(layers.axis_iter(Axis(1)).into_par_iter())
                .for_each(|(row, src)| kernel.fill_row(src, row));
        } else {
            out.axis_iter_mut(Axis(0))
                .zip(layers.axis_iter(Axis(1)))
                .for_each(|(row, src)| kernel.fill_row(src, row));
        }
    }
    Ok(ProjectedSlice::new(out))
}

/// [`project_thick_slab`] 的动态类型版本, 输出与输入同类型.
pub fn project_any(
    slab: &AnySlab,
    z_min: i64,
    z_max: i64,
    mode: ThickSliceMode,
) -> ProjectResult<AnyProjection> {
    dispatch_any!(AnySlab, slab, s => project_thick_slab(s, z_min, z_max, mode).map(AnyProjection::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr3, Array3};

    fn slab_of<T: SlabPixel>(layers: &[T]) -> VoxelSlab<T> {
        let data = Array3::from_shape_vec((layers.len(), 1, 1), layers.to_vec()).unwrap();
        VoxelSlab::new(data, 0)
    }

    fn project<T: SlabPixel>(layers: &[T], mode: ThickSliceMode) -> T {
        let n = layers.len() as i64;
        project_thick_slab(&slab_of(layers), 0, n - 1, mode).unwrap()[(0, 0)]
    }

    #[test]
    fn test_mode_ids() {
        for id in 0..5 {
            assert_eq!(ThickSliceMode::from_id(id).unwrap().id(), id);
        }
        assert_eq!(ThickSliceMode::from_id(5), None);
        assert_eq!(ThickSliceMode::from_property(0), None);
        assert_eq!(ThickSliceMode::from_property(1), Some(ThickSliceMode::Mip));
        assert_eq!(ThickSliceMode::from_property(5), Some(ThickSliceMode::Mean));
        assert_eq!(ThickSliceMode::MinIp.property(), 4);
    }

    #[test]
    fn test_mip_and_minip() {
        // 两层 1x2 图像: [1, 5] 与 [9, 3].
        let slab = VoxelSlab::new(arr3(&[[[1i16, 5]], [[9, 3]]]), 0);
        let mip = project_thick_slab(&slab, 0, 1, ThickSliceMode::Mip).unwrap();
        assert_eq!(mip.into_raw().into_raw_vec(), vec![9, 5]);
        let minip = project_thick_slab(&slab, 0, 1, ThickSliceMode::MinIp).unwrap();
        assert_eq!(minip.into_raw().into_raw_vec(), vec![1, 3]);
    }

    #[test]
    fn test_sum_and_mean_differ() {
        assert_eq!(project(&[10i16, 20], ThickSliceMode::Sum), 15);
        assert_eq!(project(&[10i16, 20], ThickSliceMode::Mean), 30);
        assert_eq!(project(&[10.0f32, 20.0], ThickSliceMode::Sum), 15.0);
        assert_eq!(project(&[10.0f32, 20.0], ThickSliceMode::Mean), 30.0);
    }

    #[test]
    fn test_native_semantics() {
        // 整数除法截断: (1 + 2 + 4) / 2 = 3.
        assert_eq!(project(&[1i32, 2, 4], ThickSliceMode::Mean), 3);
        // (1 + 2 + 4) / 3 = 2.33 -> 2.
        assert_eq!(project(&[1i32, 2, 4], ThickSliceMode::Sum), 2);
        // i16 累加溢出回绕: 30000 + 30000 = -5536, / 2 -> -2768.
        assert_eq!(project(&[30000i16, 30000], ThickSliceMode::Sum), -2768);
        // 单层.
        assert_eq!(project(&[42u8], ThickSliceMode::Mean), 42);
        assert_eq!(project(&[42u8], ThickSliceMode::Sum), 42);
    }

    #[test]
    fn test_weighted() {
        assert_eq!(project(&[42i16], ThickSliceMode::Weighted), 42);

        // 第一层不参与加权.
        assert_eq!(project(&[1000.0f64, 10.0], ThickSliceMode::Weighted), 10.0);

        let w = gaussian_weights(-1, 1);
        assert_eq!(w.len(), 2);
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(w[0] > w[1]);
        let v = project(&[0.0f64, 100.0, 200.0], ThickSliceMode::Weighted);
        assert!(v > 100.0 && v < 101.0);
    }

    #[test]
    fn test_range_clamp_and_empty() {
        let slab = VoxelSlab::new(arr3(&[[[1u8]], [[2]], [[3]]]), -1);
        // 请求 [-5, 5] 被裁剪为 [-1, 1].
        let p = project_thick_slab(&slab, -5, 5, ThickSliceMode::Mip).unwrap();
        assert_eq!(p[(0, 0)], 3);
        let p = project_thick_slab(&slab, 0, 0, ThickSliceMode::Mip).unwrap();
        assert_eq!(p[(0, 0)], 2);

        assert_eq!(
            project_thick_slab(&slab, 2, 5, ThickSliceMode::Mip),
            Err(ProjectError::EmptyRange { z_min: 2, z_max: 1 })
        );
        assert!(project_thick_slab(&slab, 1, 0, ThickSliceMode::Sum).is_err());
    }

    #[test]
    fn test_deterministic_and_shape() {
        let data = Array3::from_shape_fn((5, 7, 3), |(z, h, w)| ((z * 31 + h * 7 + w) % 13) as i16);
        let slab = VoxelSlab::new(data, -2);
        for id in 0..5 {
            let mode = ThickSliceMode::from_id(id).unwrap();
            let a = project_thick_slab(&slab, -2, 2, mode).unwrap();
            let b = project_thick_slab(&slab, -2, 2, mode).unwrap();
            assert_eq!(a.shape(), (7, 3));
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_project_any() {
        let slab: AnySlab = slab_of(&[1.5f32, 2.5]).into();
        match project_any(&slab, 0, 1, ThickSliceMode::Mip).unwrap() {
            AnyProjection::Float32(p) => assert_eq!(p[(0, 0)], 2.5),
            other => panic!("类型不一致: {other:?}"),
        }
    }
}
