//! 标量统计量, 以及二值图像判定.

use crate::data::{SlabPixel, Volume};
use ndarray::Axis;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 最小值, 最大值, 次小值, 次大值.
///
/// 次小值是严格大于最小值的最小值, 不存在时等于最大值;
/// 次大值是严格小于最大值的最大值, 不存在时等于最小值.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScalarStatistics {
    /// 最小值.
    pub min: f64,
    /// 最大值.
    pub max: f64,
    /// 次小值.
    pub min2nd: f64,
    /// 次大值.
    pub max2nd: f64,
}

impl ScalarStatistics {
    /// 单次遍历计算统计量. NaN 被忽略; 没有有效值时返回 `None`.
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut min2nd = f64::INFINITY;
        let mut max2nd = f64::NEG_INFINITY;
        let mut any = false;
        for v in values.into_iter().filter(|v| !v.is_nan()) {
            any = true;
            if v < min {
                min2nd = min;
                min = v;
            } else if v > min && v < min2nd {
                min2nd = v;
            }
            if v > max {
                max2nd = max;
                max = v;
            } else if v < max && v > max2nd {
                max2nd = v;
            }
        }
        if !any {
            return None;
        }
        if min2nd == f64::INFINITY {
            min2nd = max;
        }
        if max2nd == f64::NEG_INFINITY {
            max2nd = min;
        }
        Some(Self {
            min,
            max,
            min2nd,
            max2nd,
        })
    }

    /// 是否恰好只有两种取值 (或只有一种).
    #[inline]
    pub fn is_two_valued(&self) -> bool {
        self.max == self.min2nd && self.min == self.max2nd
    }
}

/// 判断体数据是否 "看起来像" 二值图像.
///
/// 先只统计中间层; 若中间层是常量或两值的, 不足以下结论, 再统计整个体数据.
/// 最终当且仅当统计结果恰为两值时返回 `true`. 空体数据返回 `false`.
pub fn looks_binary<T: SlabPixel>(volume: &Volume<T>) -> bool {
    let data = volume.data();
    let depth = data.len_of(Axis(0));
    if depth == 0 {
        return false;
    }
    let central = data.index_axis(Axis(0), depth / 2);
    let stats = match ScalarStatistics::from_values(central.iter().map(|v| v.to_f64())) {
        Some(s) if !(s.is_two_valued() || s.min == s.max) => s,
        _ => match ScalarStatistics::from_values(data.iter().map(|v| v.to_f64())) {
            Some(s) => s,
            None => return false,
        },
    };
    stats.is_two_valued()
}

#[cfg(test)]
mod tests {
    use super::{looks_binary, ScalarStatistics};
    use crate::data::Volume;
    use crate::geometry::VolumeGeometry;
    use ndarray::Array3;

    fn volume(data: Array3<i16>) -> Volume<i16> {
        Volume::new(data, VolumeGeometry::from_spacing([1.0; 3], [0.0; 3], true))
    }

    #[test]
    fn test_statistics() {
        let s = ScalarStatistics::from_values([3.0, 1.0, 4.0, 1.0, 5.0, f64::NAN, 9.0, 2.0]).unwrap();
        assert_eq!((s.min, s.max, s.min2nd, s.max2nd), (1.0, 9.0, 2.0, 5.0));
        assert!(!s.is_two_valued());

        let s = ScalarStatistics::from_values([0.0, 1.0, 1.0, 0.0]).unwrap();
        assert_eq!((s.min, s.max, s.min2nd, s.max2nd), (0.0, 1.0, 1.0, 0.0));
        assert!(s.is_two_valued());

        let s = ScalarStatistics::from_values([7.0]).unwrap();
        assert_eq!((s.min2nd, s.max2nd), (7.0, 7.0));

        assert!(ScalarStatistics::from_values([f64::NAN]).is_none());
        assert!(ScalarStatistics::from_values(std::iter::empty()).is_none());
    }

    #[test]
    fn test_looks_binary() {
        let mut mask = Array3::<i16>::zeros((3, 4, 4));
        mask[(1, 1, 1)] = 1;
        mask[(2, 2, 2)] = 1;
        assert!(looks_binary(&volume(mask)));

        let mut gray = Array3::<i16>::zeros((3, 4, 4));
        gray[(1, 0, 0)] = -1000;
        gray[(1, 1, 1)] = 40;
        gray[(1, 2, 2)] = 400;
        assert!(!looks_binary(&volume(gray)));

        // 中间层是常量, 但其他层有第三种取值.
        let mut mixed = Array3::<i16>::zeros((3, 2, 2));
        mixed[(0, 0, 0)] = 1;
        mixed[(2, 0, 0)] = 2;
        assert!(!looks_binary(&volume(mixed)));

        assert!(!looks_binary(&volume(Array3::zeros((0, 2, 2)))));
    }
}
