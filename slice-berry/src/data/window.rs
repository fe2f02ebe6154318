use crate::consts::{DEFAULT_RANGE_MAX, DEFAULT_RANGE_MIN};
use crate::data::ScalarStatistics;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 窗宽窗位 (level / window).
///
/// 除当前窗口 `[lower, upper]` 外, 还维护窗口允许的取值范围 `[range_min, range_max]`
/// 以及一组默认值. 每次修改后都会按固定规则修正, 保证:
///
/// 1. `range_min < range_max`;
/// 2. `range_min <= lower < upper <= range_max`.
///
/// 窗口被固定 (`fixed`) 后, 所有修改操作都不生效.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LevelWindow {
    lower: f64,
    upper: f64,
    range_min: f64,
    range_max: f64,
    default_lower: f64,
    default_upper: f64,
    default_level: f64,
    default_window: f64,
    fixed: bool,
}

impl Default for LevelWindow {
    /// 覆盖 `[0, 255]` 的窗口.
    fn default() -> Self {
        Self::new(127.5, 255.0)
    }
}

impl LevelWindow {
    /// 以窗位 `level`, 窗宽 `window` 创建. 取值范围默认为 `[-2048, 4096]`,
    /// 必要时扩展以容纳该窗口.
    pub fn new(level: f64, window: f64) -> Self {
        let mut ans = Self {
            lower: level - window / 2.0,
            upper: level + window / 2.0,
            range_min: DEFAULT_RANGE_MIN,
            range_max: DEFAULT_RANGE_MAX,
            default_lower: DEFAULT_RANGE_MIN,
            default_upper: DEFAULT_RANGE_MAX,
            default_level: level,
            default_window: window,
            fixed: false,
        };
        ans.set_level_window(level, window, true);
        ans
    }

    /// 窗下限.
    #[inline]
    pub fn lower_bound(&self) -> f64 {
        self.lower
    }

    /// 窗上限.
    #[inline]
    pub fn upper_bound(&self) -> f64 {
        self.upper
    }

    /// 窗位.
    #[inline]
    pub fn level(&self) -> f64 {
        (self.lower + self.upper) / 2.0
    }

    /// 窗宽.
    #[inline]
    pub fn window(&self) -> f64 {
        self.upper - self.lower
    }

    /// 取值范围下界.
    #[inline]
    pub fn range_min(&self) -> f64 {
        self.range_min
    }

    /// 取值范围上界.
    #[inline]
    pub fn range_max(&self) -> f64 {
        self.range_max
    }

    /// 取值范围的跨度.
    #[inline]
    pub fn range(&self) -> f64 {
        self.range_max - self.range_min
    }

    /// 默认窗口下界.
    #[inline]
    pub fn default_lower_bound(&self) -> f64 {
        self.default_lower
    }

    /// 默认窗口上界.
    #[inline]
    pub fn default_upper_bound(&self) -> f64 {
        self.default_upper
    }

    /// 默认窗位.
    #[inline]
    pub fn default_level(&self) -> f64 {
        self.default_level
    }

    /// 默认窗宽.
    #[inline]
    pub fn default_window(&self) -> f64 {
        self.default_window
    }

    /// 窗口是否被固定.
    #[inline]
    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// 固定或解除固定. 固定后其余修改操作都不生效.
    #[inline]
    pub fn set_fixed(&mut self, fixed: bool) {
        self.fixed = fixed;
    }

    /// 按窗位窗宽设置窗口. 见 [`LevelWindow::set_window_bounds`].
    pub fn set_level_window(&mut self, level: f64, window: f64, expand_range: bool) {
        self.set_window_bounds(level - window / 2.0, level + window / 2.0, expand_range);
    }

    /// 按上下限设置窗口.
    ///
    /// 若 `expand_range` 为 `true`, 先交换颠倒的上下限, 再扩展取值范围以容纳窗口;
    /// 否则窗口会被压缩进当前取值范围.
    pub fn set_window_bounds(&mut self, lower: f64, upper: f64, expand_range: bool) {
        if self.fixed {
            return;
        }
        self.lower = lower;
        self.upper = upper;
        if expand_range {
            if self.lower > self.upper {
                std::mem::swap(&mut self.lower, &mut self.upper);
            }
            if self.lower <= self.range_min {
                self.range_min = self.lower;
            }
            if self.upper >= self.range_max {
                self.range_max = self.upper;
            }
        }
        self.ensure_consistency();
    }

    /// 设置取值范围, 当前窗口随之压缩.
    pub fn set_range_min_max(&mut self, min: f64, max: f64) {
        if self.fixed {
            return;
        }
        self.range_min = min;
        self.range_max = max;
        self.ensure_consistency();
    }

    /// 设置默认取值范围. 颠倒时交换, 相等时下限取 `upper - 1`.
    pub fn set_default_boundaries(&mut self, lower: f64, upper: f64) {
        if self.fixed {
            return;
        }
        let (mut lower, upper) = if lower > upper {
            (upper, lower)
        } else {
            (lower, upper)
        };
        if lower == upper {
            lower = upper - 1.0;
        }
        self.default_lower = lower;
        self.default_upper = upper;
    }

    /// 记录默认窗位窗宽, 供 [`LevelWindow::reset_default_level_window`] 使用.
    #[inline]
    pub fn set_default_level_window(&mut self, level: f64, window: f64) {
        self.default_level = level;
        self.default_window = window;
    }

    /// 恢复默认窗位窗宽.
    pub fn reset_default_level_window(&mut self) {
        self.set_level_window(self.default_level, self.default_window, true);
    }

    /// 恢复默认取值范围.
    pub fn reset_default_range_min_max(&mut self) {
        self.set_range_min_max(self.default_lower, self.default_upper);
    }

    /// 由数据统计量自动设置取值范围与窗口, 窗口覆盖全部数据.
    pub fn set_auto(&mut self, stats: &ScalarStatistics) {
        if self.fixed {
            return;
        }
        let max = stats.max;
        let min = if stats.min == max {
            max - 1.0
        } else {
            self.set_range_min_max(stats.min, max);
            self.set_default_boundaries(stats.min, max);
            stats.min
        };
        self.set_window_bounds(min, max, true);
        self.set_default_level_window((max - min) / 2.0 + min, max - min);
    }

    fn ensure_consistency(&mut self) {
        if self.range_min > self.range_max {
            std::mem::swap(&mut self.range_min, &mut self.range_max);
        }
        if self.range_min == self.range_max {
            self.range_min = self.range_max - 1.0;
        }

        if self.lower > self.upper {
            std::mem::swap(&mut self.lower, &mut self.upper);
        }
        if self.lower <= self.range_min {
            self.lower = self.range_min;
        }
        if self.upper <= self.range_min {
            self.upper = self.range_min + 1.0;
        }
        if self.lower >= self.range_max {
            self.lower = self.range_max - 1.0;
        }
        if self.upper >= self.range_max {
            self.upper = self.range_max;
        }
        if self.lower == self.upper {
            self.lower = (self.upper - 1.0).max(self.range_min);
        }
    }

    /// 求 `value` 在当前窗口下对应的灰度值 (0 <= value <= 255).
    ///
    /// 如果 `value` 无意义 (如 inf, NaN), 则返回 `None`.
    pub fn eval_u8(&self, value: f64) -> Option<u8> {
        if !value.is_finite() {
            return None;
        }
        if value <= self.lower {
            Some(u8::MIN)
        } else if value >= self.upper {
            Some(u8::MAX)
        } else {
            // 255, not 256.
            Some(((value - self.lower) / self.window() * 255.0) as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LevelWindow;
    use crate::data::ScalarStatistics;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn bounds(lw: &LevelWindow) -> (f64, f64) {
        (lw.lower_bound(), lw.upper_bound())
    }

    fn wide() -> LevelWindow {
        let mut lw = LevelWindow::new(0.0, 100.0);
        lw.set_range_min_max(-10000.0, 10000.0);
        lw
    }

    #[test]
    fn test_new() {
        let lw = LevelWindow::new(256.0, 500.0);
        assert_eq!(bounds(&lw), (6.0, 506.0));
        assert!(f64_eq(lw.level(), 256.0));
        assert!(f64_eq(lw.window(), 500.0));
        assert_eq!((lw.range_min(), lw.range_max()), (-2048.0, 4096.0));

        let lw = LevelWindow::default();
        assert_eq!(bounds(&lw), (0.0, 255.0));

        // 超出默认范围时扩展.
        let lw = LevelWindow::new(5000.0, 2000.0);
        assert_eq!(bounds(&lw), (4000.0, 6000.0));
        assert_eq!(lw.range_max(), 6000.0);
    }

    #[test]
    fn test_set_window_bounds() {
        let mut lw = LevelWindow::new(0.0, 2.0);
        lw.set_window_bounds(0.0, 2.0, true);
        assert!(f64_eq(lw.level(), 1.0));
        assert!(f64_eq(lw.window(), 2.0));

        let mut lw = wide();
        lw.set_window_bounds(5000.0, 5000.0, true);
        assert_eq!(bounds(&lw), (4999.0, 5000.0));

        let mut lw = wide();
        lw.set_window_bounds(11000.0, 12000.0, false);
        assert_eq!(bounds(&lw), (9999.0, 10000.0));

        let mut lw = wide();
        lw.set_window_bounds(11000.0, 12000.0, true);
        assert_eq!(bounds(&lw), (11000.0, 12000.0));
        assert_eq!(lw.range_max(), 12000.0);

        let mut lw = wide();
        lw.set_window_bounds(-12000.0, -11000.0, false);
        assert_eq!(bounds(&lw), (-10000.0, -9999.0));

        let mut lw = wide();
        lw.set_window_bounds(11000.0, 11000.0, true);
        assert_eq!(bounds(&lw), (10999.0, 11000.0));

        let mut lw = wide();
        lw.set_window_bounds(300.0, 100.0, true);
        assert_eq!(bounds(&lw), (100.0, 300.0));
    }

    #[test]
    fn test_set_range_min_max() {
        let mut lw = wide();
        lw.set_range_min_max(2000.0, 2000.0);
        assert_eq!((lw.range_min(), lw.range_max()), (1999.0, 2000.0));
        assert!(lw.lower_bound() >= lw.range_min());
        assert!(lw.upper_bound() <= lw.range_max());
        assert!(lw.lower_bound() < lw.upper_bound());

        lw.set_range_min_max(2100.0, 2000.0);
        assert_eq!((lw.range_min(), lw.range_max()), (2000.0, 2100.0));
        lw.reset_default_range_min_max();
        assert_eq!((lw.range_min(), lw.range_max()), (-2048.0, 4096.0));
    }

    #[test]
    fn test_default_boundaries() {
        let mut lw = LevelWindow::default();
        lw.set_default_boundaries(2000.0, 2000.0);
        assert_eq!((lw.default_lower_bound(), lw.default_upper_bound()), (1999.0, 2000.0));
        lw.set_default_boundaries(2100.0, 2000.0);
        assert_eq!((lw.default_lower_bound(), lw.default_upper_bound()), (2000.0, 2100.0));
    }

    #[test]
    fn test_reset_default_level_window() {
        let mut lw = LevelWindow::new(40.0, 400.0);
        lw.set_level_window(1000.0, 10.0, true);
        assert!(f64_eq(lw.level(), 1000.0));
        lw.reset_default_level_window();
        assert!(f64_eq(lw.level(), 40.0));
        assert!(f64_eq(lw.window(), 400.0));
    }

    #[test]
    fn test_fixed() {
        let mut lw = LevelWindow::new(40.0, 400.0);
        lw.set_fixed(true);
        lw.set_level_window(1000.0, 10.0, true);
        lw.set_range_min_max(0.0, 1.0);
        assert!(f64_eq(lw.level(), 40.0));
        assert_eq!(lw.range_min(), -2048.0);
        lw.set_fixed(false);
        lw.set_level_window(1000.0, 10.0, true);
        assert!(f64_eq(lw.level(), 1000.0));
    }

    #[test]
    fn test_set_auto() {
        let stats = ScalarStatistics::from_values([-1000.0, 0.0, 50.0, 3000.0]).unwrap();
        let mut lw = LevelWindow::default();
        lw.set_auto(&stats);
        assert_eq!(bounds(&lw), (-1000.0, 3000.0));
        assert_eq!((lw.range_min(), lw.range_max()), (-1000.0, 3000.0));
        assert!(f64_eq(lw.default_level(), 1000.0));

        let stats = ScalarStatistics::from_values([7.0, 7.0]).unwrap();
        let mut lw = LevelWindow::default();
        lw.set_auto(&stats);
        assert_eq!(bounds(&lw), (6.0, 7.0));
    }

    #[test]
    fn test_eval_u8() {
        // [60, 100]
        let lw = LevelWindow::new(80.0, 40.0);
        assert_eq!(lw.eval_u8(f64::NAN), None);
        assert_eq!(lw.eval_u8(f64::NEG_INFINITY), None);
        assert_eq!(lw.eval_u8(50.0), Some(0));
        assert_eq!(lw.eval_u8(60.0), Some(0));
        assert_eq!(lw.eval_u8(60.1), Some(0));
        assert_eq!(lw.eval_u8(70.0), Some((255.0 * 0.25) as u8));
        assert_eq!(lw.eval_u8(80.0), Some((255.0 * 0.5) as u8));
        assert_eq!(lw.eval_u8(99.999), Some(254));
        assert_eq!(lw.eval_u8(100.0), Some(255));
    }
}
