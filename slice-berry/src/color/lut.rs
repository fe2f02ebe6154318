//! 查找表.

use super::ScalarsToColors;
use crate::consts::{rgba::NAN_COLOR, DEFAULT_TABLE_SIZE};
use crate::data::LevelWindow;
use once_cell::sync::Lazy;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 标量到表项序号的映射方式.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TableScale {
    /// 线性: `index = value * scale + bias`.
    #[default]
    Linear,
    /// 以 10 为底的对数. 仅在取值范围为正时生效, 否则退化为线性.
    Log10,
}

/// 预设查找表.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LookupTableType {
    /// 黑 -> 白.
    #[default]
    Grayscale,
    /// 白 -> 黑.
    InverseGrayscale,
    /// 两项: 透明黑与不透明白. 用于二值图像.
    LegacyBinary,
    /// 色调由蓝到红.
    LegacyRainbowColor,
    /// 黑 -> 红 -> 黄 -> 白.
    HotIron,
    /// 深蓝 -> 青 -> 黄 -> 深红.
    Jet,
}

#[inline]
fn unit_to_u8(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

/// 由 `[0, 1]` 上的颜色函数生成 256 项不透明查找表.
fn ramp<F: Fn(f64) -> [f64; 3]>(f: F) -> Vec<[u8; 4]> {
    (0..DEFAULT_TABLE_SIZE)
        .map(|k| {
            let [r, g, b] = f(k as f64 / (DEFAULT_TABLE_SIZE - 1) as f64);
            [unit_to_u8(r), unit_to_u8(g), unit_to_u8(b), u8::MAX]
        })
        .collect()
}

/// HSV -> RGB, 各分量属于 `[0, 1]`.
fn hsv_to_rgb(h: f64, s: f64, v: f64) -> [f64; 3] {
    let h = h.rem_euclid(1.0) * 6.0;
    let sector = h.floor();
    let f = h - sector;
    let (p, q, t) = (v * (1.0 - s), v * (1.0 - s * f), v * (1.0 - s * (1.0 - f)));
    match sector as u8 {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}

static GRAYSCALE: Lazy<Vec<[u8; 4]>> = Lazy::new(|| ramp(|t| [t, t, t]));

static INVERSE_GRAYSCALE: Lazy<Vec<[u8; 4]>> = Lazy::new(|| ramp(|t| [1.0 - t, 1.0 - t, 1.0 - t]));

static RAINBOW: Lazy<Vec<[u8; 4]>> =
    Lazy::new(|| ramp(|t| hsv_to_rgb(2.0 / 3.0 * (1.0 - t), 1.0, 1.0)));

static HOT_IRON: Lazy<Vec<[u8; 4]>> =
    Lazy::new(|| ramp(|t| [3.0 * t, 3.0 * t - 1.0, 3.0 * t - 2.0]));

static JET: Lazy<Vec<[u8; 4]>> = Lazy::new(|| {
    let ch = |t: f64, c: f64| 1.5 - (4.0 * t - c).abs();
    ramp(|t| [ch(t, 3.0), ch(t, 2.0), ch(t, 1.0)])
});

const BINARY: [[u8; 4]; 2] = [[0, 0, 0, 0], [255, 255, 255, 255]];

impl LookupTableType {
    /// 预设表项.
    pub fn entries(&self) -> &'static [[u8; 4]] {
        match self {
            Self::Grayscale => &GRAYSCALE,
            Self::InverseGrayscale => &INVERSE_GRAYSCALE,
            Self::LegacyBinary => &BINARY,
            Self::LegacyRainbowColor => &RAINBOW,
            Self::HotIron => &HOT_IRON,
            Self::Jet => &JET,
        }
    }

    /// 预设取值范围.
    pub fn default_range(&self) -> (f64, f64) {
        match self {
            Self::LegacyBinary => (0.0, 1.0),
            _ => (0.0, (DEFAULT_TABLE_SIZE - 1) as f64),
        }
    }
}

/// 浮点序号 -> 表项序号. 小于 0 (含 NaN) 取第一项, 超出末尾取最后一项.
#[inline]
pub(crate) fn clamp_index(f: f64, n: usize) -> usize {
    if !(f > 0.0) {
        0
    } else if f >= n as f64 {
        n - 1
    } else {
        f as usize
    }
}

/// 由 `N` 个 RGBA 表项和取值范围 `[lo, hi]` 构成的查找表.
///
/// 线性模式下, 标量 `v` 对应第 `clamp(v * scale + bias)` 项, 其中
/// `scale = N / (hi - lo)`, `bias = -lo * scale`. NaN 映射为 `nan_color`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "RawLookupTable")
)]
pub struct LookupTable {
    table: Vec<[u8; 4]>,
    range: (f64, f64),
    scale: TableScale,
    nan_color: [u8; 4],
}

/// 反序列化的中间形式, 经 [`LookupTable::new`] 的检查后才成为查找表.
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawLookupTable {
    table: Vec<[u8; 4]>,
    range: (f64, f64),
    scale: TableScale,
    nan_color: [u8; 4],
}

#[cfg(feature = "serde")]
impl TryFrom<RawLookupTable> for LookupTable {
    type Error = String;

    fn try_from(raw: RawLookupTable) -> Result<Self, Self::Error> {
        let mut lut = Self::new(raw.table, raw.range)
            .ok_or_else(|| format!("查找表为空或取值范围无效: {:?}", raw.range))?;
        lut.scale = raw.scale;
        lut.nan_color = raw.nan_color;
        Ok(lut)
    }
}

impl Default for LookupTable {
    fn default() -> Self {
        Self::from_type(LookupTableType::Grayscale)
    }
}

#[inline]
fn valid_range((lo, hi): (f64, f64)) -> bool {
    lo.is_finite() && hi.is_finite() && lo < hi
}

impl LookupTable {
    /// 表项为空或取值范围无效 (`lo >= hi`, 非有限值) 时返回 `None`.
    pub fn new(table: Vec<[u8; 4]>, range: (f64, f64)) -> Option<Self> {
        (!table.is_empty() && valid_range(range)).then_some(Self {
            table,
            range,
            scale: TableScale::Linear,
            nan_color: NAN_COLOR,
        })
    }

    /// 由预设创建.
    pub fn from_type(ty: LookupTableType) -> Self {
        Self {
            table: ty.entries().to_vec(),
            range: ty.default_range(),
            scale: TableScale::Linear,
            nan_color: NAN_COLOR,
        }
    }

    /// 全部表项.
    #[inline]
    pub fn table(&self) -> &[[u8; 4]] {
        &self.table
    }

    /// 表项个数, 至少为 1.
    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// 总是 `false`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// 设置取值范围. 范围无效时忽略, 返回 `false`.
    pub fn set_range(&mut self, lo: f64, hi: f64) -> bool {
        if !valid_range((lo, hi)) {
            log::warn!("查找表取值范围无效: [{lo}, {hi}]");
            return false;
        }
        self.range = (lo, hi);
        true
    }

    /// 取值范围设为窗口 `[lower, upper]`.
    #[inline]
    pub fn set_range_from_level_window(&mut self, lw: &LevelWindow) -> bool {
        self.set_range(lw.lower_bound(), lw.upper_bound())
    }

    /// 映射方式.
    #[inline]
    pub fn scale(&self) -> TableScale {
        self.scale
    }

    /// 设置映射方式.
    #[inline]
    pub fn set_scale(&mut self, scale: TableScale) {
        self.scale = scale;
    }

    /// NaN 对应的颜色.
    #[inline]
    pub fn nan_color(&self) -> [u8; 4] {
        self.nan_color
    }

    /// 设置 NaN 对应的颜色.
    #[inline]
    pub fn set_nan_color(&mut self, color: [u8; 4]) {
        self.nan_color = color;
    }

    /// 线性模式下的 `(scale, bias)`.
    #[inline]
    pub fn linear_coefficients(&self) -> (f64, f64) {
        let (lo, hi) = self.range;
        let scale = self.len() as f64 / (hi - lo);
        (scale, -lo * scale)
    }

    fn uses_log(&self) -> bool {
        self.scale == TableScale::Log10 && self.range.0 > 0.0
    }

    /// 非 NaN 标量 `v` 对应的表项序号.
    pub fn index_of(&self, v: f64) -> usize {
        let n = self.len();
        if self.uses_log() {
            if v <= 0.0 {
                return 0;
            }
            let (lo, hi) = (self.range.0.log10(), self.range.1.log10());
            clamp_index((v.log10() - lo) * n as f64 / (hi - lo), n)
        } else {
            let (scale, bias) = self.linear_coefficients();
            clamp_index(v * scale + bias, n)
        }
    }
}

impl ScalarsToColors for LookupTable {
    fn map_scalar(&self, value: f64) -> [u8; 4] {
        if value.is_nan() {
            self.nan_color
        } else {
            self.table[self.index_of(value)]
        }
    }

    #[inline]
    fn range(&self) -> (f64, f64) {
        self.range
    }
}
