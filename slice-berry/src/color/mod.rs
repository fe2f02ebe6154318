//! 标量到颜色的映射: 查找表, 颜色传递函数, HSI 色彩空间与窗宽窗位滤波器.

mod filter;
mod hsi;
mod lut;
mod transfer;

pub use filter::{ColorMapping, LevelWindowFilter, RgbaTexture};
pub use hsi::{hsi_to_rgb, rgb_to_hsi};
pub use lut::{LookupTable, LookupTableType, TableScale};
pub use transfer::{ColorTransferFunction, PiecewiseFunction};

/// 把单个标量映射为 RGBA 颜色.
pub trait ScalarsToColors {
    /// 标量 `value` 对应的颜色.
    fn map_scalar(&self, value: f64) -> [u8; 4];

    /// 映射的有效取值范围 `(lo, hi)`.
    fn range(&self) -> (f64, f64);
}
