//! 窗宽窗位滤波器: 把单分量切片或 RGB(A) 切片映射为 RGBA 纹理.

use super::{hsi_to_rgb, rgb_to_hsi, ColorTransferFunction, LookupTable, PiecewiseFunction};
use super::{lut::clamp_index, ScalarsToColors, TableScale};
use crate::consts::rgba::{MAX_INTENSITY, TRANSPARENT_BLACK};
use crate::consts::DEFAULT_MAX_OPACITY;
use crate::data::SlabPixel;
use crate::geometry::clipping::ClipRect;
use crate::Idx2d;
use image::{ImageResult, RgbaImage};
use ndarray::{Array3, ArrayView2, ArrayView3, ArrayViewMut2, Axis};
use std::path::Path;

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
    }
}

/// 按 `(H, W, 4)` 组织的 RGBA 纹理.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaTexture {
    data: Array3<u8>,
}

impl RgbaTexture {
    /// 全透明黑色纹理.
    pub fn transparent((height, width): Idx2d) -> Self {
        Self {
            data: Array3::zeros((height, width, 4)),
        }
    }

    /// `(H, W)`.
    #[inline]
    pub fn shape(&self) -> Idx2d {
        let (h, w, _) = self.data.dim();
        (h, w)
    }

    /// 像素 `(h, w)` 的颜色.
    pub fn get(&self, (h, w): Idx2d) -> Option<[u8; 4]> {
        let (height, width) = self.shape();
        (h < height && w < width).then(|| {
            let px = self.data.slice(ndarray::s![h, w, ..]);
            [px[0], px[1], px[2], px[3]]
        })
    }

    /// 底层 `(H, W, 4)` 数组.
    #[inline]
    pub fn as_array(&self) -> &Array3<u8> {
        &self.data
    }

    /// 转换为 `image` 的 RGBA 图像.
    pub fn to_image(&self) -> RgbaImage {
        let (height, width) = self.shape();
        RgbaImage::from_fn(width as u32, height as u32, |x, y| {
            let px = self.data.slice(ndarray::s![y as usize, x as usize, ..]);
            image::Rgba([px[0], px[1], px[2], px[3]])
        })
    }

    /// 保存为图片, 格式由扩展名决定.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        self.to_image().save(path)
    }
}

/// 逐行填充纹理, `f(x, y)` 给出像素 `(x, y)` 即 `(w, h)` 的颜色.
fn paint<F>(shape: Idx2d, f: F) -> RgbaTexture
where
    F: Fn(usize, usize) -> [u8; 4] + Sync,
{
    let mut texture = RgbaTexture::transparent(shape);
    let fill_row = |y: usize, mut row: ArrayViewMut2<u8>| {
        for (x, mut px) in row.axis_iter_mut(Axis(0)).enumerate() {
            px.iter_mut().zip(f(x, y)).for_each(|(dst, c)| *dst = c);
        }
    };
    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            texture
                .data
                .axis_iter_mut(Axis(0))
                .into_par_iter()
                .enumerate()
                .for_each(|(y, row)| fill_row(y, row));
        } else {
            texture
                .data
                .axis_iter_mut(Axis(0))
                .enumerate()
                .for_each(|(y, row)| fill_row(y, row));
        }
    }
    texture
}

/// `(v - lo) / (hi - lo)` 映射到 `[0, 255]` 并截断. 区间退化时为阶跃函数.
#[inline]
fn rescale_to_u8_range(v: f64, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        ((v - lo) * MAX_INTENSITY / (hi - lo)).clamp(0.0, MAX_INTENSITY)
    } else if v >= lo {
        MAX_INTENSITY
    } else {
        0.0
    }
}

#[inline]
fn unit_to_u8(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * MAX_INTENSITY + 0.5) as u8
}

/// 标量到颜色的映射方式.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorMapping {
    /// 查找表. 线性且无裁剪时走快速路径.
    LookupTable(LookupTable),
    /// 颜色传递函数, 可选不透明度函数. 无不透明度函数时完全不透明.
    TransferFunction {
        color: ColorTransferFunction,
        opacity: Option<PiecewiseFunction>,
    },
}

impl From<LookupTable> for ColorMapping {
    fn from(lut: LookupTable) -> Self {
        Self::LookupTable(lut)
    }
}

impl From<ColorTransferFunction> for ColorMapping {
    fn from(color: ColorTransferFunction) -> Self {
        Self::TransferFunction {
            color,
            opacity: None,
        }
    }
}

impl ScalarsToColors for ColorMapping {
    fn map_scalar(&self, value: f64) -> [u8; 4] {
        match self {
            Self::LookupTable(lut) => lut.map_scalar(value),
            Self::TransferFunction { color, opacity } => {
                let [r, g, b, a] = color.map_scalar(value);
                let a = opacity.as_ref().map_or(a, |f| unit_to_u8(f.value(value)));
                [r, g, b, a]
            }
        }
    }

    fn range(&self) -> (f64, f64) {
        match self {
            Self::LookupTable(lut) => lut.range(),
            Self::TransferFunction { color, .. } => color.range(),
        }
    }
}

/// 窗宽窗位滤波器.
///
/// 单分量输入经 [`ColorMapping`] 着色. RGB(A) 输入只在 HSI 空间调整亮度分量,
/// 第 4 分量经不透明度窗口 `[min_opacity, max_opacity]` 映射为 alpha.
/// 设置了裁剪矩形时, 矩形之外的像素为透明黑色.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelWindowFilter {
    mapping: ColorMapping,
    min_opacity: f64,
    max_opacity: f64,
    clip: Option<ClipRect>,
}

impl LevelWindowFilter {
    /// 以 `mapping` 着色, 不透明度窗口为 `[0, 255]`, 不裁剪.
    pub fn new<M: Into<ColorMapping>>(mapping: M) -> Self {
        Self {
            mapping: mapping.into(),
            min_opacity: 0.0,
            max_opacity: DEFAULT_MAX_OPACITY,
            clip: None,
        }
    }

    /// 设置裁剪矩形, 链式调用.
    #[inline]
    pub fn with_clip(mut self, clip: Option<ClipRect>) -> Self {
        self.clip = clip;
        self
    }

    /// 设置 RGBA 输入 alpha 分量的窗口, 链式调用.
    #[inline]
    pub fn with_opacity_window(mut self, min_opacity: f64, max_opacity: f64) -> Self {
        self.min_opacity = min_opacity;
        self.max_opacity = max_opacity;
        self
    }

    /// 着色方式.
    #[inline]
    pub fn mapping(&self) -> &ColorMapping {
        &self.mapping
    }

    /// 裁剪矩形.
    #[inline]
    pub fn clip(&self) -> Option<ClipRect> {
        self.clip
    }

    /// 设置裁剪矩形.
    #[inline]
    pub fn set_clip(&mut self, clip: Option<ClipRect>) {
        self.clip = clip;
    }

    /// `(min_opacity, max_opacity)`.
    #[inline]
    pub fn opacity_window(&self) -> (f64, f64) {
        (self.min_opacity, self.max_opacity)
    }

    /// 是否走查找表快速路径: 线性查找表且没有裁剪.
    pub fn uses_fast_path(&self) -> bool {
        matches!(&self.mapping, ColorMapping::LookupTable(lut) if lut.scale() == TableScale::Linear)
            && self.clip.is_none()
    }

    #[inline]
    fn inside_clip(&self, x: usize, y: usize) -> bool {
        self.clip.map_or(true, |c| c.contains(x as i64, y as i64))
    }

    /// 单分量切片 `(H, W)` -> RGBA 纹理.
    pub fn apply_scalar<T: SlabPixel>(&self, input: ArrayView2<T>) -> RgbaTexture {
        let shape = input.dim();
        match &self.mapping {
            ColorMapping::LookupTable(lut) if self.uses_fast_path() => {
                log::trace!("窗宽窗位: 查找表快速路径");
                let (scale, bias) = lut.linear_coefficients();
                let (table, nan) = (lut.table(), lut.nan_color());
                let n = table.len();
                paint(shape, |x, y| {
                    let v = input[(y, x)].to_f64();
                    if v.is_nan() {
                        nan
                    } else {
                        table[clamp_index(v * scale + bias, n)]
                    }
                })
            }
            mapping => {
                log::trace!("窗宽窗位: 通用路径, 裁剪 = {:?}", self.clip);
                paint(shape, |x, y| {
                    if self.inside_clip(x, y) {
                        mapping.map_scalar(input[(y, x)].to_f64())
                    } else {
                        TRANSPARENT_BLACK
                    }
                })
            }
        }
    }

    /// RGB(A) 切片 `(H, W, C)` -> RGBA 纹理, 各分量按 `[0, 255]` 理解.
    ///
    /// 亮度按映射的取值范围重新缩放到 `[0, 255]`, 色调与饱和度不变.
    /// `C` 不是 3 或 4 时返回 `None`.
    pub fn apply_rgb<T: SlabPixel>(&self, input: ArrayView3<T>) -> Option<RgbaTexture> {
        let (h, w, c) = input.dim();
        if c != 3 && c != 4 {
            log::warn!("窗宽窗位: 不支持 {c} 分量的图像");
            return None;
        }
        let (lo, hi) = self.mapping.range();
        let (min_op, max_op) = self.opacity_window();
        Some(paint((h, w), |x, y| {
            if !self.inside_clip(x, y) {
                return TRANSPARENT_BLACK;
            }
            let at = |k: usize| input[(y, x, k)].to_f64();
            let [hue, sat, intensity] = rgb_to_hsi([at(0), at(1), at(2)]);
            let intensity = rescale_to_u8_range(intensity, lo, hi);
            let [r, g, b] = hsi_to_rgb([hue, sat, intensity])
                .map(|v| (v.clamp(0.0, MAX_INTENSITY) + 0.5) as u8);
            let a = if c == 4 {
                (rescale_to_u8_range(at(3), min_op, max_op) + 0.5) as u8
            } else {
                u8::MAX
            };
            [r, g, b, a]
        }))
    }
}
