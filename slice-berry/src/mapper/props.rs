//! 切片显示属性.

use crate::color::{
    ColorMapping, ColorTransferFunction, LevelWindowFilter, LookupTable, LookupTableType,
    PiecewiseFunction,
};
use crate::consts::{BINARY_LAYER, BINARY_OPACITY, DEFAULT_MAX_OPACITY, THICK_SLICES_MIN_NUM};
use crate::data::{looks_binary, LevelWindow, SlabPixel, Volume};
use crate::geometry::reslice::ResliceInterpolation;
use crate::stamp::ModifiedTime;
use crate::thick::ThickSliceMode;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 单分量图像的着色方式.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RenderingMode {
    /// 查找表, 取值范围由窗宽窗位决定.
    #[default]
    LookupTableLevelWindowColor,
    /// 颜色传递函数, 外加不透明度窗口.
    ColorTransferFunctionLevelWindowColor,
    /// 查找表, 使用其自身的取值范围.
    LookupTableColor,
    /// 颜色传递函数.
    ColorTransferFunctionColor,
}

impl RenderingMode {
    /// 由属性编号 `0..=3` 创建.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::LookupTableLevelWindowColor),
            1 => Some(Self::ColorTransferFunctionLevelWindowColor),
            2 => Some(Self::LookupTableColor),
            3 => Some(Self::ColorTransferFunctionColor),
            _ => None,
        }
    }

    /// 属性编号.
    pub const fn id(&self) -> u8 {
        match self {
            Self::LookupTableLevelWindowColor => 0,
            Self::ColorTransferFunctionLevelWindowColor => 1,
            Self::LookupTableColor => 2,
            Self::ColorTransferFunctionColor => 3,
        }
    }

    #[inline]
    fn uses_level_window(&self) -> bool {
        matches!(
            self,
            Self::LookupTableLevelWindowColor | Self::ColorTransferFunctionLevelWindowColor
        )
    }
}

/// 为每个字段生成 getter 和会更新修改时间的 setter.
macro_rules! props_accessors {
    ($($(#[$meta: meta])* $field: ident, $setter: ident: $ty: ty;)+) => {
        $(
            $(#[$meta])*
            #[inline]
            pub fn $field(&self) -> $ty {
                self.$field.clone()
            }

            #[doc = concat!("设置 `", stringify!($field), "`, 并更新修改时间.")]
            #[inline]
            pub fn $setter(&mut self, value: $ty) {
                self.$field = value;
                self.mtime = ModifiedTime::now();
            }
        )+
    };
}

/// 一个图像在二维视图中的显示属性.
///
/// 任何 setter 都会更新修改时间, 使缓存的切片失效.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MapperProps {
    visible: bool,
    opacity: f32,
    color: [f32; 3],
    binary: bool,
    outline_binary: bool,
    outline_width: f32,
    layer: i32,
    rendering_mode: RenderingMode,
    lookup_table: LookupTable,
    transfer_function: Option<ColorTransferFunction>,
    opacity_function: Option<PiecewiseFunction>,
    level_window: LevelWindow,
    opacity_level_window: Option<LevelWindow>,
    interpolation: ResliceInterpolation,
    thick_slices_mode: Option<ThickSliceMode>,
    thick_slices_num: u32,
    #[cfg_attr(feature = "serde", serde(skip))]
    mtime: ModifiedTime,
}

impl Default for MapperProps {
    fn default() -> Self {
        Self {
            visible: true,
            opacity: 1.0,
            color: [1.0; 3],
            binary: false,
            outline_binary: false,
            outline_width: 1.0,
            layer: 0,
            rendering_mode: RenderingMode::default(),
            lookup_table: LookupTable::from_type(LookupTableType::Grayscale),
            transfer_function: None,
            opacity_function: None,
            level_window: LevelWindow::default(),
            opacity_level_window: None,
            interpolation: ResliceInterpolation::Nearest,
            thick_slices_mode: None,
            thick_slices_num: THICK_SLICES_MIN_NUM,
            mtime: ModifiedTime::now(),
        }
    }
}

impl MapperProps {
    /// 按体数据内容初始化.
    ///
    /// 看起来是二值图像时, 使用半透明红色并置于较高的层; 否则窗口自动覆盖全部数据.
    pub fn for_volume<T: SlabPixel>(volume: &Volume<T>) -> Self {
        let mut props = Self::default();
        if looks_binary(volume) {
            log::debug!("按二值图像显示");
            props.binary = true;
            props.opacity = BINARY_OPACITY;
            props.color = [1.0, 0.0, 0.0];
            props.layer = BINARY_LAYER;
        } else if let Some(stats) = volume.statistics() {
            props.level_window.set_auto(&stats);
        }
        props
    }

    props_accessors! {
        /// 不可见时不生成切片.
        visible, set_visible: bool;
        /// 整体不透明度.
        opacity, set_opacity: f32;
        /// RGB, 各分量属于 `[0, 1]`.
        color, set_color: [f32; 3];
        /// 是否按二值图像显示.
        binary, set_binary: bool;
        /// 二值图像是否只画轮廓线.
        outline_binary, set_outline_binary: bool;
        /// 轮廓线宽度.
        outline_width, set_outline_width: f32;
        /// 层号越大越靠前.
        layer, set_layer: i32;
        /// 着色方式.
        rendering_mode, set_rendering_mode: RenderingMode;
        /// 查找表.
        lookup_table, set_lookup_table: LookupTable;
        /// 颜色传递函数.
        transfer_function, set_transfer_function: Option<ColorTransferFunction>;
        /// 不透明度函数, 与颜色传递函数配合使用.
        opacity_function, set_opacity_function: Option<PiecewiseFunction>;
        /// 窗宽窗位.
        level_window, set_level_window: LevelWindow;
        /// RGBA 图像 alpha 分量的窗口. 未设置时为 `[0, 255]`.
        opacity_level_window, set_opacity_level_window: Option<LevelWindow>;
        /// 重采样插值方式.
        interpolation, set_interpolation: ResliceInterpolation;
        /// `None` 表示不使用厚层.
        thick_slices_mode, set_thick_slices_mode: Option<ThickSliceMode>;
        /// 厚层在切面两侧各取的层数.
        thick_slices_num, set_thick_slices_num: u32;
    }

    /// 最近修改时间.
    #[inline]
    pub fn mtime(&self) -> ModifiedTime {
        self.mtime
    }

    /// 厚层模式及单侧层数. 层数至少为 1.
    pub fn thick_slices(&self) -> Option<(ThickSliceMode, u32)> {
        self.thick_slices_mode
            .map(|mode| (mode, self.thick_slices_num.max(THICK_SLICES_MIN_NUM)))
    }

    fn color_mapping(&self) -> ColorMapping {
        if self.binary {
            return ColorMapping::LookupTable(LookupTable::from_type(LookupTableType::LegacyBinary));
        }
        let transfer = match self.rendering_mode {
            RenderingMode::LookupTableLevelWindowColor | RenderingMode::LookupTableColor => None,
            _ if self.transfer_function.is_none() => {
                log::warn!("着色方式需要颜色传递函数, 但未设置; 改用查找表");
                None
            }
            _ => self.transfer_function.clone(),
        };
        match transfer {
            Some(color) => ColorMapping::TransferFunction {
                color,
                opacity: self.opacity_function.clone(),
            },
            None => {
                let mut lut = self.lookup_table.clone();
                if self.rendering_mode.uses_level_window() {
                    lut.set_range_from_level_window(&self.level_window);
                }
                ColorMapping::LookupTable(lut)
            }
        }
    }

    /// 按当前属性构造窗宽窗位滤波器 (不含裁剪矩形).
    ///
    /// 二值图像总是使用两项查找表, 不应用窗口.
    pub fn level_window_filter(&self) -> LevelWindowFilter {
        let filter = LevelWindowFilter::new(self.color_mapping());
        match &self.opacity_level_window {
            Some(lw) if !self.binary && self.rendering_mode.uses_level_window() => {
                filter.with_opacity_window(lw.lower_bound(), lw.upper_bound())
            }
            _ => filter.with_opacity_window(0.0, DEFAULT_MAX_OPACITY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ScalarsToColors;
    use crate::geometry::VolumeGeometry;
    use ndarray::Array3;

    fn volume(data: Array3<i16>) -> Volume<i16> {
        Volume::new(data, VolumeGeometry::from_spacing([1.0; 3], [0.0; 3], true))
    }

    #[test]
    fn test_defaults() {
        let p = MapperProps::default();
        assert!(p.visible());
        assert_eq!(p.opacity(), 1.0);
        assert_eq!(p.color(), [1.0; 3]);
        assert!(!p.binary() && !p.outline_binary());
        assert_eq!(p.outline_width(), 1.0);
        assert_eq!(p.layer(), 0);
        assert_eq!(p.rendering_mode(), RenderingMode::LookupTableLevelWindowColor);
        assert_eq!(p.interpolation(), ResliceInterpolation::Nearest);
        assert_eq!(p.thick_slices(), None);
        assert_eq!(p.thick_slices_num(), 1);
    }

    #[test]
    fn test_setter_bumps_mtime() {
        let mut p = MapperProps::default();
        let before = p.mtime();
        p.set_layer(3);
        assert!(p.mtime() > before);
        assert_eq!(p.layer(), 3);

        p.set_thick_slices_mode(Some(ThickSliceMode::Mip));
        p.set_thick_slices_num(0);
        assert_eq!(p.thick_slices(), Some((ThickSliceMode::Mip, 1)));
    }

    #[test]
    fn test_for_binary_volume() {
        let mut data = Array3::<i16>::zeros((3, 4, 4));
        data[(1, 1, 1)] = 1;
        let p = MapperProps::for_volume(&volume(data));
        assert!(p.binary());
        assert_eq!(p.opacity(), BINARY_OPACITY);
        assert_eq!(p.color(), [1.0, 0.0, 0.0]);
        assert_eq!(p.layer(), BINARY_LAYER);

        let filter = p.level_window_filter();
        assert_eq!(filter.mapping().map_scalar(0.0), [0, 0, 0, 0]);
        assert_eq!(filter.mapping().map_scalar(1.0), [255; 4]);
    }

    #[test]
    fn test_for_gray_volume() {
        let data = Array3::from_shape_fn((3, 4, 4), |(z, y, x)| (z * 16 + y * 4 + x) as i16 - 10);
        let p = MapperProps::for_volume(&volume(data));
        assert!(!p.binary());
        let lw = p.level_window();
        assert_eq!((lw.lower_bound(), lw.upper_bound()), (-10.0, 37.0));
        assert_eq!(p.level_window_filter().mapping().range(), (-10.0, 37.0));
    }

    #[test]
    fn test_rendering_modes() {
        let mut p = MapperProps::default();
        p.set_level_window(LevelWindow::new(0.0, 100.0));
        assert_eq!(p.level_window_filter().mapping().range(), (-50.0, 50.0));

        p.set_rendering_mode(RenderingMode::LookupTableColor);
        assert_eq!(p.level_window_filter().mapping().range(), (0.0, 255.0));

        // 缺少颜色传递函数时退回查找表.
        p.set_rendering_mode(RenderingMode::ColorTransferFunctionColor);
        assert!(matches!(p.level_window_filter().mapping(), ColorMapping::LookupTable(_)));

        let ctf = ColorTransferFunction::new()
            .with_rgb_point(-5.0, [0.0; 3])
            .with_rgb_point(5.0, [1.0; 3]);
        p.set_transfer_function(Some(ctf));
        let filter = p.level_window_filter();
        assert!(matches!(filter.mapping(), ColorMapping::TransferFunction { .. }));
        assert_eq!(filter.mapping().range(), (-5.0, 5.0));
        assert_eq!(filter.opacity_window(), (0.0, 255.0));

        p.set_rendering_mode(RenderingMode::ColorTransferFunctionLevelWindowColor);
        p.set_opacity_level_window(Some(LevelWindow::new(100.0, 50.0)));
        assert_eq!(p.level_window_filter().opacity_window(), (75.0, 125.0));

        for id in 0..4 {
            assert_eq!(RenderingMode::from_id(id).map(|m| m.id()), Some(id));
        }
        assert_eq!(RenderingMode::from_id(4), None);
    }
}
