//! 二维切片映射器.
//!
//! 对每个视图, 把体数据在当前切面上的截面重采样 (可选厚层投影), 裁剪,
//! 着色为 RGBA 纹理 (或二值图像的轮廓线), 并按视图缓存结果.
//! 只有体数据, 切面, 显示属性或视图上下文比缓存更新时才重新生成.

use crate::color::RgbaTexture;
use crate::consts::{LAYER_DEPTH_FACTOR, LAYER_DEPTH_STEP};
use crate::data::{ProjectedSlice, ScalarType, SlabPixel, Volume};
use crate::geometry::clipping::{ClipRect, ClippedBounds};
use crate::geometry::reslice::{reslice, reslice_thick, ResliceInterpolation};
use crate::geometry::{PlaneFrame, Vec3};
use crate::stamp::ModifiedTime;
use crate::thick::project_thick_slab;

mod error;
mod outline;
mod props;

pub use error::{MapperError, MapperResult};
pub use outline::{binary_outline, LineSegment};
pub use props::{MapperProps, RenderingMode};

/// 图层深度: `-far * 0.01 + 10 * layer`, 不超过 0.
///
/// `far` 为相机远裁剪面距离. 结果大于 0 时截断为 0 并给出警告.
pub fn calculate_layer_depth(clipping_range_far: f64, layer: i32) -> f64 {
    let depth = -clipping_range_far * LAYER_DEPTH_FACTOR + f64::from(layer) * LAYER_DEPTH_STEP;
    if depth > 0.0 {
        log::warn!("图层 {layer} 超出裁剪范围, 深度截断为 0");
        0.0
    } else {
        depth
    }
}

/// 视图编号, 由 [`SliceMapper::register_view`] 分配.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ViewId(usize);

/// 与视图相关的渲染上下文.
#[derive(Clone, Debug)]
pub struct ViewContext {
    clipping_range_far: f64,
    mtime: ModifiedTime,
}

impl ViewContext {
    /// 以相机远裁剪面距离创建.
    pub fn new(clipping_range_far: f64) -> Self {
        Self {
            clipping_range_far,
            mtime: ModifiedTime::now(),
        }
    }

    /// 相机远裁剪面距离.
    #[inline]
    pub fn clipping_range_far(&self) -> f64 {
        self.clipping_range_far
    }

    /// 修改远裁剪面距离, 并更新修改时间.
    pub fn set_clipping_range_far(&mut self, far: f64) {
        self.clipping_range_far = far;
        self.mtime = ModifiedTime::now();
    }

    /// 最近修改时间.
    #[inline]
    pub fn mtime(&self) -> ModifiedTime {
        self.mtime
    }
}

/// 承载纹理的矩形: 原点与两个角点, 均位于图层深度处 (切面局部坐标, 毫米).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TexturedPlane {
    /// `(x_min, y_min, depth)`.
    pub origin: Vec3,
    /// `(x_max, y_min, depth)`, 定义 x 轴.
    pub point1: Vec3,
    /// `(x_min, y_max, depth)`, 定义 y 轴.
    pub point2: Vec3,
}

impl TexturedPlane {
    fn from_bounds(bounds: &ClippedBounds, depth: f64) -> Self {
        Self {
            origin: [bounds.x_min(), bounds.y_min(), depth],
            point1: [bounds.x_max(), bounds.y_min(), depth],
            point2: [bounds.x_min(), bounds.y_max(), depth],
        }
    }
}

/// 一个视图上的切片渲染结果.
#[derive(Clone, Debug)]
pub struct RenderedSlice<T> {
    /// 重采样 (或厚层投影) 得到的切片.
    pub image: ProjectedSlice<T>,
    /// 切面上数据区域的边界.
    pub bounds: ClippedBounds,
    /// `[x, y]` 方向的毫米每像素.
    pub mm_per_pixel: [f64; 2],
    /// 纹理上的裁剪矩形, 像素坐标.
    pub texture_clip: ClipRect,
    /// 轮廓线模式下为 `None`.
    pub texture: Option<RgbaTexture>,
    /// 二值图像的轮廓线, 纹理模式下为 `None`.
    pub outline: Option<Vec<LineSegment>>,
    /// 承载纹理的矩形.
    pub plane: TexturedPlane,
    /// 图层深度, 见 [`calculate_layer_depth`].
    pub depth: f64,
    /// 体素中心约定带来的平移 `(-0.5 mm_x, -0.5 mm_y, 0)`.
    pub actor_offset: Vec3,
    /// 显示颜色 (RGB, `[0, 1]`).
    pub color: [f32; 3],
    /// 整体不透明度.
    pub opacity: f32,
    /// 轮廓线宽度.
    pub line_width: f32,
}

struct ViewStorage<T> {
    /// 上次生成时体数据, 切面, 显示属性和视图上下文的修改时间.
    generated_from: Option<[ModifiedTime; 4]>,
    output: Option<RenderedSlice<T>>,
}

impl<T> ViewStorage<T> {
    fn new() -> Self {
        Self {
            generated_from: None,
            output: None,
        }
    }

    /// 任一输入的时间戳与上次生成时不同即视为过期, 换用另一个 (哪怕更早创建的) 对象也算.
    #[inline]
    fn is_stale(&self, stamps: &[ModifiedTime; 4]) -> bool {
        self.generated_from.as_ref() != Some(stamps)
    }
}

/// 按视图缓存输出的切片映射器.
pub struct SliceMapper<T> {
    views: Vec<Option<ViewStorage<T>>>,
}

impl<T> Default for SliceMapper<T> {
    fn default() -> Self {
        Self { views: Vec::new() }
    }
}

impl<T: SlabPixel> SliceMapper<T> {
    /// 没有任何视图的映射器.
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册新视图. 空闲的编号会被重复使用.
    pub fn register_view(&mut self) -> ViewId {
        match self.views.iter().position(Option::is_none) {
            Some(k) => {
                self.views[k] = Some(ViewStorage::new());
                ViewId(k)
            }
            None => {
                self.views.push(Some(ViewStorage::new()));
                ViewId(self.views.len() - 1)
            }
        }
    }

    /// 移除视图及其缓存. 视图不存在时返回 `false`.
    pub fn remove_view(&mut self, view: ViewId) -> bool {
        self.views
            .get_mut(view.0)
            .and_then(Option::take)
            .is_some()
    }

    /// 视图当前缓存的输出.
    pub fn cached(&self, view: ViewId) -> Option<&RenderedSlice<T>> {
        self.views.get(view.0)?.as_ref()?.output.as_ref()
    }

    /// 更新视图并返回其输出.
    ///
    /// 只有输入比上次更新更新时才重新生成. 切面不穿过体数据时输出为 `None`,
    /// 即该视图中没有可画的内容. 不可见时直接返回 `None`, 不改动缓存.
    pub fn update(
        &mut self,
        view: ViewId,
        volume: &Volume<T>,
        plane: &PlaneFrame,
        props: &MapperProps,
        context: &ViewContext,
    ) -> MapperResult<Option<&RenderedSlice<T>>> {
        let storage = self
            .views
            .get_mut(view.0)
            .and_then(Option::as_mut)
            .ok_or(MapperError::UnknownView(view))?;
        if !props.visible() {
            return Ok(None);
        }
        let stamps = [volume.mtime(), plane.mtime(), props.mtime(), context.mtime()];
        if storage.is_stale(&stamps) {
            log::debug!("重新生成视图 {view:?} 的切片");
            storage.output = generate(volume, plane, props, context)?;
            storage.generated_from = Some(stamps);
        }
        Ok(storage.output.as_ref())
    }
}

/// 重采样; 启用厚层时沿法向采样后投影为一张切片.
fn resample<T: SlabPixel>(
    volume: &Volume<T>,
    plane: &PlaneFrame,
    props: &MapperProps,
) -> MapperResult<ProjectedSlice<T>> {
    // 单层体数据只能最近邻.
    let interpolation = if volume.len_z() > 1 {
        props.interpolation()
    } else {
        ResliceInterpolation::Nearest
    };
    match props.thick_slices() {
        Some((mode, num)) => {
            let slab = reslice_thick(volume, plane, interpolation, T::zero(), num)
                .ok_or(MapperError::SingularGeometry)?;
            let num = i64::from(num);
            Ok(project_thick_slab(&slab, -num, num, mode)?)
        }
        None => reslice(volume, plane, interpolation, T::zero()).ok_or(MapperError::SingularGeometry),
    }
}

fn generate<T: SlabPixel>(
    volume: &Volume<T>,
    plane: &PlaneFrame,
    props: &MapperProps,
    context: &ViewContext,
) -> MapperResult<Option<RenderedSlice<T>>> {
    let geometry = volume.geometry();
    let shape = volume.shape_xyz();
    if !plane.intersects_volume(geometry, shape) {
        log::debug!("切面不穿过体数据");
        return Ok(None);
    }

    let image = resample(volume, plane, props)?;
    let [sx, sy, _] = plane.spacing();
    let mm_per_pixel = [sx, sy];
    // 未求得交点时按全 0 边界处理.
    let bounds = plane
        .clip_volume(geometry, shape)
        .unwrap_or(ClippedBounds([0.0; 6]));
    let texture_clip = bounds.to_texture_clip(mm_per_pixel);
    let depth = calculate_layer_depth(context.clipping_range_far(), props.layer());

    let outline = if props.binary() && props.outline_binary() {
        match T::SCALAR {
            ScalarType::UInt8 | ScalarType::UInt16 => {
                Some(binary_outline(image.view(), mm_per_pixel, depth))
            }
            other => {
                log::warn!("二值图像轮廓线只支持 u8 和 u16, 当前为 {other}; 改为纹理显示");
                None
            }
        }
    } else {
        None
    };
    let texture = match outline {
        Some(_) => None,
        None => Some(
            props
                .level_window_filter()
                .with_clip(Some(texture_clip))
                .apply_scalar(image.view()),
        ),
    };

    Ok(Some(RenderedSlice {
        image,
        bounds,
        mm_per_pixel,
        texture_clip,
        texture,
        outline,
        plane: TexturedPlane::from_bounds(&bounds, depth),
        depth,
        actor_offset: [-0.5 * sx, -0.5 * sy, 0.0],
        color: props.color(),
        opacity: props.opacity(),
        line_width: props.outline_width(),
    }))
}
