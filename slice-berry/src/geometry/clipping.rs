//! 用体数据包围盒裁剪二维切面.
//!
//! 把包围盒的 8 个角点变换到切面的局部坐标系, 求 12 条边与 `z = 0`
//! 平面的交点, 交点的外接矩形即切面上可见的数据区域.

use super::{AffineTransform3d, AxisAlignedBox3d, PlaneFrame, Vec3, VolumeGeometry, BOX_EDGES};
use crate::consts::CLIP_SENTINEL;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 切面上数据区域的边界 `[x_min, x_max, y_min, y_max, z_min, z_max]`, 以毫米为单位.
///
/// 切面是平的, 所以 z 分量总为 0.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClippedBounds(pub [f64; 6]);

impl ClippedBounds {
    /// 切面局部 x 的下界 (毫米).
    #[inline]
    pub fn x_min(&self) -> f64 {
        self.0[0]
    }

    /// 切面局部 x 的上界.
    #[inline]
    pub fn x_max(&self) -> f64 {
        self.0[1]
    }

    /// 切面局部 y 的下界.
    #[inline]
    pub fn y_min(&self) -> f64 {
        self.0[2]
    }

    /// 切面局部 y 的上界.
    #[inline]
    pub fn y_max(&self) -> f64 {
        self.0[3]
    }

    /// x 方向的跨度.
    #[inline]
    pub fn width_mm(&self) -> f64 {
        self.x_max() - self.x_min()
    }

    /// y 方向的跨度.
    #[inline]
    pub fn height_mm(&self) -> f64 {
        self.y_max() - self.y_min()
    }

    /// 转换为纹理像素坐标的裁剪矩形.
    ///
    /// 每个分量按 `trunc(b / mm + 0.5)` 取整, `mm_per_pixel` 为 `[x, y]` 方向的毫米每像素.
    pub fn to_texture_clip(&self, mm_per_pixel: [f64; 2]) -> ClipRect {
        let [mx, my] = mm_per_pixel;
        let round = |b: f64, mm: f64| (b / mm + 0.5) as i64;
        ClipRect {
            x_min: round(self.x_min(), mx),
            x_max: round(self.x_max(), mx),
            y_min: round(self.y_min(), my),
            y_max: round(self.y_max(), my),
        }
    }
}

/// 纹理上的半开裁剪矩形 `[x_min, x_max) x [y_min, y_max)`, 以像素为单位.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClipRect {
    /// 包含.
    pub x_min: i64,
    /// 不包含.
    pub x_max: i64,
    /// 包含.
    pub y_min: i64,
    /// 不包含.
    pub y_max: i64,
}

impl ClipRect {
    /// 像素 `(x, y)` 是否位于矩形内.
    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.x_min && x < self.x_max && y >= self.y_min && y < self.y_max
    }
}

/// 线段 `p1 p2` (切面局部坐标) 若与 `z = 0` 相交, 用交点更新 `bounds`.
///
/// 两端点 z 同号 (含两者都为 0) 时不相交.
fn line_intersect_zero(p1: Vec3, p2: Vec3, bounds: &mut [f64; 6]) -> bool {
    let (z1, z2) = (p1[2], p2[2]);
    if z1 * z2 > 0.0 || z1 == z2 {
        return false;
    }
    let x = (p1[0] * z2 - z1 * p2[0]) / (z2 - z1);
    let y = (p1[1] * z2 - z1 * p2[1]) / (z2 - z1);
    bounds[0] = bounds[0].min(x);
    bounds[1] = bounds[1].max(x);
    bounds[2] = bounds[2].min(y);
    bounds[3] = bounds[3].max(y);
    bounds[4] = 0.0;
    bounds[5] = 0.0;
    true
}

/// 计算包围盒在切面上截出的区域.
///
/// - `bbox`: 参考体数据索引空间中的包围盒;
/// - `is_image_geometry`: 为 `true` 时包围盒角点先整体平移 `-0.5`;
/// - `box_to_world`: 参考体数据索引 -> 世界;
/// - `plane_to_world`: 切面像素索引 -> 世界;
/// - `plane_spacing`: 切面三个方向的毫米每像素.
///
/// 切面与包围盒不相交, 或 `plane_to_world` 不可逆时返回 `None`.
/// 结果只由输入决定.
pub fn calculate_clipped_plane_bounds(
    bbox: &AxisAlignedBox3d,
    is_image_geometry: bool,
    box_to_world: &AffineTransform3d,
    plane_to_world: &AffineTransform3d,
    plane_spacing: Vec3,
) -> Option<ClippedBounds> {
    let Some(world_to_plane) = plane_to_world.try_inverse() else {
        log::debug!("切面变换不可逆, 无法裁剪");
        return None;
    };
    let to_plane = box_to_world.then(&world_to_plane);
    let points = bbox
        .corners(is_image_geometry)
        .map(|p| to_plane.transform_point(p));

    let mut bounds = [
        CLIP_SENTINEL,
        -CLIP_SENTINEL,
        CLIP_SENTINEL,
        -CLIP_SENTINEL,
        CLIP_SENTINEL,
        -CLIP_SENTINEL,
    ];
    for (a, b) in BOX_EDGES {
        line_intersect_zero(points[a], points[b], &mut bounds);
    }

    // 累加器仍停留在哨兵值附近, 说明没有任何交点.
    let limit = CLIP_SENTINEL - 1.0;
    if bounds[0] > limit || bounds[2] > limit || bounds[1] < -limit || bounds[3] < -limit {
        return None;
    }

    let [sx, sy, sz] = plane_spacing;
    for (k, s) in [sx, sx, sy, sy, sz, sz].into_iter().enumerate() {
        bounds[k] *= s;
    }
    Some(ClippedBounds(bounds))
}

impl PlaneFrame {
    /// 切面与体数据的裁剪区域. 见 [`calculate_clipped_plane_bounds`].
    pub fn clip_volume(
        &self,
        geometry: &VolumeGeometry,
        shape: (usize, usize, usize),
    ) -> Option<ClippedBounds> {
        calculate_clipped_plane_bounds(
            &AxisAlignedBox3d::from_shape(shape),
            geometry.is_image_geometry(),
            geometry.index_to_world(),
            self.transform(),
            self.spacing(),
        )
    }
}
