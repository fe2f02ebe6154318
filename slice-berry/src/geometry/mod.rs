//! 三维几何: 仿射变换, 索引空间包围盒, 体数据几何与二维切面.
//!
//! 约定:
//!
//! 1. 体数据的索引坐标写作 `[x, y, z]`, 分别对应数组的 `(w, h, z)` 方向,
//!   即 NIfTI 的 `(i, j, k)`. 数组本身按 `(z, h, w)` 组织.
//! 2. "图像几何" (image geometry) 指体素中心位于整数索引处;
//!   否则体素中心位于 `+0.5` 处 (体素角点约定).
//! 3. 切面的局部坐标是像素索引, 其到世界坐标的变换已包含像素间距.

use crate::stamp::ModifiedTime;
use nalgebra::{Matrix4, Vector3, Vector4};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod clipping;
pub mod reslice;

/// 三维点或向量.
pub type Vec3 = [f64; 3];

#[inline]
pub(crate) fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub(crate) fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
pub(crate) fn norm(a: Vec3) -> f64 {
    dot(a, a).sqrt()
}

/// 单位化. 零向量返回 `None`.
#[inline]
pub(crate) fn normalized(a: Vec3) -> Option<Vec3> {
    let n = norm(a);
    (n > 0.0 && n.is_finite()).then(|| [a[0] / n, a[1] / n, a[2] / n])
}

/// 三维仿射变换, 以 4x4 齐次矩阵表示.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AffineTransform3d(Matrix4<f64>);

impl Default for AffineTransform3d {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransform3d {
    /// 恒等变换.
    #[inline]
    pub fn identity() -> Self {
        Self(Matrix4::identity())
    }

    /// 直接由齐次矩阵创建.
    #[inline]
    pub fn from_matrix(m: Matrix4<f64>) -> Self {
        Self(m)
    }

    /// 由行优先的 4x4 数组创建.
    pub fn from_rows(rows: [[f64; 4]; 4]) -> Self {
        Self(Matrix4::from_fn(|r, c| rows[r][c]))
    }

    /// 由线性部分的三个列向量和平移量创建.
    pub fn from_columns(x: Vec3, y: Vec3, z: Vec3, offset: Vec3) -> Self {
        let cols = [x, y, z, offset];
        Self(Matrix4::from_fn(|r, c| match r {
            3 => f64::from(c == 3),
            _ => cols[c][r],
        }))
    }

    /// 各轴缩放.
    #[inline]
    pub fn scaling(s: Vec3) -> Self {
        Self(Matrix4::new_nonuniform_scaling(&Vector3::from(s)))
    }

    /// 平移.
    #[inline]
    pub fn translation(t: Vec3) -> Self {
        Self(Matrix4::new_translation(&Vector3::from(t)))
    }

    /// 底层矩阵.
    #[inline]
    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.0
    }

    /// 逆变换. 矩阵奇异时返回 `None`.
    #[inline]
    pub fn try_inverse(&self) -> Option<Self> {
        self.0.try_inverse().map(Self)
    }

    /// 先做 `self`, 再做 `after`. 即 `after ∘ self`.
    #[inline]
    pub fn then(&self, after: &Self) -> Self {
        Self(after.0 * self.0)
    }

    /// 变换一个点 (齐次坐标 `w = 1`).
    #[inline]
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        let v = self.0 * Vector4::new(p[0], p[1], p[2], 1.0);
        [v[0], v[1], v[2]]
    }

    /// 变换一个向量, 只使用线性部分.
    #[inline]
    pub fn transform_vector(&self, p: Vec3) -> Vec3 {
        let v = self.0 * Vector4::new(p[0], p[1], p[2], 0.0);
        [v[0], v[1], v[2]]
    }

    /// 线性部分第 `axis` 列.
    #[inline]
    pub fn column(&self, axis: usize) -> Vec3 {
        [self.0[(0, axis)], self.0[(1, axis)], self.0[(2, axis)]]
    }
}

/// 参考体数据索引空间中的轴对齐包围盒.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AxisAlignedBox3d {
    min: Vec3,
    max: Vec3,
}

/// 包围盒 12 条边, 以 [`AxisAlignedBox3d::corners`] 的角点序号表示.
///
/// 依次为底面 4 条, 顶面 4 条, 竖直 4 条.
pub const BOX_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

impl AxisAlignedBox3d {
    /// 由最小角点和最大角点创建.
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// 形状为 `(w, h, d)` 的体数据在索引空间中的包围盒 `[0, w] x [0, h] x [0, d]`.
    #[inline]
    pub fn from_shape((w, h, d): (usize, usize, usize)) -> Self {
        Self::new([0.0; 3], [w as f64, h as f64, d as f64])
    }

    /// 最小角点.
    #[inline]
    pub fn min(&self) -> Vec3 {
        self.min
    }

    /// 最大角点.
    #[inline]
    pub fn max(&self) -> Vec3 {
        self.max
    }

    /// 按固定顺序列出 8 个角点: 先 `z = min` 的底面逆时针 4 个, 再顶面 4 个.
    ///
    /// 若 `is_image_geometry` 为 `true`, 所有坐标分量先减去 0.5
    /// (体素角点约定 -> 体素中心约定).
    pub fn corners(&self, is_image_geometry: bool) -> [Vec3; 8] {
        let shift = if is_image_geometry { 0.5 } else { 0.0 };
        let [x0, y0, z0] = self.min.map(|v| v - shift);
        let [x1, y1, z1] = self.max.map(|v| v - shift);
        [
            [x0, y0, z0],
            [x1, y0, z0],
            [x1, y1, z0],
            [x0, y1, z0],
            [x0, y0, z1],
            [x1, y0, z1],
            [x1, y1, z1],
            [x0, y1, z1],
        ]
    }
}

/// 体数据的空间几何: 索引到世界坐标的仿射变换, 以及体素中心约定.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VolumeGeometry {
    index_to_world: AffineTransform3d,
    image_geometry: bool,
}

impl VolumeGeometry {
    /// 直接创建.
    #[inline]
    pub fn new(index_to_world: AffineTransform3d, image_geometry: bool) -> Self {
        Self {
            index_to_world,
            image_geometry,
        }
    }

    /// 轴对齐体数据: 体素间距为 `spacing` (毫米), 索引原点位于 `origin`.
    #[inline]
    pub fn from_spacing(spacing: Vec3, origin: Vec3, image_geometry: bool) -> Self {
        let m = AffineTransform3d::scaling(spacing).then(&AffineTransform3d::translation(origin));
        Self::new(m, image_geometry)
    }

    /// 索引 -> 世界.
    #[inline]
    pub fn index_to_world(&self) -> &AffineTransform3d {
        &self.index_to_world
    }

    /// 世界 -> 索引. 变换奇异时返回 `None`.
    #[inline]
    pub fn world_to_index(&self) -> Option<AffineTransform3d> {
        self.index_to_world.try_inverse()
    }

    /// 体素中心是否位于整数索引处.
    #[inline]
    pub fn is_image_geometry(&self) -> bool {
        self.image_geometry
    }

    /// 体素中心相对整数索引的偏移.
    #[inline]
    pub fn voxel_center_offset(&self) -> f64 {
        if self.image_geometry {
            0.0
        } else {
            0.5
        }
    }

    /// 三个索引方向上的体素间距 (毫米).
    pub fn spacing(&self) -> Vec3 {
        [0, 1, 2].map(|axis| norm(self.index_to_world.column(axis)))
    }

    /// 形状为 `(w, h, d)` 的体数据的 8 个世界坐标角点.
    pub fn world_corners(&self, shape: (usize, usize, usize)) -> [Vec3; 8] {
        AxisAlignedBox3d::from_shape(shape)
            .corners(self.image_geometry)
            .map(|p| self.index_to_world.transform_point(p))
    }
}

/// 标准切面方向.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PlaneOrientation {
    /// 横断面, 法向为索引 z 轴.
    Axial,
    /// 矢状面, 法向为索引 x 轴.
    Sagittal,
    /// 冠状面, 法向为索引 y 轴.
    Coronal,
}

/// 三维空间中的一个有向二维切面.
///
/// 局部坐标 `(i, j, k)` 是像素索引: `i` 沿 "右" 方向, `j` 沿 "下" 方向,
/// `k` 沿法向. 局部到世界的变换已包含像素间距.
#[derive(Clone, Debug)]
pub struct PlaneFrame {
    transform: AffineTransform3d,
    spacing: Vec3,
    extent: (usize, usize),
    mtime: ModifiedTime,
}

impl PlaneFrame {
    /// 由原点, 右方向, 下方向创建切面. 方向向量会被单位化, 法向为 `right x down`.
    ///
    /// `spacing` 为 (右, 下, 法向) 三个方向的毫米每像素, `extent` 为 (宽, 高) 像素数.
    /// 若方向向量为零或互相平行, 返回 `None`.
    pub fn new(
        origin: Vec3,
        right: Vec3,
        down: Vec3,
        spacing: Vec3,
        extent: (usize, usize),
    ) -> Option<Self> {
        let r = normalized(right)?;
        let d = normalized(down)?;
        let n = normalized(cross(r, d))?;
        let transform = AffineTransform3d::from_columns(
            r.map(|v| v * spacing[0]),
            d.map(|v| v * spacing[1]),
            n.map(|v| v * spacing[2]),
            origin,
        );
        Some(Self::from_transform(transform, spacing, extent))
    }

    /// 由局部到世界的变换直接创建.
    #[inline]
    pub fn from_transform(
        transform: AffineTransform3d,
        spacing: Vec3,
        extent: (usize, usize),
    ) -> Self {
        Self {
            transform,
            spacing,
            extent,
            mtime: ModifiedTime::now(),
        }
    }

    /// 穿过体数据第 `slice` 层的标准切面. 切面像素与体素中心一一对齐.
    ///
    /// `shape` 为 `(w, h, d)`. `slice` 越界或几何退化时返回 `None`.
    pub fn standard(
        orientation: PlaneOrientation,
        geometry: &VolumeGeometry,
        (w, h, d): (usize, usize, usize),
        slice: usize,
    ) -> Option<Self> {
        let i2w = geometry.index_to_world();
        let spacing = geometry.spacing();
        let c = geometry.voxel_center_offset();
        let s = slice as f64 + c;
        // (右, 下, 法向) 对应的索引轴, 切面像素数, 原点索引.
        let (axes, extent, origin) = match orientation {
            PlaneOrientation::Axial if slice < d => ([0, 1, 2], (w, h), [c, c, s]),
            PlaneOrientation::Sagittal if slice < w => ([1, 2, 0], (h, d), [s, c, c]),
            PlaneOrientation::Coronal if slice < h => ([0, 2, 1], (w, d), [c, s, c]),
            _ => return None,
        };
        let [a, b, n] = axes;
        Self::new(
            i2w.transform_point(origin),
            i2w.column(a),
            i2w.column(b),
            [spacing[a], spacing[b], spacing[n]],
            extent,
        )
    }

    /// 局部 (像素索引) -> 世界.
    #[inline]
    pub fn transform(&self) -> &AffineTransform3d {
        &self.transform
    }

    /// (右, 下, 法向) 三个方向的毫米每像素.
    #[inline]
    pub fn spacing(&self) -> Vec3 {
        self.spacing
    }

    /// (宽, 高) 像素数.
    #[inline]
    pub fn extent(&self) -> (usize, usize) {
        self.extent
    }

    /// 最近修改时间.
    #[inline]
    pub fn mtime(&self) -> ModifiedTime {
        self.mtime
    }

    /// 替换切面变换, 同时更新修改时间.
    pub fn set_transform(&mut self, transform: AffineTransform3d) {
        self.transform = transform;
        self.mtime = ModifiedTime::now();
    }

    /// 世界坐标原点.
    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.transform.transform_point([0.0; 3])
    }

    /// 世界坐标单位法向. 变换退化时返回零向量.
    #[inline]
    pub fn normal(&self) -> Vec3 {
        normalized(self.transform.column(2)).unwrap_or([0.0; 3])
    }

    /// 世界点到切面的有符号距离.
    #[inline]
    pub fn signed_distance(&self, world: Vec3) -> f64 {
        let o = self.origin();
        dot([world[0] - o[0], world[1] - o[1], world[2] - o[2]], self.normal())
    }

    /// 切面是否穿过体数据.
    ///
    /// 当且仅当某个角点与 0 号角点的有符号距离之积严格小于 0 时返回 `true`.
    /// 因此 0 号角点恰好落在切面上时, 即使切面穿过体数据也返回 `false`.
    pub fn intersects_volume(
        &self,
        geometry: &VolumeGeometry,
        shape: (usize, usize, usize),
    ) -> bool {
        let corners = geometry.world_corners(shape);
        let initial = self.signed_distance(corners[0]);
        corners[1..]
            .iter()
            .any(|p| initial * self.signed_distance(*p) < 0.0)
    }
}
