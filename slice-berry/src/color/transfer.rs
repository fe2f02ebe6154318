//! 分段线性的颜色传递函数与不透明度函数.

use super::ScalarsToColors;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 在按 `x` 升序排列的节点间线性插值. 两端之外 (含 NaN) 取端点值; 没有节点时返回 `None`.
fn interpolate<const N: usize>(nodes: &[(f64, [f64; N])], x: f64) -> Option<[f64; N]> {
    let (first, last) = (nodes.first()?, nodes.last()?);
    if !(x > first.0) {
        return Some(first.1);
    }
    if x >= last.0 {
        return Some(last.1);
    }
    // first.0 < x < last.0, 所以 1 <= k < len.
    let k = nodes.partition_point(|(nx, _)| *nx <= x);
    let (x0, v0) = nodes[k - 1];
    let (x1, v1) = nodes[k];
    let t = (x - x0) / (x1 - x0);
    let mut ans = v0;
    for (a, b) in ans.iter_mut().zip(v1) {
        *a += (b - *a) * t;
    }
    Some(ans)
}

/// 插入节点, 保持升序. 已有相同 `x` 的节点会被替换.
fn insert<const N: usize>(nodes: &mut Vec<(f64, [f64; N])>, x: f64, v: [f64; N]) {
    match nodes.binary_search_by(|(nx, _)| nx.total_cmp(&x)) {
        Ok(k) => nodes[k].1 = v,
        Err(k) => nodes.insert(k, (x, v)),
    }
}

/// 颜色传递函数: 标量 -> RGB, 各分量属于 `[0, 1]`.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ColorTransferFunction {
    nodes: Vec<(f64, [f64; 3])>,
}

impl ColorTransferFunction {
    /// 没有节点的传递函数.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加节点. NaN 位置被忽略.
    pub fn add_rgb_point(&mut self, x: f64, rgb: [f64; 3]) {
        if !x.is_nan() {
            insert(&mut self.nodes, x, rgb);
        }
    }

    /// 添加节点, 链式调用.
    #[inline]
    pub fn with_rgb_point(mut self, x: f64, rgb: [f64; 3]) -> Self {
        self.add_rgb_point(x, rgb);
        self
    }

    /// 删除全部节点.
    #[inline]
    pub fn remove_all_points(&mut self) {
        self.nodes.clear();
    }

    /// 节点个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// 没有节点.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `x` 处的颜色. 没有节点时为黑色.
    #[inline]
    pub fn color(&self, x: f64) -> [f64; 3] {
        interpolate(&self.nodes, x).unwrap_or([0.0; 3])
    }
}

impl ScalarsToColors for ColorTransferFunction {
    fn map_scalar(&self, value: f64) -> [u8; 4] {
        let [r, g, b] = self.color(value).map(|c| (c.clamp(0.0, 1.0) * 255.0 + 0.5) as u8);
        [r, g, b, u8::MAX]
    }

    fn range(&self) -> (f64, f64) {
        match (self.nodes.first(), self.nodes.last()) {
            (Some(a), Some(b)) => (a.0, b.0),
            _ => (0.0, 0.0),
        }
    }
}

/// 分段线性函数, 通常用作不透明度 (`[0, 1]`).
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PiecewiseFunction {
    nodes: Vec<(f64, [f64; 1])>,
}

impl PiecewiseFunction {
    /// 没有节点的函数.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加节点. NaN 位置被忽略.
    pub fn add_point(&mut self, x: f64, y: f64) {
        if !x.is_nan() {
            insert(&mut self.nodes, x, [y]);
        }
    }

    /// 添加节点, 链式调用.
    #[inline]
    pub fn with_point(mut self, x: f64, y: f64) -> Self {
        self.add_point(x, y);
        self
    }

    /// 节点个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// 没有节点.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `x` 处的函数值. 没有节点时为 0.
    #[inline]
    pub fn value(&self, x: f64) -> f64 {
        interpolate(&self.nodes, x).map_or(0.0, |[y]| y)
    }
}
