//! 二值图像的像素边界轮廓线.

use crate::data::SlabPixel;
use crate::geometry::Vec3;
use ndarray::ArrayView2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 切面局部坐标 (毫米) 中的一条线段.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineSegment {
    /// 起点.
    pub start: Vec3,
    /// 终点.
    pub end: Vec3,
}

/// 沿前景像素 (非 0) 与背景像素的交界, 以及图像四周画线.
///
/// 按行优先顺序逐像素扫描. 左右邻居按扁平缓冲区读取, 因此行首像素的 "左邻居"
/// 是上一行的行尾像素, 行尾像素的 "右邻居" 是下一行的行首像素.
/// 每条线段位于深度 `depth`, 像素 `(x, y)` 占据
/// `[x * mm_x, (x + 1) * mm_x] x [y * mm_y, (y + 1) * mm_y]`.
pub fn binary_outline<T: SlabPixel>(
    slice: ArrayView2<T>,
    mm_per_pixel: [f64; 2],
    depth: f64,
) -> Vec<LineSegment> {
    let (height, width) = slice.dim();
    let mut lines = Vec::new();
    if height == 0 || width == 0 {
        return lines;
    }
    let zero = T::zero();
    let flat: Vec<T> = slice.iter().copied().collect();
    let (x_max, y_max) = (width - 1, height - 1);
    let [mx, my] = mm_per_pixel;
    let mut push = |(x0, y0): (usize, usize), (x1, y1): (usize, usize)| {
        lines.push(LineSegment {
            start: [x0 as f64 * mx, y0 as f64 * my, depth],
            end: [x1 as f64 * mx, y1 as f64 * my, depth],
        });
    };

    for (k, &v) in flat.iter().enumerate() {
        if v == zero {
            continue;
        }
        let (y, x) = (k / width, k % width);
        // 与背景相邻的边.
        if y > 0 && flat[k - width] == zero {
            push((x, y), (x + 1, y));
        }
        if y < y_max && flat[k + width] == zero {
            push((x, y + 1), (x + 1, y + 1));
        }
        if k > 0 && flat[k - 1] == zero {
            push((x, y), (x, y + 1));
        }
        if k + 1 < flat.len() && flat[k + 1] == zero {
            push((x + 1, y), (x + 1, y + 1));
        }
        // 图像四周.
        if x == 0 {
            push((x, y), (x, y + 1));
        }
        if x == x_max {
            push((x + 1, y), (x + 1, y + 1));
        }
        if y == 0 {
            push((x, y), (x + 1, y));
        }
        if y == y_max {
            push((x, y + 1), (x + 1, y + 1));
        }
    }
    lines
}
