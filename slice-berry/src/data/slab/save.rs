//! 切片与体素板的持久化存储.

use super::{ProjectedSlice, VoxelSlab};
use crate::data::{LevelWindow, SlabPixel};
use image::ImageResult;
use ndarray_npy::{ReadNpyError, ReadableElement, WritableElement, WriteNpyError};
use std::path::Path;

/// 表明一个可以通过 **可视化友好** 模式持久化存储的图像对象.
///
/// 图像会经过窗宽窗位映射为 8 位灰度图后保存, 而不是 "as is" 的方式.
/// 若需要按原样保存, 使用 `save_npy`.
pub trait ImgWriteVis {
    /// 按窗口 `window` 将图片保存到 `path` 路径. 格式由扩展名决定.
    fn save<P: AsRef<Path>>(&self, path: P, window: &LevelWindow) -> ImageResult<()>;
}

/// NaN 和 inf 映射为黑色.
impl<T: SlabPixel> ImgWriteVis for ProjectedSlice<T> {
    fn save<P: AsRef<Path>>(&self, path: P, window: &LevelWindow) -> ImageResult<()> {
        let (height, width) = self.shape();
        let mut buf = image::GrayImage::new(width as u32, height as u32);
        for ((h, w), &pix) in self.data.indexed_iter() {
            let gray = window.eval_u8(pix.to_f64()).unwrap_or(u8::MIN);
            buf.put_pixel(w as u32, h as u32, image::Luma([gray]));
        }
        buf.save(path)
    }
}

impl<T: SlabPixel + WritableElement> ProjectedSlice<T> {
    /// 按原样保存为 `.npy`.
    pub fn save_npy<P: AsRef<Path>>(&self, path: P) -> Result<(), WriteNpyError> {
        ndarray_npy::write_npy(path, &self.data)
    }
}

impl<T: SlabPixel + ReadableElement> ProjectedSlice<T> {
    /// 读取 `.npy` 格式的二维切片.
    pub fn open_npy<P: AsRef<Path>>(path: P) -> Result<Self, ReadNpyError> {
        ndarray_npy::read_npy(path).map(Self::new)
    }
}

impl<T: SlabPixel + WritableElement> VoxelSlab<T> {
    /// 按原样保存为 `.npy`. `z_origin` 不会被保存.
    pub fn save_npy<P: AsRef<Path>>(&self, path: P) -> Result<(), WriteNpyError> {
        ndarray_npy::write_npy(path, &self.data)
    }
}

impl<T: SlabPixel + ReadableElement> VoxelSlab<T> {
    /// 读取 `.npy` 格式的三维数组, 第 0 层的 z 索引为 `z_origin`.
    pub fn open_npy<P: AsRef<Path>>(path: P, z_origin: i64) -> Result<Self, ReadNpyError> {
        ndarray_npy::read_npy(path).map(|data| Self::new(data, z_origin))
    }
}
