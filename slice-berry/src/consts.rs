//! 通用常量.

/// RGBA 颜色.
pub mod rgba {
    /// 完全透明的黑色. 位于裁剪矩形之外的像素一律输出该颜色.
    pub const TRANSPARENT_BLACK: [u8; 4] = [0, 0, 0, 0];

    /// 不透明白色.
    pub const OPAQUE_WHITE: [u8; 4] = [255, 255, 255, 255];

    /// 查找表遇到 NaN 时使用的颜色 (半亮度红色, 不透明).
    pub const NAN_COLOR: [u8; 4] = [128, 0, 0, 255];

    /// 单通道最大强度.
    pub const MAX_INTENSITY: f64 = 255.0;
}

/// NIfTI 头部 `datatype` 字段取值. 仅列出本 crate 支持的标量类型.
pub mod nifti_code {
    /// `u8`.
    pub const UINT8: i16 = 2;

    /// `i16`.
    pub const INT16: i16 = 4;

    /// `i32`.
    pub const INT32: i16 = 8;

    /// `f32`.
    pub const FLOAT32: i16 = 16;

    /// `f64`.
    pub const FLOAT64: i16 = 64;

    /// `i8`.
    pub const INT8: i16 = 256;

    /// `u16`.
    pub const UINT16: i16 = 512;

    /// `u32`.
    pub const UINT32: i16 = 768;

    /// `i64`.
    pub const INT64: i16 = 1024;

    /// `u64`.
    pub const UINT64: i16 = 1280;
}

/// 平面裁剪时累加器的哨兵值. 若所有边都未与平面相交, 累加器保持 `±CLIP_SENTINEL`.
pub const CLIP_SENTINEL: f64 = 1e7;

/// 窗宽窗位默认取值范围下限.
pub const DEFAULT_RANGE_MIN: f64 = -2048.0;

/// 窗宽窗位默认取值范围上限.
pub const DEFAULT_RANGE_MAX: f64 = 4096.0;

/// 查找表默认颜色数.
pub const DEFAULT_TABLE_SIZE: usize = 256;

/// 不透明度窗口默认上限.
pub const DEFAULT_MAX_OPACITY: f64 = 255.0;

/// 相机远裁剪距离中可用于绘制图层的比例. 经验值.
pub const LAYER_DEPTH_FACTOR: f64 = 0.01;

/// 相邻图层之间预留的深度.
pub const LAYER_DEPTH_STEP: f64 = 10.0;

/// 厚层投影时单侧最少层数.
pub const THICK_SLICES_MIN_NUM: u32 = 1;

/// 二值图像默认不透明度.
pub const BINARY_OPACITY: f32 = 0.3;

/// 二值图像默认图层.
pub const BINARY_LAYER: i32 = 10;
