//! 体素标量类型, 及其 "原生" 算术语义.

use crate::consts::nifti_code;
use std::fmt::{Debug, Display, Formatter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 体素标量类型的运行时描述.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ScalarType {
    /// `u8`.
    UInt8,
    /// `i8`.
    Int8,
    /// `u16`.
    UInt16,
    /// `i16`. 临床 CT 最常见的存储类型.
    Int16,
    /// `u32`.
    UInt32,
    /// `i32`.
    Int32,
    /// `u64`.
    UInt64,
    /// `i64`.
    Int64,
    /// `f32`.
    Float32,
    /// `f64`.
    Float64,
}

impl ScalarType {
    /// 由 NIfTI 头部的 `datatype` 字段解析标量类型. 不支持的类型 (复数, RGB 等) 返回 `None`.
    pub fn from_nifti_code(code: i16) -> Option<Self> {
        use nifti_code::*;
        let ans = match code {
            UINT8 => Self::UInt8,
            INT8 => Self::Int8,
            UINT16 => Self::UInt16,
            INT16 => Self::Int16,
            UINT32 => Self::UInt32,
            INT32 => Self::Int32,
            UINT64 => Self::UInt64,
            INT64 => Self::Int64,
            FLOAT32 => Self::Float32,
            FLOAT64 => Self::Float64,
            _ => return None,
        };
        Some(ans)
    }

    /// 对应的 NIfTI `datatype` 编码.
    pub const fn nifti_code(&self) -> i16 {
        use nifti_code::*;
        match self {
            Self::UInt8 => UINT8,
            Self::Int8 => INT8,
            Self::UInt16 => UINT16,
            Self::Int16 => INT16,
            Self::UInt32 => UINT32,
            Self::Int32 => INT32,
            Self::UInt64 => UINT64,
            Self::Int64 => INT64,
            Self::Float32 => FLOAT32,
            Self::Float64 => FLOAT64,
        }
    }

    /// 是否为整数类型.
    #[inline]
    pub const fn is_integer(&self) -> bool {
        !matches!(self, Self::Float32 | Self::Float64)
    }
}

impl Display for ScalarType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::UInt8 => "u8",
            Self::Int8 => "i8",
            Self::UInt16 => "u16",
            Self::Int16 => "i16",
            Self::UInt32 => "u32",
            Self::Int32 => "i32",
            Self::UInt64 => "u64",
            Self::Int64 => "i64",
            Self::Float32 => "f32",
            Self::Float64 => "f64",
        };
        f.write_str(name)
    }
}

/// 可参与重切片、厚层投影与着色的体素标量.
///
/// MIP / MinIP / SUM / MEAN 的累加都在该类型本身上完成:
/// 整数加法按位回绕, 整数除法向零截断. 溢出和截断在可视化上是可见的.
pub trait SlabPixel: Copy + PartialOrd + Debug + Send + Sync + 'static {
    /// 运行时类型描述.
    const SCALAR: ScalarType;

    /// 零值.
    fn zero() -> Self;

    /// 原生加法. 整数类型溢出时回绕.
    fn native_add(self, rhs: Self) -> Self;

    /// 除以层数. 整数类型先提升为宽整数再相除, 结果向零截断.
    /// 调用方保证 `n` 非零.
    fn div_count(self, n: usize) -> Self;

    /// 转换为 `f64`.
    fn to_f64(self) -> f64;

    /// 由 `f64` 转换. 整数类型向零截断, 超出表示范围时饱和, NaN 变为 0.
    fn from_f64(v: f64) -> Self;
}

macro_rules! impl_slab_pixel_int {
    ($($ty: ty => $scalar: ident),+ $(,)?) => {
        $(
            impl SlabPixel for $ty {
                const SCALAR: ScalarType = ScalarType::$scalar;

                #[inline]
                fn zero() -> Self {
                    0
                }

                #[inline]
                fn native_add(self, rhs: Self) -> Self {
                    self.wrapping_add(rhs)
                }

                #[inline]
                fn div_count(self, n: usize) -> Self {
                    ((self as i128) / (n as i128)) as $ty
                }

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn from_f64(v: f64) -> Self {
                    v as $ty
                }
            }
        )+
    };
}

macro_rules! impl_slab_pixel_float {
    ($($ty: ty => $scalar: ident),+ $(,)?) => {
        $(
            impl SlabPixel for $ty {
                const SCALAR: ScalarType = ScalarType::$scalar;

                #[inline]
                fn zero() -> Self {
                    0.0
                }

                #[inline]
                fn native_add(self, rhs: Self) -> Self {
                    self + rhs
                }

                #[inline]
                fn div_count(self, n: usize) -> Self {
                    self / n as $ty
                }

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn from_f64(v: f64) -> Self {
                    v as $ty
                }
            }
        )+
    };
}

impl_slab_pixel_int!(
    u8 => UInt8,
    i8 => Int8,
    u16 => UInt16,
    i16 => Int16,
    u32 => UInt32,
    i32 => Int32,
    u64 => UInt64,
    i64 => Int64,
);
impl_slab_pixel_float!(f32 => Float32, f64 => Float64);

#[cfg(test)]
mod tests {
    use super::{ScalarType, SlabPixel};

    #[test]
    fn test_nifti_code_round_trip() {
        for code in [2, 4, 8, 16, 64, 256, 512, 768, 1024, 1280] {
            let ty = ScalarType::from_nifti_code(code).unwrap();
            assert_eq!(ty.nifti_code(), code);
        }
        // complex64, rgb24, rgba32
        assert_eq!(ScalarType::from_nifti_code(32), None);
        assert_eq!(ScalarType::from_nifti_code(128), None);
        assert_eq!(ScalarType::from_nifti_code(2304), None);
    }

    #[test]
    fn test_native_arithmetic() {
        // i16 溢出回绕, 与原生类型一致.
        assert_eq!(30000i16.native_add(10000), -25536);
        assert_eq!(7i16.div_count(2), 3);
        assert_eq!((-7i16).div_count(2), -3);
        assert_eq!(255u8.native_add(1), 0);
        // 层数超出 u8 表示范围时仍能正确相除.
        assert_eq!(200u8.div_count(300), 0);
        assert_eq!(7.0f32.div_count(2), 3.5);
    }

    #[test]
    fn test_from_f64_truncates_and_saturates() {
        assert_eq!(i16::from_f64(2.9), 2);
        assert_eq!(i16::from_f64(-2.9), -2);
        assert_eq!(u8::from_f64(300.0), 255);
        assert_eq!(u8::from_f64(-1.0), 0);
        assert_eq!(i32::from_f64(f64::NAN), 0);
        assert_eq!(<u16 as SlabPixel>::SCALAR, ScalarType::UInt16);
    }
}
