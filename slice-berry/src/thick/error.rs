//! 运行时错误.

use std::fmt::{Display, Formatter};

/// 厚层投影的运行时错误.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectError {
    /// 请求的 z 范围与体素板的交集为空.
    ///
    /// 两个参数为裁剪到体素板之后的 `z_min` 和 `z_max`.
    EmptyRange { z_min: i64, z_max: i64 },
}

impl Display for ProjectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyRange { z_min, z_max } => {
                write!(f, "厚层投影范围为空: [{z_min}, {z_max}]")
            }
        }
    }
}

impl std::error::Error for ProjectError {}

/// 厚层投影的结果.
pub type ProjectResult<T> = Result<T, ProjectError>;
