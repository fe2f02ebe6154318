//! 运行时错误.

use super::ViewId;
use crate::thick::ProjectError;
use std::fmt::{Display, Formatter};

/// 切片映射器的运行时错误.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapperError {
    /// 厚层投影失败.
    Project(ProjectError),

    /// 体数据或切面的变换不可逆.
    SingularGeometry,

    /// 视图未注册或已被移除.
    UnknownView(ViewId),
}

impl Display for MapperError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Project(e) => write!(f, "{e}"),
            Self::SingularGeometry => write!(f, "体数据或切面的几何变换不可逆"),
            Self::UnknownView(id) => write!(f, "未知视图: {id:?}"),
        }
    }
}

impl std::error::Error for MapperError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Project(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ProjectError> for MapperError {
    fn from(e: ProjectError) -> Self {
        Self::Project(e)
    }
}

/// 切片映射器的结果.
pub type MapperResult<T> = Result<T, MapperError>;
