//! 数据模型模块
//! 租户、机器、扫描、重复文件组与动作审计

pub mod audit;
pub mod duplicate_group;
pub mod scan;
pub mod tenant;

pub use audit::*;
pub use duplicate_group::*;
pub use scan::*;
pub use tenant::*;

/// 文本列无法映射到枚举时返回的错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl From<UnknownVariant> for crate::error::AppError {
    fn from(e: UnknownVariant) -> Self {
        crate::error::AppError::Internal(e.to_string())
    }
}
