//! 统一错误模型
//! 定义所有错误类型和错误响应格式
//!
//! "不存在" 与 "属于其他租户" 共用同一个 NotFound 变体，避免通过错误类型泄露跨租户数据的存在性。

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;

/// 存储层底层错误
pub type StorageSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 租户作用域冲突详情
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeViolation {
    /// 请求头中携带的租户（可能为空）
    pub current_tenant: Option<String>,
    /// 实际请求的租户 slug
    pub requested_slug: String,
    pub reason: String,
}

impl ScopeViolation {
    pub const TENANT_NOT_REGISTERED: &'static str = "tenant not registered";
    pub const PATH_MISMATCH: &'static str = "path tenant does not match active scope";
    pub const BODY_MISMATCH: &'static str = "request tenant does not match active scope";
}

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("tenant scope required")]
    ScopeRequired,

    #[error("tenant scope violation: {}", .0.reason)]
    ScopeViolation(ScopeViolation),

    #[error("duplicate group not found")]
    GroupNotFound,

    #[error("scan not found")]
    ScanNotFound,

    #[error("tenant not found")]
    TenantNotFound,

    #[error("machine not found")]
    MachineNotFound,

    #[error("invalid duplicate group id: {0}")]
    InvalidGroupId(#[source] uuid::Error),

    #[error("invalid machine id: {0}")]
    InvalidMachineId(#[source] uuid::Error),

    #[error("keeper machine id required")]
    KeeperMachineRequired,

    #[error("actionType required")]
    ActionTypeRequired,

    #[error("unsupported action type: {0}")]
    UnknownActionType(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("{operation} {entity}: {source}")]
    Storage {
        operation: &'static str,
        entity: String,
        #[source]
        source: StorageSource,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// 获取 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ScopeRequired
            | AppError::InvalidGroupId(_)
            | AppError::InvalidMachineId(_)
            | AppError::KeeperMachineRequired
            | AppError::ActionTypeRequired
            | AppError::UnknownActionType(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ScopeViolation(_)
            | AppError::GroupNotFound
            | AppError::ScanNotFound
            | AppError::TenantNotFound
            | AppError::MachineNotFound => StatusCode::NOT_FOUND,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Storage { .. }
            | AppError::Database(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 获取用户友好的错误消息（不包含敏感信息）
    pub fn user_message(&self) -> String {
        match self {
            AppError::ScopeViolation(violation) => {
                format!("tenant scope violation: {}", violation.reason)
            }
            AppError::InvalidGroupId(_) => "invalid duplicate group id".to_string(),
            AppError::InvalidMachineId(_) => "invalid machine id".to_string(),
            AppError::Storage { .. } | AppError::Database(_) => {
                "Database error occurred".to_string()
            }
            AppError::Timeout(_) => "Request timeout".to_string(),
            AppError::Config(_) => "Configuration error".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    /// 获取错误码
    pub fn code(&self) -> u16 {
        self.status_code().as_u16()
    }

    /// 是否为客户端错误
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    // 便捷方法
    pub fn storage<E>(operation: &'static str, entity: impl ToString, source: E) -> Self
    where
        E: Into<StorageSource>,
    {
        AppError::Storage {
            operation,
            entity: entity.to_string(),
            source: source.into(),
        }
    }

    pub fn scope_violation(
        current_tenant: Option<&str>,
        requested_slug: &str,
        reason: &str,
    ) -> Self {
        AppError::ScopeViolation(ScopeViolation {
            current_tenant: current_tenant.map(str::to_string),
            requested_slug: requested_slug.to_string(),
            reason: reason.to_string(),
        })
    }

    pub fn internal_error(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }

    pub fn timeout(msg: &str) -> Self {
        AppError::Timeout(msg.to_string())
    }
}

/// 错误响应 DTO
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: u16,
    pub message: String,
    pub request_id: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: self.code(),
                message: self.user_message(),
                request_id,
            },
        };

        // 客户端错误只记 warn，服务端错误记 error
        if self.is_client_error() {
            tracing::warn!(
                code = self.code(),
                message = %self,
                request_id = %error_response.error.request_id,
                "Request rejected"
            );
        } else {
            tracing::error!(
                code = self.code(),
                message = %self,
                request_id = %error_response.error.request_id,
                "Application error"
            );
        }

        (status, Json(error_response)).into_response()
    }
}

/// 从 config::ConfigError 转换
impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}
