//! HTTP 处理器模块

pub mod actions;
pub mod audit;
pub mod health;
pub mod scans;
pub mod tenants;

use axum::extract::rejection::JsonRejection;

use crate::error::AppError;

/// 请求体解析失败统一返回 400
pub(crate) fn invalid_payload(rejection: JsonRejection) -> AppError {
    tracing::debug!(error = %rejection, "Request body rejected");
    AppError::BadRequest("invalid payload".to_string())
}
