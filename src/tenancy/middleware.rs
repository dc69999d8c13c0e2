//! 租户作用域中间件

use axum::{
    extract::{FromRequestParts, RawPathParams, Request, State},
    http::{request::Parts, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::{Scope, HEADER_TENANT_SLUG};
use crate::{error::AppError, middleware::AppState};

/// 路径中的租户参数名
pub const PATH_TENANT_PARAM: &str = "tenantSlug";

// 在 handler 中直接提取作用域
impl<S> FromRequestParts<S> for Scope
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Scope>()
            .cloned()
            .ok_or(AppError::ScopeRequired)
    }
}

/// 解析租户作用域并附加到请求扩展
///
/// 需通过 `route_layer` 挂载，路由匹配后才能读取路径参数。
pub async fn require_tenant_scope(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let header = parts
        .headers
        .get(HEADER_TENANT_SLUG)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let path = RawPathParams::from_request_parts(&mut parts, &())
        .await
        .ok()
        .and_then(|params| {
            params
                .iter()
                .find(|(key, _)| *key == PATH_TENANT_PARAM)
                .map(|(_, value)| value.to_string())
        });

    let scope = state
        .resolver
        .resolve(header.as_deref(), path.as_deref())
        .await?;

    tracing::debug!(tenant = %scope.tenant_slug, "Tenant scope resolved");

    let echo = HeaderValue::from_str(&scope.tenant_slug).ok();
    parts.extensions.insert(scope);

    let mut response = next.run(Request::from_parts(parts, body)).await;
    if let Some(value) = echo {
        response.headers_mut().insert(HEADER_TENANT_SLUG, value);
    }
    Ok(response)
}
