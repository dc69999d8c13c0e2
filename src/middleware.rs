//! HTTP 中间件
//! 应用状态与请求追踪

use axum::{extract::Request, http::HeaderMap, http::HeaderValue, middleware::Next, response::Response};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    repository::Repositories,
    services::{ActionDispatcher, AuditService, TenantDirectory},
    tenancy::ScopeResolver,
};

/// 应用状态
///
/// 所有服务共享同一组存储句柄，Clone 只复制 Arc。
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub repositories: Repositories,
    pub directory: Arc<TenantDirectory>,
    pub resolver: Arc<ScopeResolver>,
    pub dispatcher: Arc<ActionDispatcher>,
    pub audit_service: Arc<AuditService>,
}

impl AppState {
    pub fn new(config: AppConfig, repositories: Repositories) -> Self {
        let directory = Arc::new(TenantDirectory::new(repositories.tenants.clone()));
        let resolver = Arc::new(ScopeResolver::new(directory.clone()));
        let audit_service = Arc::new(AuditService::new(repositories.audit.clone()));
        let dispatcher = Arc::new(ActionDispatcher::new(
            repositories.groups.clone(),
            repositories.scans.clone(),
            repositories.tenants.clone(),
            audit_service.clone(),
            config.dispatcher.clone(),
        ));

        Self {
            config,
            repositories,
            directory,
            resolver,
            dispatcher,
            audit_service,
        }
    }
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().clone();
    let uri = req.uri().to_string();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    async move {
        let start = Instant::now();
        let mut response = next.run(req).await;
        let elapsed = start.elapsed();

        let status = response.status().as_u16();
        let method_name = match method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PUT" => "PUT",
            "DELETE" => "DELETE",
            "PATCH" => "PATCH",
            _ => "UNKNOWN",
        };
        let status_code = match status {
            200 => "200",
            202 => "202",
            400 => "400",
            404 => "404",
            413 => "413",
            500 => "500",
            503 => "503",
            504 => "504",
            _ => "other",
        };

        metrics::counter!("duplynx_http_requests_total", "method" => method_name, "status" => status_code)
            .increment(1);
        metrics::histogram!("duplynx_http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            method = %method,
            uri = %uri,
            status = status,
            elapsed_ms = elapsed.as_millis(),
            "Request completed"
        );

        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
