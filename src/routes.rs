//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

use crate::{handlers, middleware::AppState, tenancy::require_tenant_scope};

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开端点
    let public_routes = Router::new()
        .route("/healthz", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readiness_check))
        .route("/tenants", get(handlers::tenants::list_tenants));

    // 需要租户作用域的路由
    let scoped_routes = Router::new()
        .route(
            "/tenants/{tenantSlug}/machines",
            get(handlers::tenants::list_machines),
        )
        .route(
            "/tenants/{tenantSlug}/scans",
            get(handlers::scans::list_scans),
        )
        .route("/scans/{scanId}", get(handlers::scans::get_scan))
        .route(
            "/duplicate-groups/{groupId}/audits",
            get(handlers::audit::list_group_audits),
        )
        .route(
            "/duplicate-groups/{groupId}/keeper",
            post(handlers::actions::assign_keeper),
        )
        .route(
            "/duplicate-groups/{groupId}/actions",
            post(handlers::actions::perform_action),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_tenant_scope,
        ));

    Router::new()
        .merge(public_routes)
        .merge(scoped_routes)
        .layer(RequestBodyLimitLayer::new(state.config.server.body_limit_bytes))
        .layer(axum::middleware::from_fn(
            crate::middleware::request_tracking_middleware,
        ))
        .with_state(state)
}
