//! 租户与机器的 HTTP 处理器

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::{error::AppError, middleware::AppState, tenancy::Scope};

#[derive(Debug, Deserialize)]
pub struct MachinesQuery {
    pub selected_machine: Option<String>,
}

/// 列出所有租户
pub async fn list_tenants(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let tenants = state.directory.list_tenants().await?;

    Ok(Json(json!({ "tenants": tenants })))
}

/// 列出作用域租户的机器
///
/// `selected_machine` 仅用于记录选择事件，找不到时忽略。
pub async fn list_machines(
    State(state): State<Arc<AppState>>,
    scope: Scope,
    Query(query): Query<MachinesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let machines = state.directory.list_machines(&scope.tenant_slug).await?;

    if let Some(selected) = query.selected_machine.as_deref().filter(|s| !s.trim().is_empty()) {
        if let Err(e) = state.directory.find_machine(&scope.tenant_slug, selected).await {
            tracing::debug!(error = %e, selected, "Selected machine ignored");
        }
    }

    Ok(Json(json!({ "machines": machines })))
}
