//! 扫描与重复组的 HTTP 处理器

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::{
    error::AppError,
    middleware::AppState,
    tenancy::{Scope, ScopedRepository},
};

fn scoped(state: &AppState, scope: Scope) -> ScopedRepository {
    ScopedRepository::new(
        scope,
        state.repositories.scans.clone(),
        state.repositories.groups.clone(),
    )
}

/// 列出作用域租户的扫描
pub async fn list_scans(
    State(state): State<Arc<AppState>>,
    scope: Scope,
) -> Result<impl IntoResponse, AppError> {
    let scans = scoped(&state, scope).list_scans().await?;

    Ok(Json(json!({ "scans": scans })))
}

/// 扫描详情及其重复组
pub async fn get_scan(
    State(state): State<Arc<AppState>>,
    scope: Scope,
    Path(scan_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let repo = scoped(&state, scope);
    let scan = repo.get_scan(&scan_id).await?;
    let groups = repo.duplicate_groups(&scan_id).await?;

    Ok(Json(json!({
        "scan": scan,
        "groups": groups
    })))
}
