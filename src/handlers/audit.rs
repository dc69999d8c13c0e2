//! 审计查询的 HTTP 处理器

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::{
    error::AppError,
    middleware::AppState,
    models::{ActionType, AuditFilters},
    tenancy::{Scope, ScopedRepository},
};

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub action_type: Option<ActionType>,
    pub actor: Option<String>,
    pub stubbed: Option<bool>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// 重复组的审计记录（最新优先）
pub async fn list_group_audits(
    State(state): State<Arc<AppState>>,
    scope: Scope,
    Path(group_id): Path<String>,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse, AppError> {
    let group = ScopedRepository::new(
        scope,
        state.repositories.scans.clone(),
        state.repositories.groups.clone(),
    )
    .get_duplicate_group(&group_id)
    .await?;

    let filters = AuditFilters {
        action_type: query.action_type,
        actor: query.actor,
        stubbed: query.stubbed,
        ..AuditFilters::for_group(group.tenant_id, group.id)
    };

    let audits = state
        .audit_service
        .query(&filters, query.limit, query.offset)
        .await?;
    let total = state.audit_service.count(&filters).await?;

    Ok(Json(json!({
        "audits": audits,
        "total": total
    })))
}
