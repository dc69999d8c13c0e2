//! 保管机指派与处置动作的 HTTP 处理器

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::invalid_payload;
use crate::{
    error::AppError,
    middleware::AppState,
    models::{DuplicateAction, RemediationPayload},
    tenancy::Scope,
};

/// 处置动作的操作者
const ACTION_ACTOR: &str = "system";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeeperRequest {
    #[serde(default)]
    pub tenant_slug: Option<String>,
    #[serde(default)]
    pub keeper_machine_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    #[serde(default)]
    pub tenant_slug: Option<String>,
    #[serde(default)]
    pub action_type: String,
    #[serde(default)]
    pub target_file_ids: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

impl ActionRequest {
    fn action(&self) -> Result<DuplicateAction, AppError> {
        let action_type = self.action_type.trim();
        if action_type.is_empty() {
            return Err(AppError::ActionTypeRequired);
        }
        action_type
            .parse()
            .map_err(|_| AppError::UnknownActionType(action_type.to_string()))
    }
}

/// 指派保管机
pub async fn assign_keeper(
    State(state): State<Arc<AppState>>,
    scope: Scope,
    Path(group_id): Path<String>,
    body: Result<Json<KeeperRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = body.map_err(invalid_payload)?;
    scope.ensure_matches(req.tenant_slug.as_deref())?;

    let audit = state
        .dispatcher
        .assign_keeper(&scope, &group_id, &req.keeper_machine_id)
        .await?;

    Ok(Json(json!({
        "status": "ok",
        "message": "keeper assignment recorded",
        "auditId": audit.id
    })))
}

/// 触发处置动作
pub async fn perform_action(
    State(state): State<Arc<AppState>>,
    scope: Scope,
    Path(group_id): Path<String>,
    body: Result<Json<ActionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = body.map_err(invalid_payload)?;
    scope.ensure_matches(req.tenant_slug.as_deref())?;
    let action = req.action()?;

    let payload = RemediationPayload {
        target_file_ids: req.target_file_ids,
        notes: req.notes,
    };
    let audit = state
        .dispatcher
        .perform_action(&scope, &group_id, ACTION_ACTOR, action, payload)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "accepted",
            "message": "action queued",
            "auditId": audit.id
        })),
    ))
}
