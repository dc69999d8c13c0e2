//! Audit repository (审计数据访问)
//!
//! action_audits 表由触发器保证只追加；这里只有 INSERT 与 SELECT。

use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool};

use super::AuditLog;
use crate::{
    error::{AppError, Result},
    models::*,
};

pub struct AuditRepository {
    db: PgPool,
}

impl AuditRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// 写入一条审计记录；传入事务连接时与同事务内的变更一起提交或回滚
pub(crate) async fn insert_audit<'e, E>(executor: E, audit: &ActionAudit) -> Result<()>
where
    E: PgExecutor<'e>,
{
    let payload = audit.payload.as_ref().map(AuditPayload::to_json);

    sqlx::query(
        r#"
        INSERT INTO action_audits (
            id, tenant_id, duplicate_group_id, actor, action_type,
            payload, payload_version, performed_at, stubbed
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(audit.id)
    .bind(audit.tenant_id)
    .bind(audit.duplicate_group_id)
    .bind(&audit.actor)
    .bind(audit.action_type.as_str())
    .bind(payload)
    .bind(PAYLOAD_VERSION)
    .bind(audit.performed_at)
    .bind(audit.stubbed)
    .execute(executor)
    .await
    .map_err(|e| AppError::storage("append audit", audit.id, e))?;

    Ok(())
}

/// 拼接过滤条件，返回已使用的占位符数量
fn push_filters(query: &mut String, filters: &AuditFilters) -> usize {
    let mut index = 0;

    if filters.tenant_id.is_some() {
        index += 1;
        query.push_str(&format!(" AND tenant_id = ${}", index));
    }
    if filters.duplicate_group_id.is_some() {
        index += 1;
        query.push_str(&format!(" AND duplicate_group_id = ${}", index));
    }
    if filters.action_type.is_some() {
        index += 1;
        query.push_str(&format!(" AND action_type = ${}", index));
    }
    if filters.actor.is_some() {
        index += 1;
        query.push_str(&format!(" AND actor = ${}", index));
    }
    if filters.stubbed.is_some() {
        index += 1;
        query.push_str(&format!(" AND stubbed = ${}", index));
    }
    if filters.start_time.is_some() {
        index += 1;
        query.push_str(&format!(" AND performed_at >= ${}", index));
    }
    if filters.end_time.is_some() {
        index += 1;
        query.push_str(&format!(" AND performed_at <= ${}", index));
    }

    index
}

#[async_trait]
impl AuditLog for AuditRepository {
    // ==================== Action Audits ====================

    async fn append(&self, audit: &ActionAudit) -> Result<()> {
        insert_audit(&self.db, audit).await
    }

    async fn query(
        &self,
        filters: &AuditFilters,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ActionAudit>> {
        let mut query = String::from(
            r#"
            SELECT id, tenant_id, duplicate_group_id, actor, action_type,
                   payload, payload_version, performed_at, stubbed
            FROM action_audits WHERE 1=1"#,
        );
        let index = push_filters(&mut query, filters);
        query.push_str(&format!(
            " ORDER BY performed_at DESC, id DESC LIMIT ${} OFFSET ${}",
            index + 1,
            index + 2
        ));

        let mut query_builder = sqlx::query_as::<_, ActionAuditRow>(&query);

        if let Some(tenant_id) = filters.tenant_id {
            query_builder = query_builder.bind(tenant_id);
        }
        if let Some(group_id) = filters.duplicate_group_id {
            query_builder = query_builder.bind(group_id);
        }
        if let Some(action_type) = filters.action_type {
            query_builder = query_builder.bind(action_type.as_str());
        }
        if let Some(actor) = &filters.actor {
            query_builder = query_builder.bind(actor);
        }
        if let Some(stubbed) = filters.stubbed {
            query_builder = query_builder.bind(stubbed);
        }
        if let Some(start_time) = filters.start_time {
            query_builder = query_builder.bind(start_time);
        }
        if let Some(end_time) = filters.end_time {
            query_builder = query_builder.bind(end_time);
        }

        let rows = query_builder
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.db)
            .await
            .map_err(|e| AppError::storage("query audits", "action_audits", e))?;

        rows.into_iter()
            .map(|row| ActionAudit::try_from(row).map_err(AppError::from))
            .collect()
    }

    async fn count(&self, filters: &AuditFilters) -> Result<i64> {
        let mut query = String::from("SELECT COUNT(*) FROM action_audits WHERE 1=1");
        push_filters(&mut query, filters);

        let mut query_builder = sqlx::query_scalar::<_, i64>(&query);

        if let Some(tenant_id) = filters.tenant_id {
            query_builder = query_builder.bind(tenant_id);
        }
        if let Some(group_id) = filters.duplicate_group_id {
            query_builder = query_builder.bind(group_id);
        }
        if let Some(action_type) = filters.action_type {
            query_builder = query_builder.bind(action_type.as_str());
        }
        if let Some(actor) = &filters.actor {
            query_builder = query_builder.bind(actor);
        }
        if let Some(stubbed) = filters.stubbed {
            query_builder = query_builder.bind(stubbed);
        }
        if let Some(start_time) = filters.start_time {
            query_builder = query_builder.bind(start_time);
        }
        if let Some(end_time) = filters.end_time {
            query_builder = query_builder.bind(end_time);
        }

        query_builder
            .fetch_one(&self.db)
            .await
            .map_err(|e| AppError::storage("count audits", "action_audits", e))
    }
}
