//! Duplicate group repository (重复组数据访问)

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use super::{audit_repo::insert_audit, DuplicateGroupStore};
use crate::{
    db::{self, HealthStatus},
    error::{AppError, Result},
    models::*,
};

const GROUP_COLUMNS: &str = r#"
    g.id, g.tenant_id, t.slug AS tenant_slug, g.scan_id, g.keeper_machine_id,
    g.hash, g.status, g.file_count, g.total_size_bytes
"#;

pub struct GroupRepository {
    db: PgPool,
}

impl GroupRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 批量加载文件实例，按组归并；每组内按 path 字节序排列
    async fn files_for_groups(&self, group_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<FileInstance>>> {
        let files = sqlx::query_as::<_, FileInstance>(
            r#"
            SELECT id, duplicate_group_id, machine_id, path, size_bytes, checksum,
                   last_seen_at, quarantined
            FROM file_instances
            WHERE duplicate_group_id = ANY($1)
            ORDER BY duplicate_group_id, path COLLATE "C"
            "#,
        )
        .bind(group_ids)
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::storage("load file instances", group_ids.len(), e))?;

        let mut by_group: HashMap<Uuid, Vec<FileInstance>> = HashMap::new();
        for file in files {
            by_group.entry(file.duplicate_group_id).or_default().push(file);
        }
        Ok(by_group)
    }
}

#[async_trait]
impl DuplicateGroupStore for GroupRepository {
    // ==================== Queries ====================

    async fn list_by_scan(&self, scan_id: Uuid) -> Result<Vec<DuplicateGroup>> {
        let query = format!(
            r#"
            SELECT {GROUP_COLUMNS}
            FROM duplicate_groups g
            JOIN tenants t ON t.id = g.tenant_id
            WHERE g.scan_id = $1
            ORDER BY g.status COLLATE "C", g.hash COLLATE "C"
            "#
        );
        let rows = sqlx::query_as::<_, DuplicateGroupRow>(&query)
            .bind(scan_id)
            .fetch_all(&self.db)
            .await
            .map_err(|e| AppError::storage("list duplicate groups", scan_id, e))?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut files = self.files_for_groups(&ids).await?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in rows {
            let group_files = files.remove(&row.id).unwrap_or_default();
            groups.push(row.into_group(group_files)?);
        }
        Ok(groups)
    }

    async fn get(&self, group_id: Uuid) -> Result<DuplicateGroup> {
        let query = format!(
            r#"
            SELECT {GROUP_COLUMNS}
            FROM duplicate_groups g
            JOIN tenants t ON t.id = g.tenant_id
            WHERE g.id = $1
            "#
        );
        let row = sqlx::query_as::<_, DuplicateGroupRow>(&query)
            .bind(group_id)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| AppError::storage("load duplicate group", group_id, e))?
            .ok_or(AppError::GroupNotFound)?;

        let files = self
            .files_for_groups(&[group_id])
            .await?
            .remove(&group_id)
            .unwrap_or_default();

        Ok(row.into_group(files)?)
    }

    // ==================== Mutations ====================

    async fn update_keeper(
        &self,
        group_id: Uuid,
        machine_id: Option<Uuid>,
        audit: &ActionAudit,
    ) -> Result<()> {
        let mut tx = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::storage("begin keeper assignment", group_id, e))?;

        let result = sqlx::query(
            r#"
            UPDATE duplicate_groups
            SET keeper_machine_id = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(group_id)
        .bind(machine_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::storage("update keeper machine", group_id, e))?;

        // 未提交的事务在 drop 时回滚
        if result.rows_affected() == 0 {
            return Err(AppError::GroupNotFound);
        }

        insert_audit(&mut *tx, audit).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::storage("commit keeper assignment", group_id, e))
    }

    async fn quarantine_files(&self, group_id: Uuid, audit: &ActionAudit) -> Result<u64> {
        let mut tx = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::storage("begin quarantine", group_id, e))?;

        let result = sqlx::query(
            r#"
            UPDATE file_instances
            SET quarantined = TRUE, updated_at = NOW()
            WHERE duplicate_group_id = $1
            "#,
        )
        .bind(group_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::storage("quarantine files", group_id, e))?;

        insert_audit(&mut *tx, audit).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::storage("commit quarantine", group_id, e))?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        match db::health_check(&self.db).await {
            HealthStatus::Healthy => Ok(()),
            HealthStatus::Unhealthy(reason) => Err(AppError::storage("ping", "postgres", reason)),
        }
    }
}
