//! Scan repository (扫描数据访问)

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use super::ScanStore;
use crate::{
    error::{AppError, Result},
    models::*,
};

pub struct ScanRepository {
    db: PgPool,
}

impl ScanRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 按扫描统计各状态的重复组数量
    async fn status_counts(&self, scan_ids: &[Uuid]) -> Result<HashMap<Uuid, BTreeMap<String, i64>>> {
        let rows: Vec<(Uuid, String, i64)> = sqlx::query_as(
            r#"
            SELECT scan_id, status, COUNT(*)
            FROM duplicate_groups
            WHERE scan_id = ANY($1)
            GROUP BY scan_id, status
            "#,
        )
        .bind(scan_ids)
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::storage("count duplicate groups", scan_ids.len(), e))?;

        let mut counts: HashMap<Uuid, BTreeMap<String, i64>> = HashMap::new();
        for (scan_id, status, count) in rows {
            counts.entry(scan_id).or_default().insert(status, count);
        }
        Ok(counts)
    }
}

#[async_trait]
impl ScanStore for ScanRepository {
    async fn list_by_tenant(&self, tenant_slug: &str) -> Result<Vec<ScanSummary>> {
        let rows = sqlx::query_as::<_, ScanRow>(
            r#"
            SELECT s.id, s.tenant_id, s.initiated_machine_id, s.name, s.description,
                   s.started_at, s.completed_at, s.duplicate_group_count,
                   t.slug AS tenant_slug
            FROM scans s
            JOIN tenants t ON t.id = s.tenant_id
            WHERE t.slug = $1
            ORDER BY s.started_at ASC
            "#,
        )
        .bind(tenant_slug)
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::storage("list scans", tenant_slug, e))?;

        let ids: Vec<Uuid> = rows.iter().map(|row| row.scan.id).collect();
        let mut counts = self.status_counts(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let status_counts = counts.remove(&row.scan.id).unwrap_or_default();
                ScanSummary::new(row.scan, row.tenant_slug, status_counts)
            })
            .collect())
    }

    async fn get(&self, scan_id: Uuid) -> Result<ScanSummary> {
        let row = sqlx::query_as::<_, ScanRow>(
            r#"
            SELECT s.id, s.tenant_id, s.initiated_machine_id, s.name, s.description,
                   s.started_at, s.completed_at, s.duplicate_group_count,
                   t.slug AS tenant_slug
            FROM scans s
            JOIN tenants t ON t.id = s.tenant_id
            WHERE s.id = $1
            "#,
        )
        .bind(scan_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::storage("load scan", scan_id, e))?
        .ok_or(AppError::ScanNotFound)?;

        let status_counts = self
            .status_counts(&[scan_id])
            .await?
            .remove(&scan_id)
            .unwrap_or_default();

        Ok(ScanSummary::new(row.scan, row.tenant_slug, status_counts))
    }
}
