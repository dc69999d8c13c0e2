//! Tenant repository (租户与机器数据访问)

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::TenantStore;
use crate::{
    error::{AppError, Result},
    models::*,
};

pub struct TenantRepository {
    db: PgPool,
}

impl TenantRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TenantStore for TenantRepository {
    // ==================== Tenants ====================

    async fn list_tenants(&self) -> Result<Vec<TenantSummary>> {
        sqlx::query_as::<_, TenantSummary>(
            r#"
            SELECT t.id, t.slug, t.name, t.description, t.primary_contact,
                   COUNT(m.id) AS machine_count
            FROM tenants t
            LEFT JOIN machines m ON m.tenant_id = t.id
            GROUP BY t.id
            ORDER BY t.name ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::storage("list tenants", "*", e))
    }

    async fn tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>> {
        sqlx::query_as::<_, Tenant>(
            r#"
            SELECT id, slug, name, description, primary_contact
            FROM tenants
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::storage("load tenant", slug, e))
    }

    // ==================== Machines ====================

    async fn machines_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<Machine>> {
        let rows = sqlx::query_as::<_, MachineRow>(
            r#"
            SELECT id, tenant_id, name, category, hostname, role, last_scan_at
            FROM machines
            WHERE tenant_id = $1
            ORDER BY name ASC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::storage("list machines", tenant_id, e))?;

        rows.into_iter()
            .map(|row| Machine::try_from(row).map_err(AppError::from))
            .collect()
    }

    async fn machine(&self, machine_id: Uuid) -> Result<Option<Machine>> {
        let row = sqlx::query_as::<_, MachineRow>(
            r#"
            SELECT id, tenant_id, name, category, hostname, role, last_scan_at
            FROM machines
            WHERE id = $1
            "#,
        )
        .bind(machine_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::storage("load machine", machine_id, e))?;

        Ok(row.map(Machine::try_from).transpose()?)
    }
}
