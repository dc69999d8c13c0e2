//! 租户隔离的读取入口
//!
//! 所有按 id 读取扫描与重复组的路径都经过这里；跨租户的数据一律表现为不存在。

use std::sync::Arc;
use uuid::Uuid;

use super::Scope;
use crate::{
    error::{AppError, Result},
    models::*,
    repository::{DuplicateGroupStore, ScanStore},
};

pub struct ScopedRepository {
    scope: Scope,
    scans: Arc<dyn ScanStore>,
    groups: Arc<dyn DuplicateGroupStore>,
}

impl ScopedRepository {
    pub fn new(
        scope: Scope,
        scans: Arc<dyn ScanStore>,
        groups: Arc<dyn DuplicateGroupStore>,
    ) -> Self {
        Self {
            scope,
            scans,
            groups,
        }
    }

    // ==================== Scans ====================

    pub async fn list_scans(&self) -> Result<Vec<ScanSummary>> {
        self.scans.list_by_tenant(&self.scope.tenant_slug).await
    }

    pub async fn get_scan(&self, scan_id: &str) -> Result<ScanSummary> {
        let Ok(scan_id) = Uuid::parse_str(scan_id.trim()) else {
            return Err(AppError::ScanNotFound);
        };

        let scan = self.scans.get(scan_id).await?;
        if scan.tenant_slug != self.scope.tenant_slug {
            return Err(AppError::ScanNotFound);
        }
        Ok(scan)
    }

    // ==================== Duplicate Groups ====================

    pub async fn duplicate_groups(&self, scan_id: &str) -> Result<Vec<DuplicateGroup>> {
        let scan = self.get_scan(scan_id).await?;

        let groups = self.groups.list_by_scan(scan.id()).await?;
        Ok(groups
            .into_iter()
            .filter(|g| g.belongs_to(&self.scope.tenant_slug))
            .collect())
    }

    pub async fn get_duplicate_group(&self, group_id: &str) -> Result<DuplicateGroup> {
        let group_id = Uuid::parse_str(group_id.trim()).map_err(AppError::InvalidGroupId)?;
        self.get_duplicate_group_by_id(group_id).await
    }

    pub async fn get_duplicate_group_by_id(&self, group_id: Uuid) -> Result<DuplicateGroup> {
        let group = self.groups.get(group_id).await?;
        if !group.belongs_to(&self.scope.tenant_slug) {
            tracing::warn!(
                tenant = %self.scope.tenant_slug,
                group_id = %group_id,
                "Cross-tenant duplicate group access rejected"
            );
            return Err(AppError::GroupNotFound);
        }
        Ok(group)
    }
}
