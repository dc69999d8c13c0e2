//! Database repository layer
//!
//! 每类存储一个 trait，生产实现基于 PostgreSQL，测试与演示使用 [`InMemoryStore`]。

pub mod audit_repo;
pub mod group_repo;
pub mod memory;
pub mod scan_repo;
pub mod tenant_repo;

pub use audit_repo::*;
pub use group_repo::*;
pub use memory::*;
pub use scan_repo::*;
pub use tenant_repo::*;

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::{error::Result, models::*};

/// 重复组存储
#[async_trait]
pub trait DuplicateGroupStore: Send + Sync {
    /// 按 (status 文本, hash) 升序返回扫描下的所有重复组，组内文件按 path 排序
    async fn list_by_scan(&self, scan_id: Uuid) -> Result<Vec<DuplicateGroup>>;

    /// 加载单个重复组；不存在时返回 GroupNotFound
    async fn get(&self, group_id: Uuid) -> Result<DuplicateGroup>;

    /// 设置或清除保管机并追加审计记录，两者同时生效或同时不生效；不修改 status
    async fn update_keeper(
        &self,
        group_id: Uuid,
        machine_id: Option<Uuid>,
        audit: &ActionAudit,
    ) -> Result<()>;

    /// 将组内全部文件标记为隔离并追加审计记录，返回受影响的文件数
    ///
    /// 与 `update_keeper` 相同，变更与审计在同一次写入中完成。
    async fn quarantine_files(&self, group_id: Uuid, audit: &ActionAudit) -> Result<u64>;

    async fn ping(&self) -> Result<()>;
}

/// 扫描存储
#[async_trait]
pub trait ScanStore: Send + Sync {
    /// 租户下的扫描，按 started_at 升序
    async fn list_by_tenant(&self, tenant_slug: &str) -> Result<Vec<ScanSummary>>;

    /// 不存在时返回 ScanNotFound
    async fn get(&self, scan_id: Uuid) -> Result<ScanSummary>;
}

/// 租户与机器目录存储
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// 按名称排序
    async fn list_tenants(&self) -> Result<Vec<TenantSummary>>;

    async fn tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>>;

    /// 按名称排序
    async fn machines_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<Machine>>;

    async fn machine(&self, machine_id: Uuid) -> Result<Option<Machine>>;
}

/// 只追加的动作审计日志
///
/// 伴随存储变更的审计由 [`DuplicateGroupStore`] 在同一写入中追加，这里的 `append` 只用于无变更的动作。
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, audit: &ActionAudit) -> Result<()>;

    /// 按 performed_at 倒序
    async fn query(&self, filters: &AuditFilters, limit: i64, offset: i64)
        -> Result<Vec<ActionAudit>>;

    async fn count(&self, filters: &AuditFilters) -> Result<i64>;
}

/// 一组共享同一后端的存储句柄
#[derive(Clone)]
pub struct Repositories {
    pub tenants: Arc<dyn TenantStore>,
    pub scans: Arc<dyn ScanStore>,
    pub groups: Arc<dyn DuplicateGroupStore>,
    pub audit: Arc<dyn AuditLog>,
}

impl Repositories {
    pub fn postgres(db: PgPool) -> Self {
        Self {
            tenants: Arc::new(TenantRepository::new(db.clone())),
            scans: Arc::new(ScanRepository::new(db.clone())),
            groups: Arc::new(GroupRepository::new(db.clone())),
            audit: Arc::new(AuditRepository::new(db)),
        }
    }

    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            tenants: store.clone(),
            scans: store.clone(),
            groups: store.clone(),
            audit: store,
        }
    }
}
