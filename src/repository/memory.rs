//! In-memory store
//!
//! 同时实现四个存储 trait，供测试与本地演示使用。内部以单个 RwLock 保护全部数据，
//! 读取返回克隆的快照；变更与其审计在同一个写锁内完成。
//! 写入失败与读取延迟可注入，用于验证分发器的失败路径。

use async_trait::async_trait;
use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
    time::Duration,
};
use uuid::Uuid;

use super::{AuditLog, DuplicateGroupStore, ScanStore, TenantStore};
use crate::{
    error::{AppError, Result},
    models::*,
    seed::Dataset,
};

#[derive(Debug, Default)]
struct Data {
    tenants: Vec<Tenant>,
    machines: Vec<Machine>,
    scans: Vec<Scan>,
    groups: HashMap<Uuid, DuplicateGroup>,
    audits: Vec<ActionAudit>,
}

impl Data {
    fn tenant_slug(&self, tenant_id: Uuid) -> Option<&str> {
        self.tenants
            .iter()
            .find(|t| t.id == tenant_id)
            .map(|t| t.slug.as_str())
    }

    fn summarize(&self, scan: &Scan) -> ScanSummary {
        let mut status_counts: BTreeMap<String, i64> = BTreeMap::new();
        for group in self.groups.values().filter(|g| g.scan_id == scan.id) {
            *status_counts.entry(group.status.as_str().to_string()).or_default() += 1;
        }
        let slug = self.tenant_slug(scan.tenant_id).unwrap_or_default().to_string();
        ScanSummary::new(scan.clone(), slug, status_counts)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: RwLock<Data>,
    fail_writes: AtomicBool,
    fail_audit_appends: AtomicBool,
    read_latency_ms: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dataset(dataset: Dataset) -> Self {
        let groups = dataset
            .groups
            .into_iter()
            .map(|mut group| {
                group.files.sort_by(|a, b| a.path.cmp(&b.path));
                (group.id, group)
            })
            .collect();

        Self {
            data: RwLock::new(Data {
                tenants: dataset.tenants,
                machines: dataset.machines,
                scans: dataset.scans,
                groups,
                audits: dataset.audits,
            }),
            ..Self::default()
        }
    }

    /// 让重复组写入（保管机、隔离）返回存储错误
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// 让审计追加返回存储错误
    pub fn fail_audit_appends(&self, fail: bool) {
        self.fail_audit_appends.store(fail, Ordering::SeqCst);
    }

    /// 为重复组读取增加固定延迟
    pub fn set_read_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.read_latency_ms.store(millis, Ordering::SeqCst);
    }

    /// 当前审计条数
    pub fn audit_len(&self) -> usize {
        self.data.read().map(|data| data.audits.len()).unwrap_or(0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Data>> {
        self.data
            .read()
            .map_err(|_| AppError::internal_error("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Data>> {
        self.data
            .write()
            .map_err(|_| AppError::internal_error("in-memory store lock poisoned"))
    }

    async fn simulate_latency(&self) {
        let millis = self.read_latency_ms.load(Ordering::SeqCst);
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }

    fn check_audit_writable(&self, audit: &ActionAudit) -> Result<()> {
        if self.fail_audit_appends.load(Ordering::SeqCst) {
            return Err(AppError::storage("append audit", audit.id, "write rejected by store"));
        }
        Ok(())
    }

    fn check_writable(&self, operation: &'static str, entity: Uuid) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::storage(operation, entity, "write rejected by store"));
        }
        Ok(())
    }
}

#[async_trait]
impl DuplicateGroupStore for InMemoryStore {
    async fn list_by_scan(&self, scan_id: Uuid) -> Result<Vec<DuplicateGroup>> {
        self.simulate_latency().await;
        let data = self.read()?;
        let mut groups: Vec<DuplicateGroup> = data
            .groups
            .values()
            .filter(|g| g.scan_id == scan_id)
            .cloned()
            .collect();
        groups.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Ok(groups)
    }

    async fn get(&self, group_id: Uuid) -> Result<DuplicateGroup> {
        self.simulate_latency().await;
        self.read()?
            .groups
            .get(&group_id)
            .cloned()
            .ok_or(AppError::GroupNotFound)
    }

    async fn update_keeper(
        &self,
        group_id: Uuid,
        machine_id: Option<Uuid>,
        audit: &ActionAudit,
    ) -> Result<()> {
        self.check_writable("update keeper machine", group_id)?;
        let mut data = self.write()?;
        if !data.groups.contains_key(&group_id) {
            return Err(AppError::GroupNotFound);
        }
        // 先确认审计可写，再动重复组
        self.check_audit_writable(audit)?;

        if let Some(group) = data.groups.get_mut(&group_id) {
            group.keeper_machine_id = machine_id.filter(|id| !id.is_nil());
        }
        data.audits.push(audit.clone());
        Ok(())
    }

    async fn quarantine_files(&self, group_id: Uuid, audit: &ActionAudit) -> Result<u64> {
        self.check_writable("quarantine files", group_id)?;
        let mut data = self.write()?;
        self.check_audit_writable(audit)?;

        let touched = match data.groups.get_mut(&group_id) {
            Some(group) => {
                for file in group.files.iter_mut() {
                    file.quarantined = true;
                }
                group.files.len() as u64
            }
            None => 0,
        };
        data.audits.push(audit.clone());
        Ok(touched)
    }

    async fn ping(&self) -> Result<()> {
        self.read().map(|_| ())
    }
}

#[async_trait]
impl ScanStore for InMemoryStore {
    async fn list_by_tenant(&self, tenant_slug: &str) -> Result<Vec<ScanSummary>> {
        let data = self.read()?;
        let mut scans: Vec<ScanSummary> = data
            .scans
            .iter()
            .filter(|scan| data.tenant_slug(scan.tenant_id) == Some(tenant_slug))
            .map(|scan| data.summarize(scan))
            .collect();
        scans.sort_by_key(|s| s.scan.started_at);
        Ok(scans)
    }

    async fn get(&self, scan_id: Uuid) -> Result<ScanSummary> {
        let data = self.read()?;
        data.scans
            .iter()
            .find(|scan| scan.id == scan_id)
            .map(|scan| data.summarize(scan))
            .ok_or(AppError::ScanNotFound)
    }
}

#[async_trait]
impl TenantStore for InMemoryStore {
    async fn list_tenants(&self) -> Result<Vec<TenantSummary>> {
        let data = self.read()?;
        let mut tenants: Vec<TenantSummary> = data
            .tenants
            .iter()
            .map(|tenant| TenantSummary {
                tenant: tenant.clone(),
                machine_count: data
                    .machines
                    .iter()
                    .filter(|m| m.tenant_id == tenant.id)
                    .count() as i64,
            })
            .collect();
        tenants.sort_by(|a, b| a.tenant.name.cmp(&b.tenant.name));
        Ok(tenants)
    }

    async fn tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>> {
        Ok(self.read()?.tenants.iter().find(|t| t.slug == slug).cloned())
    }

    async fn machines_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<Machine>> {
        let mut machines: Vec<Machine> = self
            .read()?
            .machines
            .iter()
            .filter(|m| m.tenant_id == tenant_id)
            .cloned()
            .collect();
        machines.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(machines)
    }

    async fn machine(&self, machine_id: Uuid) -> Result<Option<Machine>> {
        Ok(self.read()?.machines.iter().find(|m| m.id == machine_id).cloned())
    }
}

#[async_trait]
impl AuditLog for InMemoryStore {
    async fn append(&self, audit: &ActionAudit) -> Result<()> {
        self.check_audit_writable(audit)?;
        self.write()?.audits.push(audit.clone());
        Ok(())
    }

    async fn query(
        &self,
        filters: &AuditFilters,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ActionAudit>> {
        let data = self.read()?;
        // 追加顺序即时间顺序，倒序遍历得到最新优先
        let mut audits: Vec<&ActionAudit> =
            data.audits.iter().rev().filter(|a| filters.matches(a)).collect();
        audits.sort_by(|a, b| b.performed_at.cmp(&a.performed_at));

        Ok(audits
            .into_iter()
            .skip(usize::try_from(offset.max(0)).unwrap_or(usize::MAX))
            .take(usize::try_from(limit.max(0)).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn count(&self, filters: &AuditFilters) -> Result<i64> {
        let data = self.read()?;
        Ok(data.audits.iter().filter(|a| filters.matches(a)).count() as i64)
    }
}
