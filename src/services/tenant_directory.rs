//! 租户目录服务
//!
//! 提供租户与机器的只读查询，并记录租户/机器选择事件。

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::tenant::*,
    repository::TenantStore,
};

/// 内存中保留的选择事件上限，超出后丢弃最早的事件
pub const SELECTION_LOG_CAPACITY: usize = 256;

pub struct TenantDirectory {
    store: Arc<dyn TenantStore>,
    selections: Mutex<VecDeque<SelectionEvent>>,
}

impl TenantDirectory {
    pub fn new(store: Arc<dyn TenantStore>) -> Self {
        Self {
            store,
            selections: Mutex::new(VecDeque::with_capacity(SELECTION_LOG_CAPACITY)),
        }
    }

    /// 所有租户，按名称排序
    pub async fn list_tenants(&self) -> Result<Vec<TenantSummary>> {
        self.store.list_tenants().await
    }

    pub async fn tenant(&self, slug: &str) -> Result<Option<Tenant>> {
        self.store.tenant_by_slug(slug).await
    }

    /// 租户下的机器，按名称排序
    pub async fn list_machines(&self, tenant_slug: &str) -> Result<Vec<Machine>> {
        let tenant = self
            .store
            .tenant_by_slug(tenant_slug)
            .await?
            .ok_or(AppError::TenantNotFound)?;

        let machines = self.store.machines_for_tenant(tenant.id).await?;

        self.emit(SelectionEvent::TenantSelection {
            tenant_slug: tenant.slug,
        });
        Ok(machines)
    }

    /// 查找属于该租户的机器；格式错误与跨租户的 id 同样返回 MachineNotFound
    pub async fn find_machine(&self, tenant_slug: &str, machine_id: &str) -> Result<Machine> {
        let Ok(machine_id) = Uuid::parse_str(machine_id.trim()) else {
            return Err(AppError::MachineNotFound);
        };

        let tenant = self
            .store
            .tenant_by_slug(tenant_slug)
            .await?
            .ok_or(AppError::MachineNotFound)?;

        let machine = self
            .store
            .machine(machine_id)
            .await?
            .filter(|m| m.tenant_id == tenant.id)
            .ok_or(AppError::MachineNotFound)?;

        self.emit(SelectionEvent::MachineSelection {
            tenant_slug: tenant.slug,
            machine_id: machine.id,
            machine_name: machine.name.clone(),
        });
        Ok(machine)
    }

    /// 最近的选择事件快照，按发生顺序
    pub fn selections(&self) -> Vec<SelectionEvent> {
        self.selections
            .lock()
            .map(|events| events.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn emit(&self, event: SelectionEvent) {
        tracing::info!(event = ?event, "Selection recorded");
        // 遥测尽力而为，锁中毒时丢弃
        if let Ok(mut events) = self.selections.lock() {
            if events.len() == SELECTION_LOG_CAPACITY {
                events.pop_front();
            }
            events.push_back(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{repository::InMemoryStore, seed};

    fn directory() -> TenantDirectory {
        TenantDirectory::new(Arc::new(InMemoryStore::from_dataset(
            seed::canonical_dataset(),
        )))
    }

    #[tokio::test]
    async fn test_list_tenants_sorted_with_machine_counts() {
        let tenants = directory().list_tenants().await.unwrap();
        let slugs: Vec<&str> = tenants.iter().map(|t| t.tenant.slug.as_str()).collect();
        assert_eq!(slugs, vec!["orion-analytics", "selene-research"]);
        assert_eq!(tenants[0].machine_count, 3);
        assert_eq!(tenants[1].machine_count, 2);
    }

    #[tokio::test]
    async fn test_list_machines_sorted_and_logged() {
        let directory = directory();
        let machines = directory.list_machines("orion-analytics").await.unwrap();
        let names: Vec<&str> = machines.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Orion Archive 01", "Orion Core 01", "Orion Laptop 01"]);

        assert_eq!(
            directory.selections(),
            vec![SelectionEvent::TenantSelection {
                tenant_slug: "orion-analytics".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_unknown_tenant_emits_nothing() {
        let directory = directory();
        let err = directory.list_machines("ghost").await.unwrap_err();
        assert!(matches!(err, AppError::TenantNotFound));
        assert!(directory.selections().is_empty());
    }

    #[tokio::test]
    async fn test_find_machine_rejects_foreign_and_malformed_ids() {
        let directory = directory();

        let machine = directory
            .find_machine("orion-analytics", &seed::MACHINE_ORION_CORE.to_string())
            .await
            .unwrap();
        assert_eq!(machine.name, "Orion Core 01");

        let foreign = directory
            .find_machine("orion-analytics", &seed::MACHINE_SELENE_LAB.to_string())
            .await
            .unwrap_err();
        assert!(matches!(foreign, AppError::MachineNotFound));

        let malformed = directory
            .find_machine("orion-analytics", "not-a-machine")
            .await
            .unwrap_err();
        assert!(matches!(malformed, AppError::MachineNotFound));

        assert_eq!(directory.selections().len(), 1);
    }

    #[tokio::test]
    async fn test_selection_log_keeps_most_recent_events() {
        let directory = directory();
        let overflow = 10;

        for _ in 0..SELECTION_LOG_CAPACITY + overflow {
            directory.list_machines("orion-analytics").await.unwrap();
        }
        directory.list_machines("selene-research").await.unwrap();

        let events = directory.selections();
        assert_eq!(events.len(), SELECTION_LOG_CAPACITY);
        assert_eq!(
            events.last(),
            Some(&SelectionEvent::TenantSelection {
                tenant_slug: "selene-research".to_string()
            })
        );
    }
}
