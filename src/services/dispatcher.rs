//! 重复组动作分发
//!
//! 校验与加载在调用方任务上执行，受 `operation_timeout` 约束；
//! 提交阶段在独立任务中完成，调用方取消不会打断。存储变更与审计记录由存储层在同一次写入中
//! 落地，要么都生效，要么都不生效。

use std::{future::Future, sync::Arc};
use uuid::Uuid;

use crate::{
    config::DispatcherConfig,
    error::{AppError, Result},
    models::*,
    repository::{DuplicateGroupStore, ScanStore, TenantStore},
    services::AuditService,
    tenancy::{Scope, ScopedRepository},
};

/// 提交阶段要执行的存储变更
#[derive(Debug, Clone, Copy)]
enum Mutation {
    None,
    UpdateKeeper(Option<Uuid>),
    QuarantineFiles,
}

pub struct ActionDispatcher {
    groups: Arc<dyn DuplicateGroupStore>,
    scans: Arc<dyn ScanStore>,
    tenants: Arc<dyn TenantStore>,
    audit: Arc<AuditService>,
    config: DispatcherConfig,
}

impl ActionDispatcher {
    pub fn new(
        groups: Arc<dyn DuplicateGroupStore>,
        scans: Arc<dyn ScanStore>,
        tenants: Arc<dyn TenantStore>,
        audit: Arc<AuditService>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            groups,
            scans,
            tenants,
            audit,
            config,
        }
    }

    /// 为重复组指派保管机
    ///
    /// 保管机必须属于重复组所在租户；nil UUID 表示清除保管机。每次成功调用都会写入一条审计记录。
    pub async fn assign_keeper(
        &self,
        scope: &Scope,
        group_id: &str,
        machine_id: &str,
    ) -> Result<ActionAudit> {
        let result = self.assign_keeper_inner(scope, group_id, machine_id).await;
        record_outcome(ActionType::AssignKeeper, scope, &result);
        result
    }

    async fn assign_keeper_inner(
        &self,
        scope: &Scope,
        group_id: &str,
        machine_id: &str,
    ) -> Result<ActionAudit> {
        let machine_id = machine_id.trim();
        if machine_id.is_empty() {
            return Err(AppError::KeeperMachineRequired);
        }
        let group_id = Uuid::parse_str(group_id.trim()).map_err(AppError::InvalidGroupId)?;
        let machine_id = Uuid::parse_str(machine_id).map_err(AppError::InvalidMachineId)?;

        let (group, keeper) = self
            .bounded("load duplicate group", async {
                let group = self.load(scope, group_id).await?;
                let keeper = self.resolve_keeper(&group, machine_id).await?;
                Ok((group, keeper))
            })
            .await?;

        let audit = ActionAudit::new(
            group.tenant_id,
            group.id,
            &self.config.default_actor,
            ActionType::AssignKeeper,
            AuditPayload::Keeper(KeeperPayload {
                keeper_machine_id: machine_id,
            }),
            false,
        );

        self.commit(group.id, Mutation::UpdateKeeper(keeper), audit)
            .await
    }

    /// 对重复组执行处置动作
    ///
    /// 仅 quarantine 会修改本地存储；三种动作都记录为 stubbed 审计。
    pub async fn perform_action(
        &self,
        scope: &Scope,
        group_id: &str,
        actor: &str,
        action: DuplicateAction,
        payload: RemediationPayload,
    ) -> Result<ActionAudit> {
        let result = self
            .perform_action_inner(scope, group_id, actor, action, payload)
            .await;
        record_outcome(action.action_type(), scope, &result);
        result
    }

    async fn perform_action_inner(
        &self,
        scope: &Scope,
        group_id: &str,
        actor: &str,
        action: DuplicateAction,
        payload: RemediationPayload,
    ) -> Result<ActionAudit> {
        let group_id = Uuid::parse_str(group_id.trim()).map_err(AppError::InvalidGroupId)?;

        let group = self
            .bounded("load duplicate group", self.load(scope, group_id))
            .await?;

        let mutation = if action.mutates_store() {
            Mutation::QuarantineFiles
        } else {
            Mutation::None
        };

        let audit = ActionAudit::new(
            group.tenant_id,
            group.id,
            actor,
            action.action_type(),
            AuditPayload::Remediation(payload),
            true,
        );

        self.commit(group.id, mutation, audit).await
    }

    async fn load(&self, scope: &Scope, group_id: Uuid) -> Result<DuplicateGroup> {
        ScopedRepository::new(scope.clone(), self.scans.clone(), self.groups.clone())
            .get_duplicate_group_by_id(group_id)
            .await
    }

    /// 不存在与属于其他租户的机器同样返回 MachineNotFound
    async fn resolve_keeper(
        &self,
        group: &DuplicateGroup,
        machine_id: Uuid,
    ) -> Result<Option<Uuid>> {
        if machine_id.is_nil() {
            return Ok(None);
        }

        let machine = self
            .tenants
            .machine(machine_id)
            .await?
            .filter(|m| m.tenant_id == group.tenant_id)
            .ok_or_else(|| {
                tracing::warn!(
                    tenant = %group.tenant_slug,
                    group_id = %group.id,
                    machine_id = %machine_id,
                    "Keeper machine outside group tenant rejected"
                );
                AppError::MachineNotFound
            })?;

        Ok(Some(machine.id))
    }

    async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.config.operation_timeout(), fut)
            .await
            .map_err(|_| AppError::timeout(operation))?
    }

    async fn commit(
        &self,
        group_id: Uuid,
        mutation: Mutation,
        audit: ActionAudit,
    ) -> Result<ActionAudit> {
        let groups = self.groups.clone();
        let audit_service = self.audit.clone();

        let task = tokio::spawn(async move {
            match mutation {
                Mutation::None => audit_service.record(&audit).await?,
                Mutation::UpdateKeeper(keeper) => {
                    groups.update_keeper(group_id, keeper, &audit).await?
                }
                Mutation::QuarantineFiles => {
                    let touched = groups.quarantine_files(group_id, &audit).await?;
                    tracing::debug!(group_id = %group_id, files = touched, "Files quarantined");
                }
            }

            Ok::<_, AppError>(audit)
        });

        task.await
            .map_err(|e| AppError::Internal(format!("commit task failed: {e}")))?
    }
}

fn record_outcome(action: ActionType, scope: &Scope, result: &Result<ActionAudit>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(e) if e.is_client_error() => "rejected",
        Err(_) => "failure",
    };
    metrics::counter!(
        "duplynx_actions_total",
        "action" => action.as_str(),
        "outcome" => outcome
    )
    .increment(1);

    match result {
        Ok(audit) => tracing::info!(
            action = action.as_str(),
            tenant = %scope.tenant_slug,
            group_id = ?audit.duplicate_group_id,
            audit_id = %audit.id,
            stubbed = audit.stubbed,
            "Duplicate group action dispatched"
        ),
        Err(e) => tracing::info!(
            action = action.as_str(),
            tenant = %scope.tenant_slug,
            outcome,
            error = %e,
            "Duplicate group action not applied"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{repository::InMemoryStore, seed};

    fn dispatcher_with(store: &Arc<InMemoryStore>, config: DispatcherConfig) -> ActionDispatcher {
        ActionDispatcher::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(AuditService::new(store.clone())),
            config,
        )
    }

    fn dispatcher(store: &Arc<InMemoryStore>) -> ActionDispatcher {
        dispatcher_with(store, DispatcherConfig::default())
    }

    fn store() -> Arc<InMemoryStore> {
        Arc::new(InMemoryStore::from_dataset(seed::canonical_dataset()))
    }

    #[tokio::test]
    async fn test_validation_precedes_store_access() {
        let store = store();
        store.fail_writes(true);
        let dispatcher = dispatcher(&store);
        let scope = Scope::new("orion-analytics");

        let err = dispatcher
            .assign_keeper(&scope, "not-a-uuid", "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::KeeperMachineRequired));

        let err = dispatcher
            .assign_keeper(&scope, "not-a-uuid", &Uuid::new_v4().to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidGroupId(_)));

        let err = dispatcher
            .assign_keeper(&scope, &seed::GROUP_FINANCE.to_string(), "machine-x")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidMachineId(_)));

        assert_eq!(store.audit_len(), 2);
    }

    #[tokio::test]
    async fn test_keeper_audit_uses_default_actor() {
        let store = store();
        let dispatcher = dispatcher_with(
            &store,
            DispatcherConfig {
                operation_timeout_secs: 5,
                default_actor: "keeper-bot".to_string(),
            },
        );

        let audit = dispatcher
            .assign_keeper(
                &Scope::new("orion-analytics"),
                &seed::GROUP_MEDIA.to_string(),
                &seed::MACHINE_ORION_CORE.to_string(),
            )
            .await
            .unwrap();

        assert_eq!(audit.actor, "keeper-bot");
        assert!(!audit.stubbed);
        assert_eq!(audit.tenant_id, Some(seed::TENANT_ORION));
    }

    #[tokio::test]
    async fn test_keeper_from_other_tenant_rejected_before_write() {
        let store = store();
        let dispatcher = dispatcher(&store);

        let err = dispatcher
            .assign_keeper(
                &Scope::new("orion-analytics"),
                &seed::GROUP_FINANCE.to_string(),
                &seed::MACHINE_SELENE_LAB.to_string(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::MachineNotFound));
        assert_eq!(store.audit_len(), 2);
    }
}
