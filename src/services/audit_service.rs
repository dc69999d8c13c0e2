//! 动作审计服务

use std::sync::Arc;

use crate::{error::Result, models::audit::*, repository::AuditLog};

/// 单次查询的最大条数
pub const MAX_PAGE_SIZE: i64 = 500;

pub struct AuditService {
    log: Arc<dyn AuditLog>,
}

impl AuditService {
    pub fn new(log: Arc<dyn AuditLog>) -> Self {
        Self { log }
    }

    /// 追加一条审计记录
    pub async fn record(&self, audit: &ActionAudit) -> Result<()> {
        self.log.append(audit).await?;

        tracing::debug!(
            audit_id = %audit.id,
            action = %audit.action_type,
            actor = %audit.actor,
            stubbed = audit.stubbed,
            "Audit recorded"
        );
        Ok(())
    }

    /// 查询审计记录（最新优先）
    pub async fn query(
        &self,
        filters: &AuditFilters,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ActionAudit>> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let offset = offset.max(0);
        self.log.query(filters, limit, offset).await
    }

    /// 查询审计记录数量
    pub async fn count(&self, filters: &AuditFilters) -> Result<i64> {
        self.log.count(filters).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryStore;
    use uuid::Uuid;

    fn note(tenant: Uuid, group: Uuid) -> ActionAudit {
        ActionAudit::new(
            tenant,
            group,
            "ops",
            ActionType::DeleteCopies,
            AuditPayload::Remediation(RemediationPayload::default()),
            true,
        )
    }

    #[tokio::test]
    async fn test_record_then_query_newest_first() {
        let service = AuditService::new(Arc::new(InMemoryStore::new()));
        let tenant = Uuid::new_v4();
        let group = Uuid::new_v4();

        let first = note(tenant, group);
        let mut second = note(tenant, group);
        second.performed_at = first.performed_at + chrono::Duration::seconds(5);

        service.record(&first).await.unwrap();
        service.record(&second).await.unwrap();

        let filters = AuditFilters::for_group(tenant, group);
        let audits = service.query(&filters, 10, 0).await.unwrap();
        assert_eq!(audits.len(), 2);
        assert_eq!(audits[0].id, second.id);
        assert_eq!(service.count(&filters).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_query_clamps_page_size() {
        let service = AuditService::new(Arc::new(InMemoryStore::new()));
        let tenant = Uuid::new_v4();
        let group = Uuid::new_v4();
        service.record(&note(tenant, group)).await.unwrap();

        // limit 0 被提升为 1
        let audits = service
            .query(&AuditFilters::default(), 0, -3)
            .await
            .unwrap();
        assert_eq!(audits.len(), 1);
    }
}
