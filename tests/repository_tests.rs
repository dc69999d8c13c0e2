//! PostgreSQL 仓库层测试
//! 运行前设置 TEST_DATABASE_URL，使用 `cargo test -- --ignored` 执行

use duplynx::{
    error::AppError,
    models::*,
    repository::*,
    seed::{self, *},
    services::{ActionDispatcher, AuditService},
    tenancy::Scope,
};
use serial_test::serial;
use std::sync::Arc;
use uuid::Uuid;

mod common;
use common::{create_test_config, setup_test_db};

#[tokio::test]
#[serial]
#[ignore] // 需要数据库
async fn test_seed_is_idempotent() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let report = seed::seed_postgres(&pool, &seed::canonical_dataset())
        .await
        .unwrap();

    assert_eq!(report, SeedReport::default());
}

#[tokio::test]
#[serial]
#[ignore] // 需要数据库
async fn test_tenant_repository_lists_with_machine_counts() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let repo = TenantRepository::new(pool);

    let tenants = repo.list_tenants().await.unwrap();
    assert_eq!(tenants.len(), 2);
    assert_eq!(tenants[0].tenant.slug, "orion-analytics");
    assert_eq!(tenants[0].machine_count, 3);
    assert_eq!(tenants[1].machine_count, 2);

    let orion = repo.tenant_by_slug("orion-analytics").await.unwrap().unwrap();
    assert_eq!(orion.id, TENANT_ORION);
    assert!(repo.tenant_by_slug("ghost").await.unwrap().is_none());

    let machines = repo.machines_for_tenant(TENANT_SELENE).await.unwrap();
    assert_eq!(machines.len(), 2);
    assert!(machines.iter().all(|m| m.tenant_id == TENANT_SELENE));
}

#[tokio::test]
#[serial]
#[ignore] // 需要数据库
async fn test_scan_repository_orders_by_start_and_counts_statuses() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let repo = ScanRepository::new(pool);

    let scans = repo.list_by_tenant("orion-analytics").await.unwrap();
    assert_eq!(scans.len(), 2);
    assert!(scans[0].scan.started_at <= scans[1].scan.started_at);

    let baseline = ScanStore::get(&repo, SCAN_BASELINE).await.unwrap();
    assert_eq!(baseline.tenant_slug, "orion-analytics");
    assert_eq!(baseline.status_counts.get("review"), Some(&1));
    assert_eq!(baseline.status_counts.get("action_needed"), Some(&1));

    let err = ScanStore::get(&repo, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::ScanNotFound));
}

#[tokio::test]
#[serial]
#[ignore] // 需要数据库
async fn test_group_repository_sorted_with_files() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let repo = GroupRepository::new(pool);

    let groups = repo.list_by_scan(SCAN_BASELINE).await.unwrap();
    let ids: Vec<Uuid> = groups.iter().map(|g| g.id).collect();
    assert_eq!(ids, vec![GROUP_MEDIA, GROUP_FINANCE]);

    let finance = &groups[1];
    assert_eq!(finance.tenant_slug, "orion-analytics");
    assert_eq!(finance.files.len(), 3);
    assert!(finance.files.windows(2).all(|w| w[0].path <= w[1].path));
}

#[tokio::test]
#[serial]
#[ignore] // 需要数据库
async fn test_group_repository_keeper_and_quarantine() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let repo = GroupRepository::new(pool.clone());
    let audits = AuditRepository::new(pool);
    let filters = AuditFilters::for_group(TENANT_ORION, GROUP_FINANCE);
    let before = audits.count(&filters).await.unwrap();

    repo.update_keeper(
        GROUP_FINANCE,
        Some(MACHINE_ORION_LAPTOP),
        &keeper_audit(MACHINE_ORION_LAPTOP),
    )
    .await
    .unwrap();
    let group = DuplicateGroupStore::get(&repo, GROUP_FINANCE).await.unwrap();
    assert_eq!(group.keeper_machine_id, Some(MACHINE_ORION_LAPTOP));
    assert_eq!(group.status, GroupStatus::Review);

    repo.update_keeper(GROUP_FINANCE, None, &keeper_audit(Uuid::nil()))
        .await
        .unwrap();
    let group = DuplicateGroupStore::get(&repo, GROUP_FINANCE).await.unwrap();
    assert_eq!(group.keeper_machine_id, None);

    let touched = repo
        .quarantine_files(GROUP_FINANCE, &quarantine_audit())
        .await
        .unwrap();
    assert_eq!(touched, 3);
    let group = DuplicateGroupStore::get(&repo, GROUP_FINANCE).await.unwrap();
    assert_eq!(group.quarantined_count(), 3);
    assert_eq!(audits.count(&filters).await.unwrap(), before + 3);

    let err = repo
        .update_keeper(
            Uuid::new_v4(),
            Some(MACHINE_ORION_CORE),
            &keeper_audit(MACHINE_ORION_CORE),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::GroupNotFound));
    assert_eq!(audits.count(&filters).await.unwrap(), before + 3);
}

#[tokio::test]
#[serial]
#[ignore] // 需要数据库
async fn test_group_mutation_rolls_back_when_audit_insert_fails() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let repo = GroupRepository::new(pool.clone());
    let audits = AuditRepository::new(pool);
    let filters = AuditFilters::for_group(TENANT_ORION, GROUP_FINANCE);
    let before = audits.count(&filters).await.unwrap();

    // 复用已存在的审计 id，插入时主键冲突
    let mut audit = keeper_audit(MACHINE_ORION_LAPTOP);
    audit.id = AUDIT_ASSIGN_KEEPER;
    let err = repo
        .update_keeper(GROUP_FINANCE, Some(MACHINE_ORION_LAPTOP), &audit)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Storage { .. }));

    let mut audit = quarantine_audit();
    audit.id = AUDIT_ASSIGN_KEEPER;
    assert!(repo.quarantine_files(GROUP_FINANCE, &audit).await.is_err());

    let group = DuplicateGroupStore::get(&repo, GROUP_FINANCE).await.unwrap();
    assert_eq!(group.keeper_machine_id, Some(MACHINE_ORION_CORE));
    assert_eq!(group.quarantined_count(), 0);
    assert_eq!(audits.count(&filters).await.unwrap(), before);
}

fn keeper_audit(machine_id: Uuid) -> ActionAudit {
    ActionAudit::new(
        TENANT_ORION,
        GROUP_FINANCE,
        "system",
        ActionType::AssignKeeper,
        AuditPayload::Keeper(KeeperPayload {
            keeper_machine_id: machine_id,
        }),
        false,
    )
}

fn quarantine_audit() -> ActionAudit {
    ActionAudit::new(
        TENANT_ORION,
        GROUP_FINANCE,
        "system",
        ActionType::Quarantine,
        AuditPayload::Remediation(RemediationPayload {
            target_file_ids: Vec::new(),
            notes: String::new(),
        }),
        true,
    )
}

#[tokio::test]
#[serial]
#[ignore] // 需要数据库
async fn test_audit_repository_append_query_and_filters() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let repo = AuditRepository::new(pool);
    let filters = AuditFilters::for_group(TENANT_ORION, GROUP_FINANCE);
    let before = repo.count(&filters).await.unwrap();

    let audit = ActionAudit::new(
        TENANT_ORION,
        GROUP_FINANCE,
        "alice",
        ActionType::DeleteCopies,
        AuditPayload::Remediation(RemediationPayload {
            target_file_ids: vec!["f-1".to_string()],
            notes: "cleanup".to_string(),
        }),
        true,
    );
    repo.append(&audit).await.unwrap();

    assert_eq!(repo.count(&filters).await.unwrap(), before + 1);

    let rows = repo.query(&filters, 10, 0).await.unwrap();
    assert_eq!(rows[0].id, audit.id);
    assert_eq!(rows[0].payload, audit.payload);
    assert!(rows[0].stubbed);

    let by_actor = AuditFilters {
        actor: Some("alice".to_string()),
        ..filters.clone()
    };
    assert_eq!(repo.count(&by_actor).await.unwrap(), 1);

    let page = repo.query(&filters, 1, 1).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_ne!(page[0].id, audit.id);
}

#[tokio::test]
#[serial]
#[ignore] // 需要数据库
async fn test_audit_rows_are_append_only() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let result = sqlx::query("UPDATE action_audits SET actor = 'mallory' WHERE id = $1")
        .bind(AUDIT_ASSIGN_KEEPER)
        .execute(&pool)
        .await;
    assert!(result.is_err());

    let result = sqlx::query("DELETE FROM action_audits WHERE id = $1")
        .bind(AUDIT_QUARANTINE)
        .execute(&pool)
        .await;
    assert!(result.is_err());
}

#[tokio::test]
#[serial]
#[ignore] // 需要数据库
async fn test_dispatcher_against_postgres() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let repos = Repositories::postgres(pool);
    let dispatcher = ActionDispatcher::new(
        repos.groups.clone(),
        repos.scans.clone(),
        repos.tenants.clone(),
        Arc::new(AuditService::new(repos.audit.clone())),
        config.dispatcher.clone(),
    );
    let scope = Scope::new("orion-analytics");
    let filters = AuditFilters::for_group(TENANT_ORION, GROUP_MEDIA);
    let before = repos.audit.count(&filters).await.unwrap();

    dispatcher
        .assign_keeper(
            &scope,
            &GROUP_MEDIA.to_string(),
            &MACHINE_ORION_LAPTOP.to_string(),
        )
        .await
        .unwrap();

    let group = repos.groups.get(GROUP_MEDIA).await.unwrap();
    assert_eq!(group.keeper_machine_id, Some(MACHINE_ORION_LAPTOP));
    assert_eq!(repos.audit.count(&filters).await.unwrap(), before + 1);

    let err = dispatcher
        .assign_keeper(
            &Scope::new("selene-research"),
            &GROUP_MEDIA.to_string(),
            &MACHINE_SELENE_CORE.to_string(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::GroupNotFound));
    assert_eq!(repos.audit.count(&filters).await.unwrap(), before + 1);
}

#[tokio::test]
#[serial]
#[ignore] // 需要数据库
async fn test_dispatcher_rejects_keeper_from_other_tenant() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let repos = Repositories::postgres(pool);
    let dispatcher = ActionDispatcher::new(
        repos.groups.clone(),
        repos.scans.clone(),
        repos.tenants.clone(),
        Arc::new(AuditService::new(repos.audit.clone())),
        config.dispatcher.clone(),
    );
    let filters = AuditFilters::for_group(TENANT_ORION, GROUP_FINANCE);
    let before = repos.audit.count(&filters).await.unwrap();

    let err = dispatcher
        .assign_keeper(
            &Scope::new("orion-analytics"),
            &GROUP_FINANCE.to_string(),
            &MACHINE_SELENE_LAB.to_string(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::MachineNotFound));
    let group = repos.groups.get(GROUP_FINANCE).await.unwrap();
    assert_eq!(group.keeper_machine_id, Some(MACHINE_ORION_CORE));
    assert_eq!(repos.audit.count(&filters).await.unwrap(), before);
}
