//! 演示数据集
//!
//! 两个租户、五台机器、三次扫描、四个重复组、九个文件实例和两条历史审计。
//! 标识符固定，便于在文档与测试中直接引用。

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::*,
};

pub const TENANT_ORION: Uuid = Uuid::from_u128(0x5f2f6f52_1ac0_4a41_84b9_592effdb8b27);
pub const TENANT_SELENE: Uuid = Uuid::from_u128(0x90d1b366_b2bb_4ed9_92ec_6c6ede98c24f);

pub const MACHINE_ORION_CORE: Uuid = Uuid::from_u128(0x2b9a0101_7a92_4e81_b9a1_6c3a0d905f4a);
pub const MACHINE_ORION_LAPTOP: Uuid = Uuid::from_u128(0xa77ce4d0_1f02_44b5_bf23_8aea5c50d0c2);
pub const MACHINE_ORION_ARCHIVE: Uuid = Uuid::from_u128(0x4cf02d63_574f_4f1b_b44c_6850b80b9a19);
pub const MACHINE_SELENE_CORE: Uuid = Uuid::from_u128(0x1882ebba_9cb4_4f0d_9f52_17c8f7e54073);
pub const MACHINE_SELENE_LAB: Uuid = Uuid::from_u128(0x2c6e9724_1b3d_47f8_8c5c_5e94eaaae5b0);

pub const SCAN_BASELINE: Uuid = Uuid::from_u128(0x341971ac_a504_4cd0_af68_8b21f3796470);
pub const SCAN_MEDIA_AUDIT: Uuid = Uuid::from_u128(0x8e27c476_cccf_4b0a_979f_0a2a6c44f5de);
pub const SCAN_DISCOVERY: Uuid = Uuid::from_u128(0x1ec9b872_e31c_4644_829a_1602043614d0);

pub const GROUP_FINANCE: Uuid = Uuid::from_u128(0xc02a3a1b_50f1_4418_89fe_5983dce56250);
pub const GROUP_MEDIA: Uuid = Uuid::from_u128(0xe3b8fe2f_a6da_407d_96fd_1aea6a0c97c4);
pub const GROUP_DESIGN: Uuid = Uuid::from_u128(0x0bde87e4_0170_4de4_b63c_6281a65c1dc9);
pub const GROUP_TELEMETRY: Uuid = Uuid::from_u128(0x4c9581d5_6ed4_4820_9e6e_7a6a5f239f78);

pub const AUDIT_ASSIGN_KEEPER: Uuid = Uuid::from_u128(0x11ea57df_9a16_46f6_834e_0785d08c0f3b);
pub const AUDIT_QUARANTINE: Uuid = Uuid::from_u128(0x320c6e29_c9df_4f3e_a2a9_5688b1ec6764);

/// 完整数据集；重复组内嵌文件实例
#[derive(Debug, Clone)]
pub struct Dataset {
    pub tenants: Vec<Tenant>,
    pub machines: Vec<Machine>,
    pub scans: Vec<Scan>,
    pub groups: Vec<DuplicateGroup>,
    pub audits: Vec<ActionAudit>,
}

impl Dataset {
    pub fn file_count(&self) -> usize {
        self.groups.iter().map(|g| g.files.len()).sum()
    }
}

/// 写入数据库后的各表新增行数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub tenants: u64,
    pub machines: u64,
    pub scans: u64,
    pub duplicate_groups: u64,
    pub file_instances: u64,
    pub action_audits: u64,
}

fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .map(|naive| naive.and_utc())
        .unwrap_or_default()
}

fn tenant(id: Uuid, slug: &str, name: &str, description: &str, contact: &str) -> Tenant {
    Tenant {
        id,
        slug: slug.to_string(),
        name: name.to_string(),
        description: Some(description.to_string()),
        primary_contact: Some(contact.to_string()),
    }
}

fn machine(
    id: Uuid,
    tenant_id: Uuid,
    name: &str,
    category: MachineCategory,
    hostname: &str,
    role: &str,
    last_scan_at: DateTime<Utc>,
) -> Machine {
    Machine {
        id,
        tenant_id,
        name: name.to_string(),
        category,
        hostname: Some(hostname.to_string()),
        role: Some(role.to_string()),
        last_scan_at: Some(last_scan_at),
    }
}

#[allow(clippy::too_many_arguments)]
fn scan(
    id: Uuid,
    tenant_id: Uuid,
    initiated_by: Uuid,
    name: &str,
    description: &str,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    duplicate_group_count: i32,
) -> Scan {
    Scan {
        id,
        tenant_id,
        initiated_machine_id: Some(initiated_by),
        name: name.to_string(),
        description: Some(description.to_string()),
        started_at,
        completed_at: Some(completed_at),
        duplicate_group_count,
    }
}

#[allow(clippy::too_many_arguments)]
fn file(
    id: u128,
    group_id: Uuid,
    machine_id: Uuid,
    path: &str,
    size_bytes: i64,
    checksum: &str,
    last_seen_at: DateTime<Utc>,
    quarantined: bool,
) -> FileInstance {
    FileInstance {
        id: Uuid::from_u128(id),
        duplicate_group_id: group_id,
        machine_id,
        path: path.to_string(),
        size_bytes,
        checksum: checksum.to_string(),
        last_seen_at,
        quarantined,
    }
}

#[allow(clippy::too_many_arguments)]
fn group(
    id: Uuid,
    tenant_id: Uuid,
    tenant_slug: &str,
    scan_id: Uuid,
    keeper: Uuid,
    status: GroupStatus,
    hash: &str,
    total_size_bytes: i64,
    mut files: Vec<FileInstance>,
) -> DuplicateGroup {
    files.sort_by(|a, b| a.path.cmp(&b.path));
    DuplicateGroup {
        id,
        tenant_id,
        tenant_slug: tenant_slug.to_string(),
        scan_id,
        keeper_machine_id: Some(keeper),
        hash: hash.to_string(),
        status,
        file_count: files.len() as i32,
        total_size_bytes,
        files,
    }
}

/// 规范演示数据集
pub fn canonical_dataset() -> Dataset {
    const ORION: &str = "orion-analytics";
    const SELENE: &str = "selene-research";
    const FINANCE_SUM: &str = "sha256:9adcc6e5a3b9f83bbd1c52c4182f92a5";
    const MEDIA_SUM: &str = "sha256:be93b99045db02b9301a51597d90f4fb";
    const DESIGN_SUM: &str = "sha256:e845d474d887cf43d62f56d8f762b73f";
    const TELEMETRY_SUM: &str = "sha256:49ba5eb796f5a6d0750f0dcd384e0b8e";

    let tenants = vec![
        tenant(
            TENANT_ORION,
            ORION,
            "Orion Analytics",
            "Northwind subsidiary focused on data deduplication rollouts",
            "demo@orion.test",
        ),
        tenant(
            TENANT_SELENE,
            SELENE,
            "Selene Research",
            "Applied sciences lab maintaining mixed media archives",
            "ops@selene.test",
        ),
    ];

    let machines = vec![
        machine(
            MACHINE_ORION_CORE,
            TENANT_ORION,
            "Orion Core 01",
            MachineCategory::Server,
            "orion-core-01.orion.test",
            "ingest",
            at(2025, 10, 28, 9, 30, 0),
        ),
        machine(
            MACHINE_ORION_LAPTOP,
            TENANT_ORION,
            "Orion Laptop 01",
            MachineCategory::PersonalLaptop,
            "laptop-01.orion.test",
            "analysis",
            at(2025, 10, 27, 17, 5, 0),
        ),
        machine(
            MACHINE_ORION_ARCHIVE,
            TENANT_ORION,
            "Orion Archive 01",
            MachineCategory::Server,
            "archive-01.orion.test",
            "archive",
            at(2025, 10, 28, 7, 55, 0),
        ),
        machine(
            MACHINE_SELENE_CORE,
            TENANT_SELENE,
            "Selene Core 01",
            MachineCategory::Server,
            "core-01.selene.test",
            "render",
            at(2025, 10, 27, 10, 40, 0),
        ),
        machine(
            MACHINE_SELENE_LAB,
            TENANT_SELENE,
            "Selene Lab 01",
            MachineCategory::PersonalLaptop,
            "lab-01.selene.test",
            "fieldwork",
            at(2025, 10, 26, 20, 5, 0),
        ),
    ];

    let scans = vec![
        scan(
            SCAN_BASELINE,
            TENANT_ORION,
            MACHINE_ORION_CORE,
            "Baseline Sweep October",
            "Weekly deduplication sweep across finance shares",
            at(2025, 10, 28, 8, 0, 0),
            at(2025, 10, 28, 8, 22, 0),
            2,
        ),
        scan(
            SCAN_MEDIA_AUDIT,
            TENANT_ORION,
            MACHINE_ORION_ARCHIVE,
            "Media Archive Audit",
            "Quarterly media sync validation",
            at(2025, 10, 26, 22, 5, 0),
            at(2025, 10, 26, 22, 47, 0),
            1,
        ),
        scan(
            SCAN_DISCOVERY,
            TENANT_SELENE,
            MACHINE_SELENE_CORE,
            "Telemetry Discovery",
            "Nightly telemetry shape check for field devices",
            at(2025, 10, 27, 10, 15, 0),
            at(2025, 10, 27, 10, 38, 0),
            1,
        ),
    ];

    let groups = vec![
        group(
            GROUP_FINANCE,
            TENANT_ORION,
            ORION,
            SCAN_BASELINE,
            MACHINE_ORION_CORE,
            GroupStatus::Review,
            "hash:finance-q4-plan",
            3_145_728,
            vec![
                file(
                    0x7bc9e001_d2de_4ed4_9424_9489d38c8334,
                    GROUP_FINANCE,
                    MACHINE_ORION_LAPTOP,
                    "/Users/finance/roadmap/Q4-plan.pptx",
                    1_048_576,
                    FINANCE_SUM,
                    at(2025, 10, 28, 8, 15, 0),
                    false,
                ),
                file(
                    0xb2bac5f8_a6b1_4f9d_bb3a_9cdd3d67b6dd,
                    GROUP_FINANCE,
                    MACHINE_ORION_CORE,
                    "/srv/shares/finance/Q4-plan.pptx",
                    1_048_576,
                    FINANCE_SUM,
                    at(2025, 10, 28, 8, 16, 0),
                    false,
                ),
                file(
                    0xa5cfa963_7439_4bb8_9eb2_78d0871c4692,
                    GROUP_FINANCE,
                    MACHINE_ORION_ARCHIVE,
                    "/srv/archive/finance/Q4-plan.pptx",
                    1_048_576,
                    FINANCE_SUM,
                    at(2025, 10, 28, 8, 16, 30),
                    false,
                ),
            ],
        ),
        group(
            GROUP_MEDIA,
            TENANT_ORION,
            ORION,
            SCAN_BASELINE,
            MACHINE_ORION_ARCHIVE,
            GroupStatus::ActionNeeded,
            "hash:media-latest-cut",
            8_388_608,
            vec![
                file(
                    0xd4da6d10_3fe5_4a73_9818_7ea85f992e4b,
                    GROUP_MEDIA,
                    MACHINE_ORION_ARCHIVE,
                    "/srv/media/cuts/fall-launch.mov",
                    4_194_304,
                    MEDIA_SUM,
                    at(2025, 10, 28, 7, 30, 0),
                    false,
                ),
                file(
                    0xe8330a58_3b39_4f1f_931b_4bcdcd8e0f09,
                    GROUP_MEDIA,
                    MACHINE_ORION_CORE,
                    "/srv/media/staging/fall-launch.mov",
                    4_194_304,
                    MEDIA_SUM,
                    at(2025, 10, 28, 7, 31, 0),
                    true,
                ),
            ],
        ),
        group(
            GROUP_DESIGN,
            TENANT_ORION,
            ORION,
            SCAN_MEDIA_AUDIT,
            MACHINE_ORION_LAPTOP,
            GroupStatus::Resolved,
            "hash:design-review-pack",
            2_621_440,
            vec![
                file(
                    0xccdb5a06_5b83_4cf0_803c_96e4034f068f,
                    GROUP_DESIGN,
                    MACHINE_ORION_LAPTOP,
                    "/Users/design/review/package.zip",
                    1_310_720,
                    DESIGN_SUM,
                    at(2025, 10, 26, 22, 20, 0),
                    true,
                ),
                file(
                    0xa8422d51_583a_4d3f_bb86_f5f7cc149048,
                    GROUP_DESIGN,
                    MACHINE_ORION_ARCHIVE,
                    "/srv/design/latest/package.zip",
                    1_310_720,
                    DESIGN_SUM,
                    at(2025, 10, 26, 22, 25, 0),
                    false,
                ),
            ],
        ),
        group(
            GROUP_TELEMETRY,
            TENANT_SELENE,
            SELENE,
            SCAN_DISCOVERY,
            MACHINE_SELENE_CORE,
            GroupStatus::Review,
            "hash:telemetry-drift",
            1_572_864,
            vec![
                file(
                    0x0f9a2c09_2fd9_4a8f_9c5a_0f7f43c6b3d4,
                    GROUP_TELEMETRY,
                    MACHINE_SELENE_CORE,
                    "/srv/telemetry/batch-219.json",
                    786_432,
                    TELEMETRY_SUM,
                    at(2025, 10, 27, 10, 30, 0),
                    false,
                ),
                file(
                    0x037620d8_0ed6_4a8e_9214_0655e768f194,
                    GROUP_TELEMETRY,
                    MACHINE_SELENE_LAB,
                    "/Users/lab/cache/batch-219.json",
                    786_432,
                    TELEMETRY_SUM,
                    at(2025, 10, 27, 10, 32, 0),
                    false,
                ),
            ],
        ),
    ];

    let mut media_note = serde_json::Map::new();
    media_note.insert("reason".to_string(), json!("media sync window overlap"));

    let audits = vec![
        ActionAudit {
            id: AUDIT_ASSIGN_KEEPER,
            tenant_id: Some(TENANT_ORION),
            duplicate_group_id: Some(GROUP_FINANCE),
            actor: "demo".to_string(),
            action_type: ActionType::AssignKeeper,
            payload: Some(AuditPayload::Keeper(KeeperPayload {
                keeper_machine_id: MACHINE_ORION_CORE,
            })),
            performed_at: at(2025, 10, 28, 8, 30, 0),
            stubbed: false,
        },
        ActionAudit {
            id: AUDIT_QUARANTINE,
            tenant_id: Some(TENANT_ORION),
            duplicate_group_id: Some(GROUP_MEDIA),
            actor: "demo".to_string(),
            action_type: ActionType::Quarantine,
            payload: Some(AuditPayload::Freeform(media_note)),
            performed_at: at(2025, 10, 28, 7, 45, 0),
            stubbed: true,
        },
    ];

    Dataset {
        tenants,
        machines,
        scans,
        groups,
        audits,
    }
}

/// 在单个事务中写入数据集；已存在的行保持不变
pub async fn seed_postgres(pool: &PgPool, dataset: &Dataset) -> Result<SeedReport> {
    let mut tx = pool.begin().await?;
    let mut report = SeedReport::default();

    for tenant in &dataset.tenants {
        report.tenants += sqlx::query(
            r#"
            INSERT INTO tenants (id, slug, name, description, primary_contact)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(tenant.id)
        .bind(&tenant.slug)
        .bind(&tenant.name)
        .bind(&tenant.description)
        .bind(&tenant.primary_contact)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::storage("seed tenant", tenant.id, e))?
        .rows_affected();
    }

    for machine in &dataset.machines {
        report.machines += sqlx::query(
            r#"
            INSERT INTO machines (id, tenant_id, name, category, hostname, role, last_scan_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(machine.id)
        .bind(machine.tenant_id)
        .bind(&machine.name)
        .bind(machine.category.as_str())
        .bind(&machine.hostname)
        .bind(&machine.role)
        .bind(machine.last_scan_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::storage("seed machine", machine.id, e))?
        .rows_affected();
    }

    for scan in &dataset.scans {
        report.scans += sqlx::query(
            r#"
            INSERT INTO scans (
                id, tenant_id, initiated_machine_id, name, description,
                started_at, completed_at, duplicate_group_count
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(scan.id)
        .bind(scan.tenant_id)
        .bind(scan.initiated_machine_id)
        .bind(&scan.name)
        .bind(&scan.description)
        .bind(scan.started_at)
        .bind(scan.completed_at)
        .bind(scan.duplicate_group_count)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::storage("seed scan", scan.id, e))?
        .rows_affected();
    }

    for group in &dataset.groups {
        report.duplicate_groups += sqlx::query(
            r#"
            INSERT INTO duplicate_groups (
                id, tenant_id, scan_id, keeper_machine_id, hash, status,
                file_count, total_size_bytes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(group.id)
        .bind(group.tenant_id)
        .bind(group.scan_id)
        .bind(group.keeper_machine_id)
        .bind(&group.hash)
        .bind(group.status.as_str())
        .bind(group.file_count)
        .bind(group.total_size_bytes)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::storage("seed duplicate group", group.id, e))?
        .rows_affected();

        for file in &group.files {
            report.file_instances += sqlx::query(
                r#"
                INSERT INTO file_instances (
                    id, duplicate_group_id, machine_id, path, size_bytes,
                    checksum, last_seen_at, quarantined
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(file.id)
            .bind(file.duplicate_group_id)
            .bind(file.machine_id)
            .bind(&file.path)
            .bind(file.size_bytes)
            .bind(&file.checksum)
            .bind(file.last_seen_at)
            .bind(file.quarantined)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::storage("seed file instance", file.id, e))?
            .rows_affected();
        }
    }

    for audit in &dataset.audits {
        report.action_audits += sqlx::query(
            r#"
            INSERT INTO action_audits (
                id, tenant_id, duplicate_group_id, actor, action_type,
                payload, payload_version, performed_at, stubbed
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(audit.id)
        .bind(audit.tenant_id)
        .bind(audit.duplicate_group_id)
        .bind(&audit.actor)
        .bind(audit.action_type.as_str())
        .bind(audit.payload.as_ref().map(AuditPayload::to_json))
        .bind(PAYLOAD_VERSION)
        .bind(audit.performed_at)
        .bind(audit.stubbed)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::storage("seed audit", audit.id, e))?
        .rows_affected();
    }

    tx.commit().await?;

    tracing::info!(
        tenants = report.tenants,
        machines = report.machines,
        scans = report.scans,
        duplicate_groups = report.duplicate_groups,
        file_instances = report.file_instances,
        action_audits = report.action_audits,
        "Seed completed"
    );

    Ok(report)
}
