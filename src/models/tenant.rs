//! Tenant domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use super::UnknownVariant;

/// 租户
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    /// 对外暴露的作用域标识，唯一且不可变
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub primary_contact: Option<String>,
}

/// 租户列表项（附带机器数量）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TenantSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub tenant: Tenant,
    pub machine_count: i64,
}

/// 机器类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineCategory {
    PersonalLaptop,
    Server,
}

impl MachineCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineCategory::PersonalLaptop => "personal_laptop",
            MachineCategory::Server => "server",
        }
    }
}

impl fmt::Display for MachineCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MachineCategory {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "personal_laptop" => Ok(MachineCategory::PersonalLaptop),
            "server" => Ok(MachineCategory::Server),
            other => Err(UnknownVariant::new("machine category", other)),
        }
    }
}

/// 参与扫描的主机，归属唯一租户
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub category: MachineCategory,
    pub hostname: Option<String>,
    pub role: Option<String>,
    pub last_scan_at: Option<DateTime<Utc>>,
}

/// machines 表的行结构
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MachineRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub category: String,
    pub hostname: Option<String>,
    pub role: Option<String>,
    pub last_scan_at: Option<DateTime<Utc>>,
}

impl TryFrom<MachineRow> for Machine {
    type Error = UnknownVariant;

    fn try_from(row: MachineRow) -> Result<Self, Self::Error> {
        Ok(Machine {
            id: row.id,
            tenant_id: row.tenant_id,
            name: row.name,
            category: row.category.parse()?,
            hostname: row.hostname,
            role: row.role,
            last_scan_at: row.last_scan_at,
        })
    }
}

/// 租户/机器选择遥测事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SelectionEvent {
    TenantSelection {
        tenant_slug: String,
    },
    MachineSelection {
        tenant_slug: String,
        machine_id: Uuid,
        machine_name: String,
    },
}
