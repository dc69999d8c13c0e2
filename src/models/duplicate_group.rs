//! Duplicate group domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use super::UnknownVariant;

/// 重复组状态
///
/// review → action_needed → resolved → archived，由扫描流程推进；动作分发器只读不改。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    #[default]
    Review,
    ActionNeeded,
    Resolved,
    Archived,
}

impl GroupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupStatus::Review => "review",
            GroupStatus::ActionNeeded => "action_needed",
            GroupStatus::Resolved => "resolved",
            GroupStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "review" => Ok(GroupStatus::Review),
            "action_needed" => Ok(GroupStatus::ActionNeeded),
            "resolved" => Ok(GroupStatus::Resolved),
            "archived" => Ok(GroupStatus::Archived),
            other => Err(UnknownVariant::new("duplicate group status", other)),
        }
    }
}

/// 重复文件在某台机器上的一个实例
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FileInstance {
    pub id: Uuid,
    pub duplicate_group_id: Uuid,
    pub machine_id: Uuid,
    pub path: String,
    pub size_bytes: i64,
    pub checksum: String,
    pub last_seen_at: DateTime<Utc>,
    pub quarantined: bool,
}

/// 重复组（含文件实例）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// 加载时联表得到的所属租户 slug
    pub tenant_slug: String,
    pub scan_id: Uuid,
    pub keeper_machine_id: Option<Uuid>,
    pub hash: String,
    pub status: GroupStatus,
    pub file_count: i32,
    pub total_size_bytes: i64,
    /// 按 path 排序
    pub files: Vec<FileInstance>,
}

impl DuplicateGroup {
    pub fn belongs_to(&self, tenant_slug: &str) -> bool {
        self.tenant_slug == tenant_slug
    }

    pub fn quarantined_count(&self) -> usize {
        self.files.iter().filter(|f| f.quarantined).count()
    }

    /// 列表排序键：(status 文本, hash)
    pub fn sort_key(&self) -> (&'static str, &str) {
        (self.status.as_str(), self.hash.as_str())
    }
}

/// duplicate_groups 查询的行结构
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DuplicateGroupRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub tenant_slug: String,
    pub scan_id: Uuid,
    pub keeper_machine_id: Option<Uuid>,
    pub hash: String,
    pub status: String,
    pub file_count: i32,
    pub total_size_bytes: i64,
}

impl DuplicateGroupRow {
    /// 与文件实例组装为领域对象；files 需已按 path 排序
    pub fn into_group(self, files: Vec<FileInstance>) -> Result<DuplicateGroup, UnknownVariant> {
        Ok(DuplicateGroup {
            id: self.id,
            tenant_id: self.tenant_id,
            tenant_slug: self.tenant_slug,
            scan_id: self.scan_id,
            keeper_machine_id: self.keeper_machine_id.filter(|id| !id.is_nil()),
            hash: self.hash,
            status: self.status.parse()?,
            file_count: self.file_count,
            total_size_bytes: self.total_size_bytes,
            files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str, keeper: Option<Uuid>) -> DuplicateGroupRow {
        DuplicateGroupRow {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            tenant_slug: "orion-analytics".to_string(),
            scan_id: Uuid::new_v4(),
            keeper_machine_id: keeper,
            hash: "hash:finance-q4-plan".to_string(),
            status: status.to_string(),
            file_count: 2,
            total_size_bytes: 2048,
        }
    }

    #[test]
    fn test_status_text_mapping() {
        for status in [
            GroupStatus::Review,
            GroupStatus::ActionNeeded,
            GroupStatus::Resolved,
            GroupStatus::Archived,
        ] {
            assert_eq!(status.as_str().parse::<GroupStatus>().unwrap(), status);
        }
        assert_eq!(GroupStatus::default(), GroupStatus::Review);
    }

    #[test]
    fn test_row_conversion_treats_nil_keeper_as_unset() {
        let group = row("review", Some(Uuid::nil())).into_group(Vec::new()).unwrap();
        assert_eq!(group.keeper_machine_id, None);
    }

    #[test]
    fn test_row_conversion_rejects_unknown_status() {
        assert!(row("pending", None).into_group(Vec::new()).is_err());
    }

    #[test]
    fn test_sort_key_orders_by_status_text_then_hash() {
        let a = row("review", None).into_group(Vec::new()).unwrap();
        let mut b = row("action_needed", None).into_group(Vec::new()).unwrap();
        b.hash = "hash:zzz".to_string();

        assert!(b.sort_key() < a.sort_key());
        assert!(a.belongs_to("orion-analytics"));
        assert!(!a.belongs_to("selene-research"));
    }
}
