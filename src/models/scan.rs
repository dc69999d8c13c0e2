//! Scan domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// 扫描记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Scan {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub initiated_machine_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duplicate_group_count: i32,
}

/// 面板展示用的扫描摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    #[serde(flatten)]
    pub scan: Scan,
    pub tenant_slug: String,
    /// 按状态统计的重复组数量
    pub status_counts: BTreeMap<String, i64>,
}

impl ScanSummary {
    /// 组装摘要；冗余计数为 0 时回退为实际加载到的组数
    pub fn new(mut scan: Scan, tenant_slug: String, status_counts: BTreeMap<String, i64>) -> Self {
        if scan.duplicate_group_count == 0 {
            let loaded: i64 = status_counts.values().sum();
            scan.duplicate_group_count = i32::try_from(loaded).unwrap_or(i32::MAX);
        }
        Self {
            scan,
            tenant_slug,
            status_counts,
        }
    }

    pub fn id(&self) -> Uuid {
        self.scan.id
    }
}

/// scans 查询的行结构（联表带出租户 slug）
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScanRow {
    #[sqlx(flatten)]
    pub scan: Scan,
    pub tenant_slug: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(count: i32) -> Scan {
        Scan {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            initiated_machine_id: None,
            name: "Baseline Sweep October".to_string(),
            description: None,
            started_at: Utc::now(),
            completed_at: None,
            duplicate_group_count: count,
        }
    }

    #[test]
    fn test_summary_falls_back_to_loaded_group_count() {
        let mut counts = BTreeMap::new();
        counts.insert("review".to_string(), 2);
        counts.insert("resolved".to_string(), 1);

        let summary = ScanSummary::new(scan(0), "orion-analytics".to_string(), counts);
        assert_eq!(summary.scan.duplicate_group_count, 3);
    }

    #[test]
    fn test_summary_keeps_denormalized_count() {
        let summary = ScanSummary::new(scan(48), "orion-analytics".to_string(), BTreeMap::new());
        assert_eq!(summary.scan.duplicate_group_count, 48);
    }
}
