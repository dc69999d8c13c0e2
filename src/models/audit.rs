//! Audit domain models
//!
//! 动作审计记录只追加、不修改。payload 按动作类型使用封闭的结构体集合，
//! 持久化为 JSON，并通过 payload_version 列标记结构版本。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use super::UnknownVariant;

/// 当前 payload 结构版本
pub const PAYLOAD_VERSION: i16 = 1;

/// 审计动作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    AssignKeeper,
    DeleteCopies,
    CreateHardlinks,
    Quarantine,
    Retry,
    Note,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::AssignKeeper => "assign_keeper",
            ActionType::DeleteCopies => "delete_copies",
            ActionType::CreateHardlinks => "create_hardlinks",
            ActionType::Quarantine => "quarantine",
            ActionType::Retry => "retry",
            ActionType::Note => "note",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assign_keeper" => Ok(ActionType::AssignKeeper),
            "delete_copies" => Ok(ActionType::DeleteCopies),
            "create_hardlinks" => Ok(ActionType::CreateHardlinks),
            "quarantine" => Ok(ActionType::Quarantine),
            "retry" => Ok(ActionType::Retry),
            "note" => Ok(ActionType::Note),
            other => Err(UnknownVariant::new("action type", other)),
        }
    }
}

/// 可对重复组触发的处置动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateAction {
    DeleteCopies,
    CreateHardlinks,
    Quarantine,
}

impl DuplicateAction {
    pub fn action_type(&self) -> ActionType {
        match self {
            DuplicateAction::DeleteCopies => ActionType::DeleteCopies,
            DuplicateAction::CreateHardlinks => ActionType::CreateHardlinks,
            DuplicateAction::Quarantine => ActionType::Quarantine,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.action_type().as_str()
    }

    /// 是否会修改本地存储
    pub fn mutates_store(&self) -> bool {
        matches!(self, DuplicateAction::Quarantine)
    }
}

impl fmt::Display for DuplicateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DuplicateAction {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delete_copies" => Ok(DuplicateAction::DeleteCopies),
            "create_hardlinks" => Ok(DuplicateAction::CreateHardlinks),
            "quarantine" => Ok(DuplicateAction::Quarantine),
            other => Err(UnknownVariant::new("duplicate action", other)),
        }
    }
}

/// assign_keeper 的 payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeeperPayload {
    pub keeper_machine_id: Uuid,
}

/// delete_copies / create_hardlinks / quarantine 的 payload
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationPayload {
    #[serde(default)]
    pub target_file_ids: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

/// 审计 payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AuditPayload {
    Keeper(KeeperPayload),
    Remediation(RemediationPayload),
    /// note / retry 以及无法按当前结构解析的历史数据
    Freeform(Map<String, Value>),
}

impl AuditPayload {
    pub fn to_json(&self) -> Value {
        // 三种结构都序列化为 JSON object，不会失败
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// 按动作类型解码持久化的 JSON
    pub fn from_json(action_type: ActionType, value: Value) -> Option<Self> {
        let object = match value {
            Value::Object(object) => object,
            Value::Null => return None,
            other => {
                let mut object = Map::new();
                object.insert("value".to_string(), other);
                return Some(AuditPayload::Freeform(object));
            }
        };

        let typed = match action_type {
            ActionType::AssignKeeper => {
                serde_json::from_value::<KeeperPayload>(Value::Object(object.clone()))
                    .ok()
                    .map(AuditPayload::Keeper)
            }
            ActionType::DeleteCopies | ActionType::CreateHardlinks | ActionType::Quarantine => {
                serde_json::from_value::<RemediationPayload>(Value::Object(object.clone()))
                    .ok()
                    .filter(|_| object.keys().all(|k| k == "targetFileIds" || k == "notes"))
                    .map(AuditPayload::Remediation)
            }
            ActionType::Retry | ActionType::Note => None,
        };

        Some(typed.unwrap_or(AuditPayload::Freeform(object)))
    }

    pub fn keeper_machine_id(&self) -> Option<Uuid> {
        match self {
            AuditPayload::Keeper(p) => Some(p.keeper_machine_id),
            _ => None,
        }
    }
}

/// 动作审计记录
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionAudit {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub duplicate_group_id: Option<Uuid>,
    pub actor: String,
    pub action_type: ActionType,
    pub payload: Option<AuditPayload>,
    pub performed_at: DateTime<Utc>,
    /// 仅记录、未真正执行远端处置时为 true
    pub stubbed: bool,
}

impl ActionAudit {
    pub fn new(
        tenant_id: Uuid,
        duplicate_group_id: Uuid,
        actor: &str,
        action_type: ActionType,
        payload: AuditPayload,
        stubbed: bool,
    ) -> Self {
        let actor = actor.trim();
        Self {
            id: Uuid::new_v4(),
            tenant_id: Some(tenant_id),
            duplicate_group_id: Some(duplicate_group_id),
            actor: if actor.is_empty() { "system".to_string() } else { actor.to_string() },
            action_type,
            payload: Some(payload),
            performed_at: Utc::now(),
            stubbed,
        }
    }
}

/// action_audits 表的行结构
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActionAuditRow {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub duplicate_group_id: Option<Uuid>,
    pub actor: String,
    pub action_type: String,
    pub payload: Option<Value>,
    pub payload_version: Option<i16>,
    pub performed_at: DateTime<Utc>,
    pub stubbed: bool,
}

impl TryFrom<ActionAuditRow> for ActionAudit {
    type Error = UnknownVariant;

    fn try_from(row: ActionAuditRow) -> Result<Self, Self::Error> {
        let action_type: ActionType = row.action_type.parse()?;
        Ok(ActionAudit {
            id: row.id,
            tenant_id: row.tenant_id,
            duplicate_group_id: row.duplicate_group_id,
            actor: row.actor,
            action_type,
            payload: row
                .payload
                .and_then(|value| AuditPayload::from_json(action_type, value)),
            performed_at: row.performed_at,
            stubbed: row.stubbed,
        })
    }
}

/// 审计查询过滤条件
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditFilters {
    pub tenant_id: Option<Uuid>,
    pub duplicate_group_id: Option<Uuid>,
    pub action_type: Option<ActionType>,
    pub actor: Option<String>,
    pub stubbed: Option<bool>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl AuditFilters {
    pub fn for_group(tenant_id: Uuid, duplicate_group_id: Uuid) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            duplicate_group_id: Some(duplicate_group_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, audit: &ActionAudit) -> bool {
        if self.tenant_id.is_some() && audit.tenant_id != self.tenant_id {
            return false;
        }
        if self.duplicate_group_id.is_some() && audit.duplicate_group_id != self.duplicate_group_id
        {
            return false;
        }
        if let Some(action_type) = self.action_type {
            if audit.action_type != action_type {
                return false;
            }
        }
        if let Some(actor) = &self.actor {
            if &audit.actor != actor {
                return false;
            }
        }
        if let Some(stubbed) = self.stubbed {
            if audit.stubbed != stubbed {
                return false;
            }
        }
        if let Some(start) = self.start_time {
            if audit.performed_at < start {
                return false;
            }
        }
        if let Some(end) = self.end_time {
            if audit.performed_at > end {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keeper_payload_uses_camel_case_key() {
        let machine = Uuid::new_v4();
        let payload = AuditPayload::Keeper(KeeperPayload {
            keeper_machine_id: machine,
        });

        assert_eq!(payload.to_json(), json!({ "keeperMachineId": machine.to_string() }));
    }

    #[test]
    fn test_remediation_payload_decodes_by_action_type() {
        let value = json!({ "targetFileIds": ["f1"], "notes": "overlap" });
        let payload = AuditPayload::from_json(ActionType::Quarantine, value).unwrap();

        assert_eq!(
            payload,
            AuditPayload::Remediation(RemediationPayload {
                target_file_ids: vec!["f1".to_string()],
                notes: "overlap".to_string(),
            })
        );
    }

    #[test]
    fn test_unknown_shape_is_kept_as_freeform() {
        let value = json!({ "reason": "media sync window overlap" });
        let payload = AuditPayload::from_json(ActionType::Quarantine, value.clone()).unwrap();

        assert!(matches!(payload, AuditPayload::Freeform(_)));
        assert_eq!(payload.to_json(), value);
    }

    #[test]
    fn test_note_payload_is_freeform() {
        let value = json!({ "text": "checked with owner" });
        let payload = AuditPayload::from_json(ActionType::Note, value).unwrap();
        assert!(matches!(payload, AuditPayload::Freeform(_)));
        assert_eq!(payload.keeper_machine_id(), None);
    }

    #[test]
    fn test_duplicate_action_parsing() {
        assert_eq!("quarantine".parse::<DuplicateAction>().unwrap(), DuplicateAction::Quarantine);
        assert!("assign_keeper".parse::<DuplicateAction>().is_err());
        assert!("note".parse::<DuplicateAction>().is_err());
        assert!(DuplicateAction::Quarantine.mutates_store());
        assert!(!DuplicateAction::DeleteCopies.mutates_store());
    }

    #[test]
    fn test_blank_actor_defaults_to_system() {
        let audit = ActionAudit::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "  ",
            ActionType::DeleteCopies,
            AuditPayload::Remediation(RemediationPayload::default()),
            true,
        );
        assert_eq!(audit.actor, "system");
    }

    #[test]
    fn test_filters_match_group_and_type() {
        let tenant = Uuid::new_v4();
        let group = Uuid::new_v4();
        let audit = ActionAudit::new(
            tenant,
            group,
            "system",
            ActionType::Quarantine,
            AuditPayload::Remediation(RemediationPayload::default()),
            true,
        );

        let mut filters = AuditFilters::for_group(tenant, group);
        assert!(filters.matches(&audit));

        filters.action_type = Some(ActionType::AssignKeeper);
        assert!(!filters.matches(&audit));

        let other = AuditFilters::for_group(Uuid::new_v4(), group);
        assert!(!other.matches(&audit));
    }
}
