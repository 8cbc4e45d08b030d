use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::Id;

/// Outcome recorded alongside the audited mutation (spec.md §2 "Supplemented
/// features": the distillation's `{tenant, actor, action, ...}` shape didn't
/// name a result field, but every mutation either succeeds, is denied by
/// authz, or errors — all three are worth distinguishing in the trail).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditResult {
    Success,
    Denied,
    Error,
}

/// Append-only audit record (spec.md §4.7). Never mutated after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub audit_id: Id,
    pub tenant_id: Id,
    pub actor_id: Id,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<Id>,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub result: AuditResult,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenant_id: Id,
        actor_id: Id,
        action: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: Option<Id>,
        before: Option<Value>,
        after: Option<Value>,
        result: AuditResult,
    ) -> Self {
        Self {
            audit_id: Id::new_v4(),
            tenant_id,
            actor_id,
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id,
            before,
            after,
            ip: None,
            user_agent: None,
            result,
            timestamp: Utc::now(),
        }
    }
}
