use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use shared_types::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionAction {
    Delete,
    Archive,
}

/// `{entity_type, retention_period, action, criteria, active}` (spec.md §4.12).
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    pub policy_id: Id,
    pub tenant_id: Id,
    pub entity_type: String,
    pub retention_period: Duration,
    pub action: RetentionAction,
    pub criteria: Value,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl RetentionPolicy {
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.retention_period
    }
}

/// Execution record for one `apply(policy)` run.
#[derive(Debug, Clone)]
pub struct RetentionRun {
    pub run_id: Id,
    pub policy_id: Id,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub entities_affected: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Opaque snapshot (spec.md §4.12). `tenant_id = None` marks a
/// system-wide backup.
#[derive(Debug, Clone)]
pub struct Backup {
    pub backup_id: Id,
    pub tenant_id: Option<Id>,
    pub status: BackupStatus,
    pub location_uri: String,
    pub size_bytes: Option<u64>,
    pub checksum: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Backup {
    /// "verify = file exists and size > 0 and checksum matches" (spec.md
    /// §4.12). The existence/checksum check itself is the cold-storage
    /// archiver's job (§6); this is the pure half of the predicate.
    pub fn looks_complete(&self) -> bool {
        self.status == BackupStatus::Completed && self.size_bytes.is_some_and(|s| s > 0) && self.checksum.is_some()
    }
}
