use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{Entity, Id};

/// Ordering weight for the waiting line (spec.md §4.8.1). Variant order is
/// declaration order, so `Priority::VIP > Priority::Low` via `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low = 0,
    Standard = 1,
    Premium = 2,
    #[serde(rename = "vip")]
    VIP = 3,
}

impl Priority {
    pub fn weight(self) -> u8 {
        self as u8
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Standard
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Waiting,
    Serving,
    Released,
    Dropped,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Released | SessionStatus::Dropped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    User,
    Timeout,
    Admin,
}

/// `{start_time, end_time, working_days, time_zone}` (spec.md §3). `time_zone`
/// is an IANA name resolved at evaluation time by `chrono-tz`.
#[derive(Debug, Clone)]
pub struct BusinessHours {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub working_days: Vec<Weekday>,
    pub time_zone: String,
}

impl BusinessHours {
    /// spec.md §8: "A schedule with empty `working_days` is invalid at
    /// construction."
    pub fn new(
        start_time: NaiveTime,
        end_time: NaiveTime,
        working_days: Vec<Weekday>,
        time_zone: String,
    ) -> Result<Self, String> {
        if working_days.is_empty() {
            return Err("business hours must name at least one working day".into());
        }
        if start_time >= end_time {
            return Err("start_time must be before end_time".into());
        }
        Ok(Self { start_time, end_time, working_days, time_zone })
    }
}

/// `{business_hours?, start_date?, end_date?, recurring?, specific_dates[]}`
/// (spec.md §3, evaluated per §4.11).
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    pub business_hours: Option<BusinessHours>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub recurring: bool,
    pub specific_dates: Vec<chrono::NaiveDate>,
}

/// Queue entity (spec.md §3).
#[derive(Debug, Clone)]
pub struct Queue {
    pub queue_id: Id,
    pub tenant_id: Id,
    pub name: String,
    pub description: Option<String>,
    pub max_concurrent_users: u32,
    pub release_rate_per_minute: u32,
    pub active: bool,
    pub last_release_at: Option<DateTime<Utc>>,
    pub schedule: Schedule,
    pub max_burst: u32,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Queue {
    /// spec.md §4.8.4: "default equals one second's worth of rate, minimum 1".
    pub fn default_max_burst(release_rate_per_minute: u32) -> u32 {
        (release_rate_per_minute / 60).max(1)
    }
}

impl Entity for Queue {
    fn id(&self) -> Id {
        self.queue_id
    }

    fn tenant_id(&self) -> Id {
        self.tenant_id
    }

    fn deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// UserSession entity (spec.md §3). `position` is a derived projection,
/// recomputed by [`crate::domains::queue::domain::ordering`].
#[derive(Debug, Clone)]
pub struct UserSession {
    pub session_id: Id,
    pub queue_id: Id,
    pub tenant_id: Id,
    pub user_identifier: String,
    pub status: SessionStatus,
    pub priority: Priority,
    pub enqueued_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
    pub served_at: Option<DateTime<Utc>>,
    pub position: u64,
    pub metadata: Value,
    /// Optimistic-concurrency token for store updates (spec.md §4.2).
    pub version: i64,
}

impl UserSession {
    pub fn new(
        queue_id: Id,
        tenant_id: Id,
        user_identifier: String,
        priority: Priority,
        metadata: Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: Id::new_v4(),
            queue_id,
            tenant_id,
            user_identifier,
            status: SessionStatus::Waiting,
            priority,
            enqueued_at: now,
            released_at: None,
            served_at: None,
            position: 0,
            metadata,
            version: 0,
        }
    }
}

impl Entity for UserSession {
    fn id(&self) -> Id {
        self.session_id
    }

    fn tenant_id(&self) -> Id {
        self.tenant_id
    }

    fn deleted(&self) -> bool {
        false
    }
}
