//! Common identifiers and cross-crate value types.
//!
//! Flattens the inheritance chain a reflective ORM would use into a single
//! `Entity` trait plus per-entity concrete structs: see `DESIGN.md`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque 128-bit identifier used for every domain entity.
pub type Id = Uuid;

/// Minimal shape every persisted row satisfies.
pub trait Entity {
    fn id(&self) -> Id;
    fn tenant_id(&self) -> Id;
    fn deleted(&self) -> bool;
}

/// Request-scoped identity: who is calling, on behalf of which tenant, with
/// which role. Never ambient — passed explicitly to every service call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant_id: Id,
    pub principal_id: Id,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    User,
    Guest,
    ApiUser,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::User => "user",
            Role::Guest => "guest",
            Role::ApiUser => "api_user",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "user" => Ok(Role::User),
            "guest" => Ok(Role::Guest),
            "api_user" => Ok(Role::ApiUser),
            _ => Err(()),
        }
    }
}

/// A page of results plus the total row count for the unfiltered query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Half-open `[start, end)` UTC instant range used by audit/session/analytics
/// queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }

    pub fn duration_seconds(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 1000.0
    }
}
