use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{Entity, Id};

pub use shared_types::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
    Pending,
}

impl UserStatus {
    /// spec.md §4.4: "Issue flow requires a user whose status is Active" —
    /// Pending/Suspended/Inactive are all kept out of the issuance path.
    pub fn can_authenticate(&self) -> bool {
        matches!(self, UserStatus::Active)
    }
}

#[derive(Debug, Clone)]
pub struct TwoFactor {
    pub enabled: bool,
    pub secret: Option<String>,
}

impl TwoFactor {
    pub fn disabled() -> Self {
        Self { enabled: false, secret: None }
    }
}

/// User entity (spec.md §3).
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Id,
    pub tenant_id: Id,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub status: UserStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub phone_verified_at: Option<DateTime<Utc>>,
    pub two_factor: TwoFactor,
    pub refresh_token_hash: Option<String>,
    pub refresh_expires_at: Option<DateTime<Utc>>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Entity for User {
    fn id(&self) -> Id {
        self.user_id
    }

    fn tenant_id(&self) -> Id {
        self.tenant_id
    }

    fn deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Opaque api-key record. The token itself (`vq_{tenant}_{random}`) is
/// stored hashed; `permissions` backs the `ApiUser` role's authorization
/// (spec.md §4.4, §4.5).
#[derive(Debug, Clone)]
pub struct ApiKey {
    pub api_key_id: Id,
    pub tenant_id: Id,
    pub name: String,
    pub key_hash: String,
    pub prefix: String,
    pub permissions: Vec<String>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ApiKey {
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none()
    }
}

impl Entity for ApiKey {
    fn id(&self) -> Id {
        self.api_key_id
    }

    fn tenant_id(&self) -> Id {
        self.tenant_id
    }

    fn deleted(&self) -> bool {
        false
    }
}
