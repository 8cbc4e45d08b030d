use chrono::{DateTime, Utc};
use shared_types::{Entity, Id};

/// Tenant entity (spec.md §3). Owns every other record in the system.
#[derive(Debug, Clone)]
pub struct Tenant {
    pub tenant_id: Id,
    pub name: String,
    pub domain: String,
    pub api_key: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Entity for Tenant {
    fn id(&self) -> Id {
        self.tenant_id
    }

    fn tenant_id(&self) -> Id {
        self.tenant_id
    }

    fn deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
