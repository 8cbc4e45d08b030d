//! The fixed role → permission table from spec.md §4.5.

use shared_types::Role;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    pub resource: String,
    pub action: String,
}

impl Permission {
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self { resource: resource.into(), action: action.into() }
    }

    /// A `*` action matches any action on the resource (`system.*`).
    pub fn matches(&self, resource: &str, action: &str) -> bool {
        self.resource == resource && (self.action == "*" || self.action == action)
    }
}

pub fn permissions_for_role(role: Role) -> Vec<Permission> {
    match role {
        Role::Admin => vec![
            Permission::new("queue", "*"),
            Permission::new("user", "*"),
            Permission::new("tenant", "*"),
            Permission::new("analytics", "read"),
            Permission::new("system", "*"),
        ],
        Role::Manager => vec![
            Permission::new("queue", "create"),
            Permission::new("queue", "read"),
            Permission::new("queue", "update"),
            Permission::new("user", "read"),
            Permission::new("user", "update"),
            Permission::new("analytics", "read"),
        ],
        Role::User => vec![
            Permission::new("queue", "read"),
            Permission::new("queue", "update"),
            Permission::new("user", "read"),
        ],
        Role::Guest => vec![Permission::new("queue", "join"), Permission::new("queue", "read")],
        // ApiUser's permissions come from the api-key's stored list, never
        // this table; see `Authorizer::authorize`.
        Role::ApiUser => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_system_wildcard_matches_any_action() {
        let perms = permissions_for_role(Role::Admin);
        assert!(perms.iter().any(|p| p.matches("system", "reindex")));
    }

    #[test]
    fn user_cannot_delete_queues() {
        let perms = permissions_for_role(Role::User);
        assert!(!perms.iter().any(|p| p.matches("queue", "delete")));
    }
}
