//! Namespaced key builders for the keyspaces listed in spec.md §4.3.

use shared_types::Id;

pub fn queue_user_position(queue_id: Id, user_identifier: &str) -> String {
    format!("queue:{queue_id}:user:{user_identifier}:position")
}

pub fn rate_limit(scope: &str) -> String {
    format!("rate_limit:{scope}")
}

pub fn rate_limit_count(scope: &str) -> String {
    format!("rate_limit:{scope}:count")
}

pub fn rate_limit_window_start(scope: &str) -> String {
    format!("rate_limit:{scope}:window_start")
}

/// Admin-configured per-key `{limit, window}` override (spec.md §4.6 `set`),
/// consulted by `check` ahead of the endpoint's default limit.
pub fn rate_limit_override(scope: &str) -> String {
    format!("rate_limit:{scope}:override")
}

pub fn permission(tenant_id: Id, principal_id: Id, permission: &str) -> String {
    format!("permission:{tenant_id}:{principal_id}:{permission}")
}

pub fn user_permissions(tenant_id: Id, principal_id: Id) -> String {
    format!("user_permissions:{tenant_id}:{principal_id}")
}

pub fn role_permissions(role: &str) -> String {
    format!("role_permissions:{role}")
}

pub fn jwt_blacklist(jti: &str) -> String {
    format!("jwt_blacklist:{jti}")
}

pub fn jwt_token(tenant_id: Id, principal_id: Id, jti: &str) -> String {
    format!("jwt_token:{tenant_id}:{principal_id}:{jti}")
}

/// Pattern matching every permission cache entry for a principal, for
/// `invalidate(tenant, principal)` (spec.md §4.5).
pub fn permission_pattern(tenant_id: Id, principal_id: Id) -> String {
    format!("permission:{tenant_id}:{principal_id}:*")
}
