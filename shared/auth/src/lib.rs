//! Role-based authorization (spec.md §4.5).
//!
//! `authorize` is the single entry point; its decision is memoized through
//! [`shared_cache`] for 5 minutes keyed on `(tenant, principal, resource,
//! action)`, the way `shared-auth`'s Casbin decision cache memoized
//! `(tenant, policy_version, subject, resource, action)` — here the cache
//! key is simpler because the permission table is a fixed map, not a live
//! policy store.

mod permissions;

pub use permissions::{permissions_for_role, Permission};

use shared_cache::{keys, CacheExt, KvCache};
use shared_error::QueueError;
use shared_types::{Id, Role};
use std::sync::Arc;
use std::time::Duration;

/// How long an `authorize` decision stays cached, per spec.md §4.5.
pub const DECISION_TTL: Duration = Duration::from_secs(300);

pub struct Authorizer {
    cache: Arc<dyn KvCache>,
    /// Permissions granted to an `ApiUser` principal, resolved from the
    /// api-key's stored list rather than the fixed role table.
    api_user_overrides: Option<Vec<Permission>>,
}

impl Authorizer {
    pub fn new(cache: Arc<dyn KvCache>) -> Self {
        Self { cache, api_user_overrides: None }
    }

    /// Authorization decision for `(tenant, principal, resource, action)`.
    /// `api_key_permissions` is only consulted when `role` is `ApiUser`
    /// (spec.md: "ApiUser | merged from the api-key's stored list").
    pub async fn authorize(
        &self,
        tenant_id: Id,
        principal_id: Id,
        role: Role,
        api_key_permissions: Option<&[Permission]>,
        resource: &str,
        action: &str,
    ) -> Result<bool, QueueError> {
        let permission = format!("{resource}.{action}");
        let cache_key = keys::permission(tenant_id, principal_id, &permission);

        if let Some(cached) = self.cache.get_json::<bool>(&cache_key).await {
            return Ok(cached);
        }

        let allowed = match role {
            Role::ApiUser => api_key_permissions
                .map(|perms| perms.iter().any(|p| p.matches(resource, action)))
                .unwrap_or(false),
            other => permissions_for_role(other).iter().any(|p| p.matches(resource, action)),
        };

        self.cache.set_json(&cache_key, &allowed, Some(DECISION_TTL)).await?;
        Ok(allowed)
    }

    /// Wipe every cached decision for a principal: called after a role
    /// change or api-key revocation (spec.md §4.5, §5 "Permission cache
    /// entries are invalidated on role/api-key change").
    pub async fn invalidate(&self, tenant_id: Id, principal_id: Id) -> Result<(), QueueError> {
        let pattern = keys::permission_pattern(tenant_id, principal_id);
        let removed = self.cache.remove_by_pattern(&pattern).await?;
        tracing::debug!(tenant_id = %tenant_id, principal_id = %principal_id, removed, "invalidated permission cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_cache::InMemoryKvCache;

    fn authorizer() -> Authorizer {
        Authorizer::new(Arc::new(InMemoryKvCache::new()))
    }

    #[tokio::test]
    async fn admin_has_full_queue_crud() {
        let auth = authorizer();
        let (t, p) = (Id::new_v4(), Id::new_v4());
        assert!(auth.authorize(t, p, Role::Admin, None, "queue", "delete").await.unwrap());
    }

    #[tokio::test]
    async fn guest_cannot_create_queues() {
        let auth = authorizer();
        let (t, p) = (Id::new_v4(), Id::new_v4());
        assert!(!auth.authorize(t, p, Role::Guest, None, "queue", "create").await.unwrap());
        assert!(auth.authorize(t, p, Role::Guest, None, "queue", "join").await.unwrap());
    }

    #[tokio::test]
    async fn api_user_uses_stored_permission_list() {
        let auth = authorizer();
        let (t, p) = (Id::new_v4(), Id::new_v4());
        let granted = vec![Permission::new("queue", "read")];
        assert!(auth
            .authorize(t, p, Role::ApiUser, Some(&granted), "queue", "read")
            .await
            .unwrap());
        assert!(!auth
            .authorize(t, p, Role::ApiUser, Some(&granted), "queue", "delete")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn invalidate_clears_cached_decisions_for_principal_only() {
        let auth = authorizer();
        let (t, p1, p2) = (Id::new_v4(), Id::new_v4(), Id::new_v4());
        auth.authorize(t, p1, Role::Guest, None, "queue", "create").await.unwrap();
        auth.authorize(t, p2, Role::Admin, None, "queue", "create").await.unwrap();

        auth.invalidate(t, p1).await.unwrap();

        // p2's decision must survive invalidating p1.
        assert!(auth.authorize(t, p2, Role::Admin, None, "queue", "create").await.unwrap());
    }
}
