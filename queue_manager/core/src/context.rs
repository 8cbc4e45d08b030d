//! Request-scoped tenant context (spec.md §4.1, §5 C13).
//!
//! No ambient/thread-local state: every service call takes a
//! `RequestContext` explicitly and every repository call threads its
//! `tenant_id` through to the store so cross-tenant reads are impossible by
//! construction (spec.md §8: "No cross-tenant query ever returns a row of
//! another tenant").

pub use shared_types::TenantContext as RequestContext;

use shared_error::QueueError;
use shared_types::Id;

/// Fail closed: an operation with no resolved tenant context is
/// `Unauthorized`, never "acts as no tenant".
pub fn require_tenant(ctx: Option<&RequestContext>) -> Result<Id, QueueError> {
    ctx.map(|c| c.tenant_id)
        .ok_or_else(|| QueueError::unauthorized("no tenant context on request"))
}
