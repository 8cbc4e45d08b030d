//! Periodic retention sweep (spec.md §4.12: "policies are applied on a
//! schedule, not on every write"). There is no tenant-enumeration
//! repository method, so the sweep discovers tenants from the active
//! queue set, the same way the releaser discovers queues.

use queue_manager_core::domains::queue::QueueRepository;
use queue_manager_core::domains::retention::RetentionService;
use shared_types::Id;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

pub async fn run(retention: Arc<RetentionService>, queues: Arc<dyn QueueRepository>) {
    let mut interval = time::interval(SWEEP_INTERVAL);
    loop {
        interval.tick().await;

        let tenants: HashSet<Id> = match queues.list_active().await {
            Ok(active) => active.into_iter().map(|q| q.tenant_id).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "retention sweep could not enumerate tenants, skipping this run");
                continue;
            },
        };

        for tenant_id in tenants {
            match retention.apply_all(tenant_id).await {
                Ok(runs) if !runs.is_empty() => {
                    tracing::info!(tenant_id = %tenant_id, policies_applied = runs.len(), "retention sweep applied policies");
                },
                Ok(_) => {},
                Err(e) => tracing::warn!(tenant_id = %tenant_id, error = %e, "retention sweep failed for tenant"),
            }
        }
    }
}
