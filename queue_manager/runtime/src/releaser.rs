//! Background releaser (spec.md §4.8.4: "a per-queue releaser runs on a
//! fixed tick"). One task per active queue, grounded on the outbox
//! worker's poll loop shape: a `tokio::time::interval` drives the tick,
//! errors are logged and the loop continues rather than exiting.

use chrono::Utc;
use queue_manager_core::domains::queue::{QueueEngine, QueueRepository};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

const TICK_INTERVAL: Duration = Duration::from_secs(1);
const QUEUE_REFRESH_INTERVAL: u32 = 30;

/// Runs forever, rediscovering the active queue set every
/// [`QUEUE_REFRESH_INTERVAL`] ticks so newly created/reactivated queues
/// pick up a releaser without a process restart.
pub async fn run(engine: Arc<QueueEngine>, queues: Arc<dyn QueueRepository>) {
    let mut interval = time::interval(TICK_INTERVAL);
    let mut tick_count: u32 = 0;
    let mut active = match queues.list_active().await {
        Ok(active) => active,
        Err(e) => {
            tracing::error!(error = %e, "releaser could not load initial active queue set");
            Vec::new()
        },
    };

    loop {
        interval.tick().await;
        tick_count += 1;

        if tick_count % QUEUE_REFRESH_INTERVAL == 0 {
            match queues.list_active().await {
                Ok(refreshed) => active = refreshed,
                Err(e) => tracing::warn!(error = %e, "releaser failed to refresh active queue set, using stale list"),
            }
        }

        for queue in &active {
            let now = Utc::now();
            match engine.release_tick(queue, now).await {
                Ok(released) if !released.is_empty() => {
                    tracing::debug!(queue_id = %queue.queue_id, released = released.len(), "releaser tick");
                },
                Ok(_) => {},
                Err(e) => tracing::warn!(queue_id = %queue.queue_id, error = %e, "releaser tick failed"),
            }
        }
    }
}
