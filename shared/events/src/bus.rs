use crate::event::DomainEvent;
use async_trait::async_trait;
use shared_error::QueueError;
use shared_types::Id;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify, Semaphore};

/// A local subscriber invoked synchronously before `publish` returns —
/// e.g. the analytics rollup accumulator (spec.md §4.14: "Publication is
/// synchronous to local subscribers").
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &DomainEvent);
}

/// An external subscriber (webhook dispatcher, notification fan-out)
/// driven off the bounded worker pool.
#[async_trait]
pub trait ExternalSink: Send + Sync {
    async fn dispatch(&self, event: &DomainEvent) -> Result<(), QueueError>;
}

const DEFAULT_QUEUE_CAPACITY: usize = 1024;
const DEFAULT_PER_TENANT_CONCURRENCY: usize = 4;

struct Inner {
    queue: Mutex<VecDeque<DomainEvent>>,
    notify: Notify,
    listeners: Mutex<Vec<Arc<dyn EventListener>>>,
    sinks: Mutex<Vec<Arc<dyn ExternalSink>>>,
    tenant_limits: Mutex<HashMap<Id, Arc<Semaphore>>>,
    capacity: usize,
    per_tenant_concurrency: usize,
}

/// In-process pub/sub driving notification fan-out (C10) and analytics
/// rollup (C11) off domain events raised by the queue engine (C8/C9).
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY, DEFAULT_PER_TENANT_CONCURRENCY)
    }

    pub fn with_capacity(capacity: usize, per_tenant_concurrency: usize) -> Self {
        let bus = Self::build(capacity, per_tenant_concurrency);
        bus.spawn_dispatcher();
        bus
    }

    fn build(capacity: usize, per_tenant_concurrency: usize) -> Self {
        let inner = Arc::new(Inner {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            listeners: Mutex::new(Vec::new()),
            sinks: Mutex::new(Vec::new()),
            tenant_limits: Mutex::new(HashMap::new()),
            capacity,
            per_tenant_concurrency,
        });
        Self { inner }
    }

    /// Build a bus with the dispatcher loop not yet running, so tests can
    /// inspect queue-eviction behavior without a race against the drain
    /// task. Production code always goes through `new`/`with_capacity`.
    #[cfg(test)]
    fn build_for_queue_test(capacity: usize) -> Self {
        Self::build(capacity, DEFAULT_PER_TENANT_CONCURRENCY)
    }

    pub async fn add_listener(&self, listener: Arc<dyn EventListener>) {
        self.inner.listeners.lock().await.push(listener);
    }

    pub async fn add_sink(&self, sink: Arc<dyn ExternalSink>) {
        self.inner.sinks.lock().await.push(sink);
    }

    /// Publish an event: local listeners run inline, external sinks are
    /// queued for the bounded worker pool. Never fails the caller's
    /// originating operation — fan-out failures are logged (spec.md §4.10).
    pub async fn publish(&self, event: DomainEvent) {
        for listener in self.inner.listeners.lock().await.iter() {
            listener.on_event(&event);
        }
        self.enqueue_for_dispatch(event).await;
    }

    async fn enqueue_for_dispatch(&self, event: DomainEvent) {
        let mut queue = self.inner.queue.lock().await;
        if queue.len() >= self.inner.capacity {
            if let Some(pos) = queue.iter().position(|e| !e.is_critical()) {
                queue.remove(pos);
                tracing::warn!("event bus overloaded, dropped oldest non-critical event");
            } else if !event.is_critical() {
                tracing::warn!(
                    "event bus overloaded with critical events, dropping incoming non-critical event"
                );
                return;
            }
        }
        queue.push_back(event);
        drop(queue);
        self.inner.notify.notify_one();
    }

    async fn tenant_semaphore(&self, tenant_id: Id) -> Arc<Semaphore> {
        let mut limits = self.inner.tenant_limits.lock().await;
        limits
            .entry(tenant_id)
            .or_insert_with(|| Arc::new(Semaphore::new(self.inner.per_tenant_concurrency)))
            .clone()
    }

    fn spawn_dispatcher(&self) {
        let inner = self.inner.clone();
        let bus = Self { inner: inner.clone() };
        tokio::spawn(async move {
            loop {
                let event = {
                    let mut queue = inner.queue.lock().await;
                    queue.pop_front()
                };
                let Some(event) = event else {
                    inner.notify.notified().await;
                    continue;
                };
                let sinks: Vec<_> = inner.sinks.lock().await.clone();
                let permit = bus.tenant_semaphore(event.tenant_id).await;
                for sink in sinks {
                    let event = event.clone();
                    let permit = permit.clone();
                    tokio::spawn(async move {
                        let Ok(_guard) = permit.acquire_owned().await else { return };
                        if let Err(e) = sink.dispatch(&event).await {
                            tracing::warn!(error = %e, kind = event.kind.as_str(), "event sink delivery failed");
                        }
                    });
                }
            }
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    struct CountingListener(Arc<AtomicUsize>);
    impl EventListener for CountingListener {
        fn on_event(&self, _event: &DomainEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn local_listeners_run_synchronously() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.add_listener(Arc::new(CountingListener(count.clone()))).await;

        bus.publish(DomainEvent::new(Uuid::new_v4(), EventKind::UserEnqueued, serde_json::json!({})))
            .await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    struct RecordingSink(Arc<Mutex<Vec<EventKind>>>);
    #[async_trait]
    impl ExternalSink for RecordingSink {
        async fn dispatch(&self, event: &DomainEvent) -> Result<(), QueueError> {
            self.0.lock().await.push(event.kind);
            Ok(())
        }
    }

    #[tokio::test]
    async fn external_sinks_eventually_see_published_events() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        bus.add_sink(Arc::new(RecordingSink(seen.clone()))).await;

        bus.publish(DomainEvent::new(Uuid::new_v4(), EventKind::UserReleased, serde_json::json!({})))
            .await;

        for _ in 0..50 {
            if !seen.lock().await.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(seen.lock().await.as_slice(), &[EventKind::UserReleased]);
    }

    #[tokio::test]
    async fn overload_drops_oldest_non_critical_event_first() {
        let bus = EventBus::build_for_queue_test(2);
        // Fill the queue directly via enqueue_for_dispatch semantics by
        // publishing with no sinks registered, so nothing drains it.
        bus.enqueue_for_dispatch(DomainEvent::new(
            Uuid::new_v4(),
            EventKind::PositionChanged,
            serde_json::json!({"n": 1}),
        ))
        .await;
        bus.enqueue_for_dispatch(DomainEvent::new(
            Uuid::new_v4(),
            EventKind::UserEnqueued,
            serde_json::json!({"n": 2}),
        ))
        .await;
        bus.enqueue_for_dispatch(DomainEvent::new(
            Uuid::new_v4(),
            EventKind::PositionChanged,
            serde_json::json!({"n": 3}),
        ))
        .await;

        let remaining = bus.inner.queue.lock().await;
        // The first (non-critical) PositionChanged event was evicted; the
        // critical UserEnqueued and the newest PositionChanged survive.
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().any(|e| e.kind == EventKind::UserEnqueued));
        assert_eq!(remaining.back().unwrap().payload["n"], serde_json::json!(3));
    }
}
