//! In-process domain event bus (spec.md §4.14).
//!
//! Kept from `shared_events`'s NATS-based design: a typed `EventEnvelope`
//! carrying a stable `event_type` tag, JSON-serializable for webhook
//! transport (spec.md §6). Replaced: the NATS transport, since spec.md
//! describes a single-writer, single-process engine with no cross-replica
//! fan-out (spec.md §1 Non-goals, §5) — delivery is in-process pub/sub plus
//! a bounded worker pool for external sinks.

mod bus;
mod event;

pub use bus::{EventBus, EventListener, ExternalSink};
pub use event::{DomainEvent, EventKind};
