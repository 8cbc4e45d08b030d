pub mod domain;
pub mod dto;

pub use domain::admin::{NewQueue, QueueAdminService, QueuePatch};
pub use domain::model::{
    BusinessHours, DropReason, Priority, Queue, Schedule, SessionStatus, UserSession,
};
pub use domain::repository::{QueueRepository, SessionRepository};
pub use domain::service::{PositionInfo, QueueEngine, QueueEngineConfig};
