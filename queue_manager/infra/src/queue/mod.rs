mod queue_repository;
mod session_repository;

pub use queue_repository::PgQueueRepository;
pub use session_repository::PgSessionRepository;
