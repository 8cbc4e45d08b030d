pub mod model;
pub mod repository;

pub use model::{AuditEntry, AuditResult};
pub use repository::AuditRepository;
