pub mod model;
pub mod repository;
pub mod service;

pub use model::{Backup, BackupStatus, RetentionAction, RetentionPolicy, RetentionRun};
pub use repository::{BackupRepository, RetentionPolicyRepository};
pub use service::{ColdStorageArchiver, RetentionService};
