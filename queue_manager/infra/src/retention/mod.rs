mod archiver;
mod backup_repository;
mod policy_repository;

pub use archiver::OpaqueColdStorageArchiver;
pub use backup_repository::PgBackupRepository;
pub use policy_repository::PgRetentionPolicyRepository;
