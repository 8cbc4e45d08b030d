mod repository;

pub use repository::PgAuditRepository;
