mod repository;

pub use repository::PgTenantRepository;
