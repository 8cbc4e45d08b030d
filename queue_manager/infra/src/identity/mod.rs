mod api_key_repository;
mod auth_service;
mod user_repository;

pub use api_key_repository::PgApiKeyRepository;
pub use auth_service::BcryptAuthService;
pub use user_repository::PgUserRepository;
