pub mod domain;
pub mod dto;

pub use domain::model::{ApiKey, Role, TwoFactor, User, UserStatus};
pub use domain::repository::{ApiKeyRepository, UserRepository};
pub use domain::service::{AuthError, AuthService};
