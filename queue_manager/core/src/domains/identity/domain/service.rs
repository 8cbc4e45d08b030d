use super::model::User;
use crate::domains::identity::dto::auth_dto::{AuthTokens, LoginRequest, RefreshRequest};
use async_trait::async_trait;
use shared_error::QueueError;
use shared_types::Id;
use thiserror::Error;

/// Auth-specific failures that don't fit `ErrorKind` cleanly; callers fold
/// these into a `QueueError` at the boundary via `From`.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account is {0:?} and cannot authenticate")]
    AccountNotActive(super::model::UserStatus),
    #[error("two-factor code required")]
    TwoFactorRequired,
    #[error("two-factor code invalid")]
    TwoFactorInvalid,
    #[error("refresh token invalid or expired")]
    RefreshTokenInvalid,
    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl From<AuthError> for QueueError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Queue(inner) => inner,
            AuthError::InvalidCredentials
            | AuthError::AccountNotActive(_)
            | AuthError::TwoFactorRequired
            | AuthError::TwoFactorInvalid
            | AuthError::RefreshTokenInvalid => QueueError::unauthorized(e.to_string()),
        }
    }
}

/// Authentication flows (spec.md §4.4): issuance, refresh, logout with jti
/// blacklisting, and the 2FA gate in front of issuance.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, tenant_id: Id, req: LoginRequest) -> Result<AuthTokens, AuthError>;

    async fn refresh(&self, tenant_id: Id, req: RefreshRequest) -> Result<AuthTokens, AuthError>;

    /// Blacklist the access token's `jti` (and the refresh token's, if
    /// presented) until their natural expiry.
    async fn logout(&self, tenant_id: Id, access_jti: &str, refresh_token: Option<&str>) -> Result<(), AuthError>;

    async fn resolve_api_key(&self, presented_key: &str) -> Result<Option<Id>, QueueError>;

    async fn get_user(&self, tenant_id: Id, user_id: Id) -> Result<User, QueueError>;
}
