use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    /// Required once `TwoFactor::enabled` is set on the account.
    pub totp_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: &'static str,
}

impl AuthTokens {
    pub fn bearer(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self { access_token, refresh_token, expires_in, token_type: "Bearer" }
    }
}
