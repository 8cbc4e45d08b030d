//! Bearer token encode/decode (spec.md §4.4).
//!
//! `Claims` carries exactly the fields spec.md names:
//! `{subject, tenant_id, roles, jti, iat, exp}`, plus an `issuer`/`audience`
//! pair so `validate` can reject tokens minted for a different deployment.

use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use shared_error::QueueError;
use shared_types::Id;
use uuid::Uuid;

pub const ISSUER: &str = "virtual-queue-manager";
pub const AUDIENCE: &str = "virtual-queue-manager-clients";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Id,
    pub tenant_id: Id,
    pub roles: Vec<String>,
    /// Unique per issuance; the blacklist key for logout/refresh rotation.
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub token_type: TokenType,
    pub iss: String,
    pub aud: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

impl Claims {
    pub fn new(
        subject: Id,
        tenant_id: Id,
        roles: Vec<String>,
        token_type: TokenType,
        expiration_seconds: i64,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: subject,
            tenant_id,
            roles,
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + expiration_seconds,
            token_type,
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
        }
    }
}

pub fn encode_jwt(claims: &Claims, secret: &str) -> Result<String, QueueError> {
    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::new(Algorithm::HS256), claims, &key)
        .map_err(|e| QueueError::unauthorized(format!("failed to encode token: {e}")))
}

/// Decode and structurally validate a token: signature, expiry,
/// issuer/audience. Blacklist lookup is the caller's responsibility (it
/// needs the cache).
pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims, QueueError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.set_audience(&[AUDIENCE]);

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(QueueError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_claims() {
        let subject = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();
        let claims = Claims::new(
            subject,
            tenant_id,
            vec!["admin".to_string()],
            TokenType::Access,
            3600,
        );
        let token = encode_jwt(&claims, "secret").unwrap();
        let decoded = decode_jwt(&token, "secret").unwrap();

        assert_eq!(decoded.sub, subject);
        assert_eq!(decoded.tenant_id, tenant_id);
        assert_eq!(decoded.token_type, TokenType::Access);
        assert_eq!(decoded.jti, claims.jti);
    }

    #[test]
    fn rejects_token_signed_with_different_secret() {
        let claims =
            Claims::new(Uuid::new_v4(), Uuid::new_v4(), vec![], TokenType::Access, 3600);
        let token = encode_jwt(&claims, "secret-a").unwrap();
        assert!(decode_jwt(&token, "secret-b").is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let claims =
            Claims::new(Uuid::new_v4(), Uuid::new_v4(), vec![], TokenType::Access, -10);
        let token = encode_jwt(&claims, "secret").unwrap();
        assert!(decode_jwt(&token, "secret").is_err());
    }
}
