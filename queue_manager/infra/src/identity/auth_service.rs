use async_trait::async_trait;
use chrono::Utc;
use queue_manager_core::domains::identity::domain::model::{User, UserStatus};
use queue_manager_core::domains::identity::domain::repository::{ApiKeyRepository, UserRepository};
use queue_manager_core::domains::identity::domain::service::{AuthError, AuthService};
use queue_manager_core::domains::identity::dto::auth_dto::{AuthTokens, LoginRequest, RefreshRequest};
use sha2::{Digest, Sha256};
use shared_cache::{keys, CacheExt, KvCache};
use shared_error::QueueError;
use shared_jwt::{decode_jwt, encode_jwt, Claims, TokenType};
use shared_types::Id;
use std::sync::Arc;
use std::time::Duration;
use totp_rs::{Secret, TOTP};

/// Bcrypt-backed [`AuthService`] (spec.md §4.4): password verification,
/// an optional TOTP second factor, JWT issuance, and blacklist-based
/// logout/refresh revocation via the shared cache.
pub struct BcryptAuthService<UR, AR> {
    users: UR,
    api_keys: AR,
    cache: Arc<dyn KvCache>,
    jwt_secret: String,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

impl<UR, AR> BcryptAuthService<UR, AR>
where
    UR: UserRepository,
    AR: ApiKeyRepository,
{
    pub fn new(
        users: UR,
        api_keys: AR,
        cache: Arc<dyn KvCache>,
        jwt_secret: String,
        access_ttl_seconds: i64,
        refresh_ttl_seconds: i64,
    ) -> Self {
        Self { users, api_keys, cache, jwt_secret, access_ttl_seconds, refresh_ttl_seconds }
    }

    fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn issue(&self, user: &User) -> Result<(AuthTokens, Claims), AuthError> {
        let access_claims = Claims::new(
            user.user_id,
            user.tenant_id,
            vec![user.role.as_str().to_string()],
            TokenType::Access,
            self.access_ttl_seconds,
        );
        let refresh_claims = Claims::new(
            user.user_id,
            user.tenant_id,
            vec![user.role.as_str().to_string()],
            TokenType::Refresh,
            self.refresh_ttl_seconds,
        );
        let access_token = encode_jwt(&access_claims, &self.jwt_secret)?;
        let refresh_token = encode_jwt(&refresh_claims, &self.jwt_secret)?;
        let tokens = AuthTokens::bearer(access_token, refresh_token, self.access_ttl_seconds);
        Ok((tokens, refresh_claims))
    }

    fn verify_totp(secret: &str, code: &str) -> bool {
        let totp = match TOTP::new(
            totp_rs::Algorithm::SHA1,
            6,
            1,
            30,
            Secret::Encoded(secret.to_string()).to_bytes().unwrap_or_default(),
        ) {
            Ok(t) => t,
            Err(_) => return false,
        };
        totp.check_current(code).unwrap_or(false)
    }
}

#[async_trait]
impl<UR, AR> AuthService for BcryptAuthService<UR, AR>
where
    UR: UserRepository,
    AR: ApiKeyRepository,
{
    async fn login(&self, tenant_id: Id, req: LoginRequest) -> Result<AuthTokens, AuthError> {
        let user = self
            .users
            .get_by_username(tenant_id, &req.username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let valid = bcrypt::verify(&req.password, &user.password_hash)
            .map_err(|e| AuthError::Queue(QueueError::transient(format!("password verification failed: {e}"))))?;
        if !valid {
            return Err(AuthError::InvalidCredentials);
        }

        if !user.status.can_authenticate() {
            return Err(AuthError::AccountNotActive(user.status));
        }

        if user.two_factor.enabled {
            let secret = user.two_factor.secret.as_deref().unwrap_or_default();
            match req.totp_code.as_deref() {
                None => return Err(AuthError::TwoFactorRequired),
                Some(code) if !Self::verify_totp(secret, code) => return Err(AuthError::TwoFactorInvalid),
                Some(_) => {},
            }
        }

        let (tokens, refresh_claims) = self.issue(&user)?;

        let mut updated = user.clone();
        updated.last_login_at = Some(Utc::now());
        updated.refresh_token_hash = Some(Self::hash_token(&tokens.refresh_token));
        updated.refresh_expires_at = Some(Utc::now() + chrono::Duration::seconds(self.refresh_ttl_seconds));
        self.users.update(&updated).await?;

        let _ = refresh_claims;
        Ok(tokens)
    }

    async fn refresh(&self, tenant_id: Id, req: RefreshRequest) -> Result<AuthTokens, AuthError> {
        let claims = decode_jwt(&req.refresh_token, &self.jwt_secret).map_err(|_| AuthError::RefreshTokenInvalid)?;
        if claims.token_type != TokenType::Refresh || claims.tenant_id != tenant_id {
            return Err(AuthError::RefreshTokenInvalid);
        }

        if self.cache.exists(&keys::jwt_blacklist(&claims.jti)).await.unwrap_or(false) {
            return Err(AuthError::RefreshTokenInvalid);
        }

        let user = self.users.get_by_id(tenant_id, claims.sub).await?.ok_or(AuthError::RefreshTokenInvalid)?;

        let presented_hash = Self::hash_token(&req.refresh_token);
        if user.refresh_token_hash.as_deref() != Some(presented_hash.as_str()) {
            return Err(AuthError::RefreshTokenInvalid);
        }
        if user.refresh_expires_at.map(|exp| exp < Utc::now()).unwrap_or(true) {
            return Err(AuthError::RefreshTokenInvalid);
        }
        if !user.status.can_authenticate() {
            return Err(AuthError::AccountNotActive(user.status));
        }

        // Refresh tokens are single-use (spec.md §9 open question, resolved
        // in favor of mandatory rotation): blacklist the presented jti before
        // minting a replacement pair.
        let ttl = (claims.exp - Utc::now().timestamp()).max(1) as u64;
        self.cache
            .set_raw(&keys::jwt_blacklist(&claims.jti), b"1".to_vec(), Some(Duration::from_secs(ttl)))
            .await
            .map_err(AuthError::Queue)?;

        let (tokens, _) = self.issue(&user)?;
        let mut updated = user.clone();
        updated.refresh_token_hash = Some(Self::hash_token(&tokens.refresh_token));
        updated.refresh_expires_at = Some(Utc::now() + chrono::Duration::seconds(self.refresh_ttl_seconds));
        self.users.update(&updated).await?;

        Ok(tokens)
    }

    async fn logout(&self, _tenant_id: Id, access_jti: &str, refresh_token: Option<&str>) -> Result<(), AuthError> {
        self.cache
            .set_raw(&keys::jwt_blacklist(access_jti), b"1".to_vec(), Some(Duration::from_secs(self.access_ttl_seconds as u64)))
            .await
            .map_err(AuthError::Queue)?;

        if let Some(refresh_token) = refresh_token {
            if let Ok(claims) = decode_jwt(refresh_token, &self.jwt_secret) {
                let ttl = (claims.exp - Utc::now().timestamp()).max(1) as u64;
                self.cache
                    .set_raw(&keys::jwt_blacklist(&claims.jti), b"1".to_vec(), Some(Duration::from_secs(ttl)))
                    .await
                    .map_err(AuthError::Queue)?;
            }
        }
        Ok(())
    }

    async fn resolve_api_key(&self, presented_key: &str) -> Result<Option<Id>, QueueError> {
        let Some((tenant_hex, _)) = parse_opaque_key(presented_key) else {
            return Ok(None);
        };
        let tenant_id = match Id::parse_str(&pad_hex_to_uuid(tenant_hex)) {
            Ok(id) => id,
            Err(_) => return Ok(None),
        };

        let prefix = opaque_key_prefix(presented_key);
        let candidates = self.api_keys.get_by_prefix(tenant_id, &prefix).await?;
        let presented_hash = Self::hash_token(presented_key);
        for candidate in candidates {
            if candidate.is_active() && candidate.key_hash == presented_hash {
                return Ok(Some(candidate.api_key_id));
            }
        }
        Ok(None)
    }

    async fn get_user(&self, tenant_id: Id, user_id: Id) -> Result<User, QueueError> {
        self.users
            .get_by_id(tenant_id, user_id)
            .await?
            .ok_or_else(|| QueueError::not_found("user not found").with_tenant(tenant_id).with_entity(user_id))
    }
}

/// Opaque api-key format is `vq_{tenant-id-hex}_{random}` (spec.md §4.4).
fn parse_opaque_key(key: &str) -> Option<(&str, &str)> {
    let rest = key.strip_prefix("vq_")?;
    rest.split_once('_')
}

fn opaque_key_prefix(key: &str) -> String {
    let (tenant_hex, _) = parse_opaque_key(key).unwrap_or(("", ""));
    format!("vq_{tenant_hex}_")
}

fn pad_hex_to_uuid(hex: &str) -> String {
    let clean: String = hex.chars().filter(|c| c.is_ascii_hexdigit()).collect();
    let padded = format!("{clean:0>32}");
    format!(
        "{}-{}-{}-{}-{}",
        &padded[0..8],
        &padded[8..12],
        &padded[12..16],
        &padded[16..20],
        &padded[20..32]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tenant_hex_and_random_suffix() {
        let (tenant_hex, rest) = parse_opaque_key("vq_a1b2c3d4_therest").unwrap();
        assert_eq!(tenant_hex, "a1b2c3d4");
        assert_eq!(rest, "therest");
    }

    #[test]
    fn rejects_keys_without_the_vq_prefix() {
        assert!(parse_opaque_key("sk_a1b2c3d4_therest").is_none());
    }

    #[test]
    fn prefix_includes_both_underscores() {
        assert_eq!(opaque_key_prefix("vq_a1b2c3d4_therest"), "vq_a1b2c3d4_");
    }

    #[test]
    fn pads_a_short_hex_fragment_into_a_canonical_uuid_shape() {
        let uuid = pad_hex_to_uuid("a1b2c3d4");
        assert_eq!(uuid, "00000000-0000-0000-0000-0000a1b2c3d4");
        assert!(Id::parse_str(&uuid).is_ok());
    }
}
