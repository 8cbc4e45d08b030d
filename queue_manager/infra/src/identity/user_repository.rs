use async_trait::async_trait;
use chrono::{DateTime, Utc};
use queue_manager_core::domains::identity::domain::model::{TwoFactor, User, UserStatus};
use queue_manager_core::domains::identity::domain::repository::UserRepository;
use shared_error::QueueError;
use shared_types::{Id, Role};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

#[derive(FromRow)]
struct UserRow {
    user_id: Id,
    tenant_id: Id,
    username: String,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    role: String,
    status: String,
    last_login_at: Option<DateTime<Utc>>,
    email_verified_at: Option<DateTime<Utc>>,
    phone_verified_at: Option<DateTime<Utc>>,
    two_factor_enabled: bool,
    two_factor_secret: Option<String>,
    refresh_token_hash: Option<String>,
    refresh_expires_at: Option<DateTime<Utc>>,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = QueueError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            user_id: row.user_id,
            tenant_id: row.tenant_id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            role: Role::from_str(&row.role).map_err(|_| QueueError::invalid_argument(format!("unknown role: {}", row.role)))?,
            status: parse_status(&row.status)?,
            last_login_at: row.last_login_at,
            email_verified_at: row.email_verified_at,
            phone_verified_at: row.phone_verified_at,
            two_factor: TwoFactor { enabled: row.two_factor_enabled, secret: row.two_factor_secret },
            refresh_token_hash: row.refresh_token_hash,
            refresh_expires_at: row.refresh_expires_at,
            metadata: row.metadata,
            created_at: row.created_at,
            deleted_at: row.deleted_at,
        })
    }
}

fn parse_status(s: &str) -> Result<UserStatus, QueueError> {
    match s {
        "active" => Ok(UserStatus::Active),
        "inactive" => Ok(UserStatus::Inactive),
        "suspended" => Ok(UserStatus::Suspended),
        "pending" => Ok(UserStatus::Pending),
        other => Err(QueueError::invalid_argument(format!("unknown user status: {other}"))),
    }
}

fn status_str(status: UserStatus) -> &'static str {
    match status {
        UserStatus::Active => "active",
        UserStatus::Inactive => "inactive",
        UserStatus::Suspended => "suspended",
        UserStatus::Pending => "pending",
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn get_by_id(&self, tenant_id: Id, user_id: Id) -> Result<Option<User>, QueueError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT * FROM users WHERE user_id = $1 AND tenant_id = $2 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_username(&self, tenant_id: Id, username: &str) -> Result<Option<User>, QueueError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT * FROM users WHERE username = $1 AND tenant_id = $2 AND deleted_at IS NULL",
        )
        .bind(username)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_email(&self, tenant_id: Id, email: &str) -> Result<Option<User>, QueueError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT * FROM users WHERE email = $1 AND tenant_id = $2 AND deleted_at IS NULL",
        )
        .bind(email)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_by_tenant(&self, tenant_id: Id, page: u32, page_size: u32) -> Result<Vec<User>, QueueError> {
        let offset = (page.saturating_sub(1)) as i64 * page_size as i64;
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT * FROM users WHERE tenant_id = $1 AND deleted_at IS NULL ORDER BY created_at LIMIT $2 OFFSET $3",
        )
        .bind(tenant_id)
        .bind(page_size as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn add(&self, user: &User) -> Result<User, QueueError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (
                user_id, tenant_id, username, email, password_hash, first_name, last_name, phone,
                role, status, last_login_at, email_verified_at, phone_verified_at,
                two_factor_enabled, two_factor_secret, refresh_token_hash, refresh_expires_at,
                metadata, created_at, deleted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            RETURNING *
            "#,
        )
        .bind(user.user_id)
        .bind(user.tenant_id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .bind(status_str(user.status))
        .bind(user.last_login_at)
        .bind(user.email_verified_at)
        .bind(user.phone_verified_at)
        .bind(user.two_factor.enabled)
        .bind(&user.two_factor.secret)
        .bind(&user.refresh_token_hash)
        .bind(user.refresh_expires_at)
        .bind(&user.metadata)
        .bind(user.created_at)
        .bind(user.deleted_at)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn update(&self, user: &User) -> Result<User, QueueError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users SET
                username = $2, email = $3, password_hash = $4, first_name = $5, last_name = $6,
                phone = $7, role = $8, status = $9, last_login_at = $10, email_verified_at = $11,
                phone_verified_at = $12, two_factor_enabled = $13, two_factor_secret = $14,
                refresh_token_hash = $15, refresh_expires_at = $16, metadata = $17
            WHERE user_id = $1 AND tenant_id = $18 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(user.user_id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .bind(status_str(user.status))
        .bind(user.last_login_at)
        .bind(user.email_verified_at)
        .bind(user.phone_verified_at)
        .bind(user.two_factor.enabled)
        .bind(&user.two_factor.secret)
        .bind(&user.refresh_token_hash)
        .bind(user.refresh_expires_at)
        .bind(&user.metadata)
        .bind(user.tenant_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| QueueError::not_found("user not found").with_tenant(user.tenant_id).with_entity(user.user_id))?;
        row.try_into()
    }

    async fn soft_delete(&self, tenant_id: Id, user_id: Id) -> Result<(), QueueError> {
        sqlx::query("UPDATE users SET deleted_at = $3 WHERE user_id = $1 AND tenant_id = $2 AND deleted_at IS NULL")
            .bind(user_id)
            .bind(tenant_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_its_column_string() {
        for status in [UserStatus::Active, UserStatus::Inactive, UserStatus::Suspended, UserStatus::Pending] {
            assert_eq!(parse_status(status_str(status)).unwrap(), status);
        }
    }

    #[test]
    fn an_unrecognized_status_column_value_is_an_error_not_a_default() {
        assert!(parse_status("archived").is_err());
    }
}
