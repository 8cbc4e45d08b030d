use async_trait::async_trait;
use chrono::{DateTime, Utc};
use queue_manager_core::domains::identity::domain::model::ApiKey;
use queue_manager_core::domains::identity::domain::repository::ApiKeyRepository;
use shared_error::QueueError;
use shared_types::Id;
use sqlx::{FromRow, PgPool};

#[derive(FromRow)]
struct ApiKeyRow {
    api_key_id: Id,
    tenant_id: Id,
    name: String,
    key_hash: String,
    prefix: String,
    permissions: Vec<String>,
    revoked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<ApiKeyRow> for ApiKey {
    fn from(row: ApiKeyRow) -> Self {
        ApiKey {
            api_key_id: row.api_key_id,
            tenant_id: row.tenant_id,
            name: row.name,
            key_hash: row.key_hash,
            prefix: row.prefix,
            permissions: row.permissions,
            revoked_at: row.revoked_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgApiKeyRepository {
    pool: PgPool,
}

impl PgApiKeyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApiKeyRepository for PgApiKeyRepository {
    async fn get_by_id(&self, tenant_id: Id, api_key_id: Id) -> Result<Option<ApiKey>, QueueError> {
        let row = sqlx::query_as::<_, ApiKeyRow>(
            "SELECT * FROM api_keys WHERE api_key_id = $1 AND tenant_id = $2",
        )
        .bind(api_key_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn get_by_prefix(&self, tenant_id: Id, prefix: &str) -> Result<Vec<ApiKey>, QueueError> {
        let rows = sqlx::query_as::<_, ApiKeyRow>(
            "SELECT * FROM api_keys WHERE prefix = $1 AND tenant_id = $2 AND revoked_at IS NULL",
        )
        .bind(prefix)
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_by_tenant(&self, tenant_id: Id) -> Result<Vec<ApiKey>, QueueError> {
        let rows = sqlx::query_as::<_, ApiKeyRow>(
            "SELECT * FROM api_keys WHERE tenant_id = $1 ORDER BY created_at",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn add(&self, key: &ApiKey) -> Result<ApiKey, QueueError> {
        let row = sqlx::query_as::<_, ApiKeyRow>(
            r#"
            INSERT INTO api_keys (api_key_id, tenant_id, name, key_hash, prefix, permissions, revoked_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(key.api_key_id)
        .bind(key.tenant_id)
        .bind(&key.name)
        .bind(&key.key_hash)
        .bind(&key.prefix)
        .bind(&key.permissions)
        .bind(key.revoked_at)
        .bind(key.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn revoke(&self, tenant_id: Id, api_key_id: Id) -> Result<(), QueueError> {
        sqlx::query("UPDATE api_keys SET revoked_at = $3 WHERE api_key_id = $1 AND tenant_id = $2 AND revoked_at IS NULL")
            .bind(api_key_id)
            .bind(tenant_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
