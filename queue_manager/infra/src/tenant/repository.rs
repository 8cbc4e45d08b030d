use async_trait::async_trait;
use chrono::{DateTime, Utc};
use queue_manager_core::domains::tenant::{Tenant, TenantRepository};
use shared_error::QueueError;
use shared_types::Id;
use sqlx::{FromRow, PgPool};

#[derive(FromRow)]
struct TenantRow {
    tenant_id: Id,
    name: String,
    domain: String,
    api_key: String,
    active: bool,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<TenantRow> for Tenant {
    fn from(row: TenantRow) -> Self {
        Tenant {
            tenant_id: row.tenant_id,
            name: row.name,
            domain: row.domain,
            api_key: row.api_key,
            active: row.active,
            created_at: row.created_at,
            deleted_at: row.deleted_at,
        }
    }
}

#[derive(Clone)]
pub struct PgTenantRepository {
    pool: PgPool,
}

impl PgTenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantRepository for PgTenantRepository {
    async fn get_by_id(&self, id: Id) -> Result<Option<Tenant>, QueueError> {
        let row = sqlx::query_as::<_, TenantRow>("SELECT * FROM tenants WHERE tenant_id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn get_by_domain(&self, domain: &str) -> Result<Option<Tenant>, QueueError> {
        let row = sqlx::query_as::<_, TenantRow>("SELECT * FROM tenants WHERE domain = $1 AND deleted_at IS NULL")
            .bind(domain)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn get_by_api_key(&self, api_key: &str) -> Result<Option<Tenant>, QueueError> {
        let row = sqlx::query_as::<_, TenantRow>(
            "SELECT * FROM tenants WHERE api_key = $1 AND deleted_at IS NULL AND active = true",
        )
        .bind(api_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn add(&self, tenant: &Tenant) -> Result<Tenant, QueueError> {
        let row = sqlx::query_as::<_, TenantRow>(
            r#"
            INSERT INTO tenants (tenant_id, name, domain, api_key, active, created_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(tenant.tenant_id)
        .bind(&tenant.name)
        .bind(&tenant.domain)
        .bind(&tenant.api_key)
        .bind(tenant.active)
        .bind(tenant.created_at)
        .bind(tenant.deleted_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update(&self, tenant: &Tenant) -> Result<Tenant, QueueError> {
        let row = sqlx::query_as::<_, TenantRow>(
            r#"
            UPDATE tenants SET name = $2, domain = $3, active = $4
            WHERE tenant_id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(tenant.tenant_id)
        .bind(&tenant.name)
        .bind(&tenant.domain)
        .bind(tenant.active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| QueueError::not_found("tenant not found").with_entity(tenant.tenant_id))?;
        Ok(row.into())
    }

    /// Cascades soft-delete to every child table (spec.md §3 Lifecycles).
    async fn soft_delete(&self, id: Id) -> Result<(), QueueError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE tenants SET deleted_at = $2, active = false WHERE tenant_id = $1")
            .bind(id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        for table in ["users", "queues", "webhooks"] {
            let sql = format!("UPDATE {table} SET deleted_at = $2 WHERE tenant_id = $1 AND deleted_at IS NULL");
            sqlx::query(&sql).bind(id).bind(now).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
