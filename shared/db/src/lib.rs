use shared_error::QueueError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Initialize the durable-store connection pool.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<PgPool, QueueError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to connect to durable store");
            QueueError::transient(format!("failed to connect to database: {e}"))
        })
}
