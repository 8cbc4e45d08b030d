use async_trait::async_trait;
use chrono::{DateTime, Utc};
use queue_manager_core::domains::retention::model::{Backup, BackupStatus};
use queue_manager_core::domains::retention::repository::BackupRepository;
use shared_error::QueueError;
use shared_types::Id;
use sqlx::{FromRow, PgPool};

#[derive(FromRow)]
struct BackupRow {
    backup_id: Id,
    tenant_id: Option<Id>,
    status: String,
    location_uri: String,
    size_bytes: Option<i64>,
    checksum: Option<String>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<BackupRow> for Backup {
    type Error = QueueError;

    fn try_from(row: BackupRow) -> Result<Self, Self::Error> {
        Ok(Backup {
            backup_id: row.backup_id,
            tenant_id: row.tenant_id,
            status: parse_status(&row.status)?,
            location_uri: row.location_uri,
            size_bytes: row.size_bytes.map(|s| s as u64),
            checksum: row.checksum,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}

fn parse_status(s: &str) -> Result<BackupStatus, QueueError> {
    match s {
        "pending" => Ok(BackupStatus::Pending),
        "running" => Ok(BackupStatus::Running),
        "completed" => Ok(BackupStatus::Completed),
        "failed" => Ok(BackupStatus::Failed),
        other => Err(QueueError::invalid_argument(format!("unknown backup status: {other}"))),
    }
}

fn status_str(status: BackupStatus) -> &'static str {
    match status {
        BackupStatus::Pending => "pending",
        BackupStatus::Running => "running",
        BackupStatus::Completed => "completed",
        BackupStatus::Failed => "failed",
    }
}

#[derive(Clone)]
pub struct PgBackupRepository {
    pool: PgPool,
}

impl PgBackupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BackupRepository for PgBackupRepository {
    async fn get_by_id(&self, backup_id: Id) -> Result<Option<Backup>, QueueError> {
        let row = sqlx::query_as::<_, BackupRow>("SELECT * FROM backups WHERE backup_id = $1")
            .bind(backup_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self, tenant_id: Option<Id>) -> Result<Vec<Backup>, QueueError> {
        let rows = match tenant_id {
            Some(tenant_id) => {
                sqlx::query_as::<_, BackupRow>("SELECT * FROM backups WHERE tenant_id = $1 ORDER BY created_at DESC")
                    .bind(tenant_id)
                    .fetch_all(&self.pool)
                    .await?
            },
            None => {
                sqlx::query_as::<_, BackupRow>("SELECT * FROM backups WHERE tenant_id IS NULL ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await?
            },
        };
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn add(&self, backup: &Backup) -> Result<Backup, QueueError> {
        let row = sqlx::query_as::<_, BackupRow>(
            r#"
            INSERT INTO backups (backup_id, tenant_id, status, location_uri, size_bytes, checksum, created_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(backup.backup_id)
        .bind(backup.tenant_id)
        .bind(status_str(backup.status))
        .bind(&backup.location_uri)
        .bind(backup.size_bytes.map(|s| s as i64))
        .bind(&backup.checksum)
        .bind(backup.created_at)
        .bind(backup.completed_at)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn update(&self, backup: &Backup) -> Result<Backup, QueueError> {
        let row = sqlx::query_as::<_, BackupRow>(
            r#"
            UPDATE backups SET status = $2, size_bytes = $3, checksum = $4, completed_at = $5
            WHERE backup_id = $1
            RETURNING *
            "#,
        )
        .bind(backup.backup_id)
        .bind(status_str(backup.status))
        .bind(backup.size_bytes.map(|s| s as i64))
        .bind(&backup.checksum)
        .bind(backup.completed_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| QueueError::not_found("backup not found").with_entity(backup.backup_id))?;
        row.try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_its_column_string() {
        for status in [BackupStatus::Pending, BackupStatus::Running, BackupStatus::Completed, BackupStatus::Failed] {
            assert_eq!(parse_status(status_str(status)).unwrap(), status);
        }
    }
}
