use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use queue_manager_core::domains::queue::domain::model::{BusinessHours, Queue, Schedule};
use queue_manager_core::domains::queue::domain::repository::QueueRepository;
use serde::{Deserialize, Serialize};
use shared_error::QueueError;
use shared_types::Id;
use sqlx::{FromRow, PgPool};

#[derive(Serialize, Deserialize)]
struct BusinessHoursJson {
    start_time: NaiveTime,
    end_time: NaiveTime,
    working_days: Vec<Weekday>,
    time_zone: String,
}

#[derive(Serialize, Deserialize, Default)]
struct ScheduleJson {
    business_hours: Option<BusinessHoursJson>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    recurring: bool,
    specific_dates: Vec<NaiveDate>,
}

impl From<&Schedule> for ScheduleJson {
    fn from(s: &Schedule) -> Self {
        ScheduleJson {
            business_hours: s.business_hours.as_ref().map(|bh| BusinessHoursJson {
                start_time: bh.start_time,
                end_time: bh.end_time,
                working_days: bh.working_days.clone(),
                time_zone: bh.time_zone.clone(),
            }),
            start_date: s.start_date,
            end_date: s.end_date,
            recurring: s.recurring,
            specific_dates: s.specific_dates.clone(),
        }
    }
}

impl TryFrom<ScheduleJson> for Schedule {
    type Error = QueueError;

    fn try_from(j: ScheduleJson) -> Result<Self, Self::Error> {
        let business_hours = j
            .business_hours
            .map(|bh| BusinessHours::new(bh.start_time, bh.end_time, bh.working_days, bh.time_zone))
            .transpose()
            .map_err(QueueError::invalid_argument)?;
        Ok(Schedule {
            business_hours,
            start_date: j.start_date,
            end_date: j.end_date,
            recurring: j.recurring,
            specific_dates: j.specific_dates,
        })
    }
}

#[derive(FromRow)]
struct QueueRow {
    queue_id: Id,
    tenant_id: Id,
    name: String,
    description: Option<String>,
    max_concurrent_users: i64,
    release_rate_per_minute: i64,
    active: bool,
    last_release_at: Option<DateTime<Utc>>,
    schedule: serde_json::Value,
    max_burst: i64,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<QueueRow> for Queue {
    type Error = QueueError;

    fn try_from(row: QueueRow) -> Result<Self, Self::Error> {
        let schedule_json: ScheduleJson = serde_json::from_value(row.schedule)
            .map_err(|e| QueueError::invalid_argument(format!("corrupt schedule column: {e}")))?;
        Ok(Queue {
            queue_id: row.queue_id,
            tenant_id: row.tenant_id,
            name: row.name,
            description: row.description,
            max_concurrent_users: row.max_concurrent_users as u32,
            release_rate_per_minute: row.release_rate_per_minute as u32,
            active: row.active,
            last_release_at: row.last_release_at,
            schedule: schedule_json.try_into()?,
            max_burst: row.max_burst as u32,
            created_at: row.created_at,
            deleted_at: row.deleted_at,
        })
    }
}

#[derive(Clone)]
pub struct PgQueueRepository {
    pool: PgPool,
}

impl PgQueueRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueueRepository for PgQueueRepository {
    async fn get_by_id(&self, tenant_id: Id, queue_id: Id) -> Result<Option<Queue>, QueueError> {
        let row = sqlx::query_as::<_, QueueRow>(
            "SELECT * FROM queues WHERE queue_id = $1 AND tenant_id = $2 AND deleted_at IS NULL",
        )
        .bind(queue_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_by_tenant(&self, tenant_id: Id) -> Result<Vec<Queue>, QueueError> {
        let rows = sqlx::query_as::<_, QueueRow>(
            "SELECT * FROM queues WHERE tenant_id = $1 AND deleted_at IS NULL ORDER BY created_at",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_active(&self) -> Result<Vec<Queue>, QueueError> {
        let rows = sqlx::query_as::<_, QueueRow>("SELECT * FROM queues WHERE active = true AND deleted_at IS NULL")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn add(&self, queue: &Queue) -> Result<Queue, QueueError> {
        let schedule_json = serde_json::to_value(ScheduleJson::from(&queue.schedule))
            .map_err(|e| QueueError::invalid_argument(format!("could not encode schedule: {e}")))?;
        let row = sqlx::query_as::<_, QueueRow>(
            r#"
            INSERT INTO queues (
                queue_id, tenant_id, name, description, max_concurrent_users,
                release_rate_per_minute, active, last_release_at, schedule, max_burst,
                created_at, deleted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(queue.queue_id)
        .bind(queue.tenant_id)
        .bind(&queue.name)
        .bind(&queue.description)
        .bind(queue.max_concurrent_users as i64)
        .bind(queue.release_rate_per_minute as i64)
        .bind(queue.active)
        .bind(queue.last_release_at)
        .bind(schedule_json)
        .bind(queue.max_burst as i64)
        .bind(queue.created_at)
        .bind(queue.deleted_at)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn update(&self, queue: &Queue) -> Result<Queue, QueueError> {
        let schedule_json = serde_json::to_value(ScheduleJson::from(&queue.schedule))
            .map_err(|e| QueueError::invalid_argument(format!("could not encode schedule: {e}")))?;
        let row = sqlx::query_as::<_, QueueRow>(
            r#"
            UPDATE queues SET
                name = $2, description = $3, max_concurrent_users = $4,
                release_rate_per_minute = $5, active = $6, schedule = $7, max_burst = $8
            WHERE queue_id = $1 AND tenant_id = $9 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(queue.queue_id)
        .bind(&queue.name)
        .bind(&queue.description)
        .bind(queue.max_concurrent_users as i64)
        .bind(queue.release_rate_per_minute as i64)
        .bind(queue.active)
        .bind(schedule_json)
        .bind(queue.max_burst as i64)
        .bind(queue.tenant_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| QueueError::not_found("queue not found").with_tenant(queue.tenant_id).with_entity(queue.queue_id))?;
        row.try_into()
    }

    async fn soft_delete(&self, tenant_id: Id, queue_id: Id) -> Result<(), QueueError> {
        sqlx::query("UPDATE queues SET deleted_at = $3, active = false WHERE queue_id = $1 AND tenant_id = $2 AND deleted_at IS NULL")
            .bind(queue_id)
            .bind(tenant_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn advance_last_release_at(
        &self,
        queue_id: Id,
        new_last_release_at: DateTime<Utc>,
        expected_last_release_at: Option<DateTime<Utc>>,
    ) -> Result<(), QueueError> {
        let result = match expected_last_release_at {
            Some(expected) => {
                sqlx::query(
                    "UPDATE queues SET last_release_at = $1 WHERE queue_id = $2 AND last_release_at = $3",
                )
                .bind(new_last_release_at)
                .bind(queue_id)
                .bind(expected)
                .execute(&self.pool)
                .await?
            },
            None => {
                sqlx::query(
                    "UPDATE queues SET last_release_at = $1 WHERE queue_id = $2 AND last_release_at IS NULL",
                )
                .bind(new_last_release_at)
                .bind(queue_id)
                .execute(&self.pool)
                .await?
            },
        };
        if result.rows_affected() == 0 {
            return Err(QueueError::conflict("last_release_at changed concurrently").with_entity(queue_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_schedule_without_business_hours_round_trips_through_json() {
        let schedule = Schedule {
            business_hours: None,
            start_date: Some(Utc::now()),
            end_date: None,
            recurring: true,
            specific_dates: vec![],
        };
        let json = serde_json::to_value(ScheduleJson::from(&schedule)).unwrap();
        let decoded: ScheduleJson = serde_json::from_value(json).unwrap();
        let restored: Schedule = decoded.try_into().unwrap();
        assert!(restored.business_hours.is_none());
        assert_eq!(restored.recurring, schedule.recurring);
        assert_eq!(restored.start_date, schedule.start_date);
    }

    #[test]
    fn a_schedule_with_business_hours_round_trips_through_json() {
        let business_hours = BusinessHours::new(
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            vec![Weekday::Mon, Weekday::Tue],
            "UTC".to_string(),
        )
        .unwrap();
        let schedule = Schedule { business_hours: Some(business_hours), ..Schedule::default() };
        let json = serde_json::to_value(ScheduleJson::from(&schedule)).unwrap();
        let decoded: ScheduleJson = serde_json::from_value(json).unwrap();
        let restored: Schedule = decoded.try_into().unwrap();
        let bh = restored.business_hours.unwrap();
        assert_eq!(bh.working_days, vec![Weekday::Mon, Weekday::Tue]);
        assert_eq!(bh.time_zone, "UTC");
    }
}
