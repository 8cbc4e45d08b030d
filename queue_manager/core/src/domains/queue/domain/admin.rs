//! Queue CRUD surface (spec.md §6: `create_queue / update_queue /
//! delete_queue / list_queues`), separate from the admission engine itself.

use super::model::{Queue, Schedule};
use super::repository::QueueRepository;
use shared_error::QueueError;
use shared_types::Id;
use std::sync::Arc;

pub struct QueueAdminService {
    queues: Arc<dyn QueueRepository>,
}

#[derive(Debug, Clone)]
pub struct NewQueue {
    pub name: String,
    pub description: Option<String>,
    pub max_concurrent_users: u32,
    pub release_rate_per_minute: u32,
    pub schedule: Schedule,
}

#[derive(Debug, Clone, Default)]
pub struct QueuePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub max_concurrent_users: Option<u32>,
    pub release_rate_per_minute: Option<u32>,
    pub active: Option<bool>,
    pub schedule: Option<Schedule>,
}

impl QueueAdminService {
    pub fn new(queues: Arc<dyn QueueRepository>) -> Self {
        Self { queues }
    }

    pub async fn create_queue(&self, tenant_id: Id, new_queue: NewQueue) -> Result<Queue, QueueError> {
        if new_queue.max_concurrent_users == 0 {
            return Err(QueueError::invalid_argument("max_concurrent_users must be > 0"));
        }
        let queue = Queue {
            queue_id: Id::new_v4(),
            tenant_id,
            name: new_queue.name,
            description: new_queue.description,
            max_concurrent_users: new_queue.max_concurrent_users,
            release_rate_per_minute: new_queue.release_rate_per_minute,
            active: true,
            last_release_at: None,
            schedule: new_queue.schedule,
            max_burst: Queue::default_max_burst(new_queue.release_rate_per_minute),
            created_at: chrono::Utc::now(),
            deleted_at: None,
        };
        self.queues.add(&queue).await
    }

    pub async fn update_queue(&self, tenant_id: Id, queue_id: Id, patch: QueuePatch) -> Result<Queue, QueueError> {
        let mut queue = self
            .queues
            .get_by_id(tenant_id, queue_id)
            .await?
            .ok_or_else(|| QueueError::not_found("queue not found").with_tenant(tenant_id).with_entity(queue_id))?;

        if let Some(name) = patch.name {
            queue.name = name;
        }
        if let Some(description) = patch.description {
            queue.description = Some(description);
        }
        if let Some(max) = patch.max_concurrent_users {
            if max == 0 {
                return Err(QueueError::invalid_argument("max_concurrent_users must be > 0"));
            }
            queue.max_concurrent_users = max;
        }
        if let Some(rate) = patch.release_rate_per_minute {
            queue.release_rate_per_minute = rate;
        }
        if let Some(active) = patch.active {
            queue.active = active;
        }
        if let Some(schedule) = patch.schedule {
            queue.schedule = schedule;
        }

        self.queues.update(&queue).await
    }

    pub async fn delete_queue(&self, tenant_id: Id, queue_id: Id) -> Result<(), QueueError> {
        self.queues.soft_delete(tenant_id, queue_id).await
    }

    pub async fn list_queues(&self, tenant_id: Id) -> Result<Vec<Queue>, QueueError> {
        self.queues.list_by_tenant(tenant_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeQueueRepository {
        queues: Mutex<HashMap<Id, Queue>>,
    }

    #[async_trait]
    impl QueueRepository for FakeQueueRepository {
        async fn get_by_id(&self, tenant_id: Id, queue_id: Id) -> Result<Option<Queue>, QueueError> {
            Ok(self.queues.lock().unwrap().get(&queue_id).filter(|q| q.tenant_id == tenant_id).cloned())
        }

        async fn list_by_tenant(&self, tenant_id: Id) -> Result<Vec<Queue>, QueueError> {
            Ok(self.queues.lock().unwrap().values().filter(|q| q.tenant_id == tenant_id).cloned().collect())
        }

        async fn list_active(&self) -> Result<Vec<Queue>, QueueError> {
            Ok(self.queues.lock().unwrap().values().filter(|q| q.active).cloned().collect())
        }

        async fn add(&self, queue: &Queue) -> Result<Queue, QueueError> {
            self.queues.lock().unwrap().insert(queue.queue_id, queue.clone());
            Ok(queue.clone())
        }

        async fn update(&self, queue: &Queue) -> Result<Queue, QueueError> {
            self.queues.lock().unwrap().insert(queue.queue_id, queue.clone());
            Ok(queue.clone())
        }

        async fn soft_delete(&self, _tenant_id: Id, queue_id: Id) -> Result<(), QueueError> {
            if let Some(q) = self.queues.lock().unwrap().get_mut(&queue_id) {
                q.deleted_at = Some(chrono::Utc::now());
            }
            Ok(())
        }

        async fn advance_last_release_at(
            &self,
            _queue_id: Id,
            _new_last_release_at: DateTime<chrono::Utc>,
            _expected_last_release_at: Option<DateTime<chrono::Utc>>,
        ) -> Result<(), QueueError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn create_queue_rejects_zero_capacity() {
        let service = QueueAdminService::new(Arc::new(FakeQueueRepository::default()));
        let err = service
            .create_queue(
                Id::new_v4(),
                NewQueue {
                    name: "support".into(),
                    description: None,
                    max_concurrent_users: 0,
                    release_rate_per_minute: 10,
                    schedule: Schedule::default(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, shared_error::ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn update_patches_only_provided_fields() {
        let tenant_id = Id::new_v4();
        let service = QueueAdminService::new(Arc::new(FakeQueueRepository::default()));
        let queue = service
            .create_queue(
                tenant_id,
                NewQueue {
                    name: "support".into(),
                    description: None,
                    max_concurrent_users: 50,
                    release_rate_per_minute: 10,
                    schedule: Schedule::default(),
                },
            )
            .await
            .unwrap();

        let updated = service
            .update_queue(tenant_id, queue.queue_id, QueuePatch { active: Some(false), ..Default::default() })
            .await
            .unwrap();

        assert!(!updated.active);
        assert_eq!(updated.max_concurrent_users, 50);
        assert_eq!(updated.name, "support");
    }
}
