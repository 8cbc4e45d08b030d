use super::model::{RetentionAction, RetentionPolicy, RetentionRun};
use super::repository::RetentionPolicyRepository;
use async_trait::async_trait;
use shared_error::QueueError;
use shared_types::Id;
use std::sync::Arc;
use std::time::Instant;

/// Cold-storage archiver (spec.md §6): `archive(batch)`, `restore(batch_id)`.
/// Implemented externally (object storage, tape, whatever the deployment
/// uses); the engine only calls through this trait.
#[async_trait]
pub trait ColdStorageArchiver: Send + Sync {
    async fn archive(&self, tenant_id: Id, entity_type: &str, ids: &[Id]) -> Result<String, QueueError>;
}

pub struct RetentionService {
    policies: Arc<dyn RetentionPolicyRepository>,
    archiver: Arc<dyn ColdStorageArchiver>,
}

impl RetentionService {
    pub fn new(policies: Arc<dyn RetentionPolicyRepository>, archiver: Arc<dyn ColdStorageArchiver>) -> Self {
        Self { policies, archiver }
    }

    /// `apply_one` (spec.md §4.12).
    pub async fn apply_one(&self, tenant_id: Id, policy: &RetentionPolicy) -> Result<RetentionRun, QueueError> {
        if !policy.active {
            return Ok(RetentionRun {
                run_id: Id::new_v4(),
                policy_id: policy.policy_id,
                started_at: chrono::Utc::now(),
                duration_ms: 0,
                entities_affected: 0,
            });
        }

        let started_at = chrono::Utc::now();
        let start = Instant::now();
        let cutoff = policy.cutoff(started_at);
        let expired = self.policies.select_expired(tenant_id, &policy.entity_type, cutoff).await?;

        let affected = match policy.action {
            RetentionAction::Delete => {
                self.policies.delete_entities(tenant_id, &policy.entity_type, &expired).await?
            },
            RetentionAction::Archive => {
                if !expired.is_empty() {
                    self.archiver.archive(tenant_id, &policy.entity_type, &expired).await?;
                    self.policies.delete_entities(tenant_id, &policy.entity_type, &expired).await?
                } else {
                    0
                }
            },
        };

        Ok(RetentionRun {
            run_id: Id::new_v4(),
            policy_id: policy.policy_id,
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            entities_affected: affected,
        })
    }

    /// `apply_all(tenant)` (spec.md §4.12).
    pub async fn apply_all(&self, tenant_id: Id) -> Result<Vec<RetentionRun>, QueueError> {
        let policies = self.policies.list_active(tenant_id).await?;
        let mut runs = Vec::with_capacity(policies.len());
        for policy in &policies {
            runs.push(self.apply_one(tenant_id, policy).await?);
        }
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::retention::model::{Backup, BackupStatus};
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakePolicyRepository {
        expired: Mutex<HashMap<String, Vec<Id>>>,
        deleted: Mutex<Vec<Id>>,
    }

    #[async_trait]
    impl RetentionPolicyRepository for FakePolicyRepository {
        async fn get_by_id(&self, _tenant_id: Id, _policy_id: Id) -> Result<Option<RetentionPolicy>, QueueError> {
            Ok(None)
        }

        async fn list_active(&self, _tenant_id: Id) -> Result<Vec<RetentionPolicy>, QueueError> {
            Ok(Vec::new())
        }

        async fn add(&self, policy: &RetentionPolicy) -> Result<RetentionPolicy, QueueError> {
            Ok(policy.clone())
        }

        async fn select_expired(
            &self,
            _tenant_id: Id,
            entity_type: &str,
            _cutoff: chrono::DateTime<chrono::Utc>,
        ) -> Result<Vec<Id>, QueueError> {
            Ok(self.expired.lock().unwrap().get(entity_type).cloned().unwrap_or_default())
        }

        async fn delete_entities(&self, _tenant_id: Id, _entity_type: &str, ids: &[Id]) -> Result<u64, QueueError> {
            self.deleted.lock().unwrap().extend_from_slice(ids);
            Ok(ids.len() as u64)
        }
    }

    struct NoopArchiver;

    #[async_trait]
    impl ColdStorageArchiver for NoopArchiver {
        async fn archive(&self, _tenant_id: Id, _entity_type: &str, _ids: &[Id]) -> Result<String, QueueError> {
            Ok("archive://noop".into())
        }
    }

    #[tokio::test]
    async fn delete_policy_removes_selected_entities() {
        let tenant_id = Id::new_v4();
        let policy_id = Id::new_v4();
        let expired_ids = vec![Id::new_v4(), Id::new_v4()];

        let repo = Arc::new(FakePolicyRepository::default());
        repo.expired.lock().unwrap().insert("session".into(), expired_ids.clone());

        let service = RetentionService::new(repo.clone(), Arc::new(NoopArchiver));
        let policy = RetentionPolicy {
            policy_id,
            tenant_id,
            entity_type: "session".into(),
            retention_period: ChronoDuration::days(90),
            action: RetentionAction::Delete,
            criteria: Value::Null,
            active: true,
            created_at: chrono::Utc::now(),
        };

        let run = service.apply_one(tenant_id, &policy).await.unwrap();
        assert_eq!(run.entities_affected, 2);
        assert_eq!(repo.deleted.lock().unwrap().len(), 2);
    }

    #[test]
    fn backup_is_complete_only_with_size_and_checksum() {
        let backup = Backup {
            backup_id: Id::new_v4(),
            tenant_id: None,
            status: BackupStatus::Completed,
            location_uri: "s3://bucket/key".into(),
            size_bytes: Some(1024),
            checksum: Some("deadbeef".into()),
            created_at: chrono::Utc::now(),
            completed_at: Some(chrono::Utc::now()),
        };
        assert!(backup.looks_complete());

        let empty = Backup { size_bytes: Some(0), ..backup };
        assert!(!empty.looks_complete());
    }
}
