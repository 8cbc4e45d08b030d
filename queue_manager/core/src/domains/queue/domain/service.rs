//! Queue Engine: enqueue/drop/serve transitions and the rate-limited
//! releaser tick (spec.md §4.8, §4.9).

use super::model::{DropReason, Priority, Queue, SessionStatus, UserSession};
use super::ordering::recompute_positions;
use super::repository::{QueueRepository, SessionRepository};
use super::schedule;
use chrono::{DateTime, Utc};
use serde_json::Value;
use shared_cache::{keys, CacheExt, KvCache};
use shared_error::{ErrorKind, QueueError};
use shared_events::{DomainEvent, EventBus, EventKind};
use shared_types::Id;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

const MAX_WRITE_RETRIES: usize = 3;
const RETRY_BASE_DELAY_MS: u64 = 20;

fn retry_strategy() -> impl Iterator<Item = StdDuration> {
    ExponentialBackoff::from_millis(RETRY_BASE_DELAY_MS).factor(2).map(jitter).take(MAX_WRITE_RETRIES)
}

fn is_conflict(err: &QueueError) -> bool {
    err.kind == ErrorKind::Conflict
}

pub struct QueueEngineConfig {
    /// spec.md §9 open question: the default is left to the deployer.
    pub strict_capacity_mode: bool,
}

pub struct QueueEngine {
    queues: Arc<dyn QueueRepository>,
    sessions: Arc<dyn SessionRepository>,
    cache: Arc<dyn KvCache>,
    events: Arc<EventBus>,
    config: QueueEngineConfig,
}

#[derive(Debug, Clone)]
pub struct PositionInfo {
    pub position: u64,
    pub estimated_wait_seconds: Option<f64>,
}

impl QueueEngine {
    pub fn new(
        queues: Arc<dyn QueueRepository>,
        sessions: Arc<dyn SessionRepository>,
        cache: Arc<dyn KvCache>,
        events: Arc<EventBus>,
        config: QueueEngineConfig,
    ) -> Self {
        Self { queues, sessions, cache, events, config }
    }

    /// spec.md §4.8.2.
    pub async fn enqueue(
        &self,
        tenant_id: Id,
        queue_id: Id,
        user_identifier: &str,
        priority: Priority,
        metadata: Value,
        now: DateTime<Utc>,
    ) -> Result<UserSession, QueueError> {
        let queue = self.load_open_queue(tenant_id, queue_id, now).await?;

        if let Some(existing) = self.sessions.get_active_by_identifier(queue_id, user_identifier).await? {
            return Ok(existing);
        }

        if self.config.strict_capacity_mode {
            let waiting = self.sessions.count_by_status(queue_id, SessionStatus::Waiting).await?;
            let serving = self.sessions.count_by_status(queue_id, SessionStatus::Serving).await?;
            if waiting + serving >= queue.max_concurrent_users as u64 {
                return Err(QueueError::at_capacity("queue is at capacity").with_tenant(tenant_id).with_entity(queue_id));
            }
        }

        let session = UserSession::new(queue_id, tenant_id, user_identifier.to_string(), priority, metadata, now);
        let session = self.sessions.add(&session).await?;

        self.recompute_and_persist(queue_id).await?;
        let session = self
            .sessions
            .get_by_id(tenant_id, session.session_id)
            .await?
            .ok_or_else(|| QueueError::not_found("session vanished after enqueue"))?;

        self.publish(tenant_id, EventKind::UserEnqueued, &session).await;
        Ok(session)
    }

    /// spec.md §4.8.3.
    pub async fn drop_session(
        &self,
        tenant_id: Id,
        queue_id: Id,
        session_id: Id,
        _reason: DropReason,
        now: DateTime<Utc>,
    ) -> Result<(), QueueError> {
        let Some(session) = self.sessions.get_by_id(tenant_id, session_id).await? else {
            return Err(QueueError::not_found("session not found").with_tenant(tenant_id).with_entity(session_id));
        };
        if session.status != SessionStatus::Waiting {
            // Idempotent no-op once terminal (spec.md §8).
            return Ok(());
        }

        let mut updated = session.clone();
        updated.status = SessionStatus::Dropped;
        updated.released_at = Some(now);
        self.persist_transition(updated.clone()).await?;

        self.recompute_and_persist(queue_id).await?;
        self.publish(tenant_id, EventKind::UserDropped, &updated).await;
        Ok(())
    }

    /// spec.md §4.9: `Waiting → Serving` via explicit "begin serve".
    pub async fn begin_serve(
        &self,
        tenant_id: Id,
        session_id: Id,
        now: DateTime<Utc>,
    ) -> Result<UserSession, QueueError> {
        let Some(session) = self.sessions.get_by_id(tenant_id, session_id).await? else {
            return Err(QueueError::not_found("session not found").with_tenant(tenant_id).with_entity(session_id));
        };
        if session.status != SessionStatus::Waiting {
            return Err(QueueError::invalid_state(format!(
                "cannot begin serve from status {:?}",
                session.status
            )));
        }
        let mut updated = session;
        updated.status = SessionStatus::Serving;
        updated.served_at = Some(now);
        let updated = self.persist_transition(updated).await?;
        self.publish(tenant_id, EventKind::SessionServing, &updated).await;
        Ok(updated)
    }

    /// spec.md §4.9: `Serving → Released` via "complete serve".
    pub async fn complete_serve(
        &self,
        tenant_id: Id,
        session_id: Id,
        now: DateTime<Utc>,
    ) -> Result<UserSession, QueueError> {
        let Some(session) = self.sessions.get_by_id(tenant_id, session_id).await? else {
            return Err(QueueError::not_found("session not found").with_tenant(tenant_id).with_entity(session_id));
        };
        if session.status != SessionStatus::Serving {
            return Err(QueueError::invalid_state(format!(
                "cannot complete serve from status {:?}",
                session.status
            )));
        }
        let mut updated = session;
        updated.status = SessionStatus::Released;
        updated.released_at = Some(now);
        let updated = self.persist_transition(updated).await?;
        self.publish(tenant_id, EventKind::UserReleased, &updated).await;
        Ok(updated)
    }

    /// spec.md §6: `position(queue_id, user_identifier)`.
    pub async fn position(
        &self,
        queue_id: Id,
        user_identifier: &str,
    ) -> Result<Option<PositionInfo>, QueueError> {
        let Some(session) = self.sessions.get_active_by_identifier(queue_id, user_identifier).await? else {
            return Ok(None);
        };
        if session.status != SessionStatus::Waiting {
            return Ok(Some(PositionInfo { position: session.position, estimated_wait_seconds: None }));
        }

        let cache_key = keys::queue_user_position(queue_id, user_identifier);
        if let Some(cached) = self.cache.get_json::<u64>(&cache_key).await {
            return Ok(Some(PositionInfo {
                position: cached,
                estimated_wait_seconds: self.estimate_wait(queue_id, cached).await,
            }));
        }

        let wait = self.estimate_wait(queue_id, session.position).await;
        Ok(Some(PositionInfo { position: session.position, estimated_wait_seconds: wait }))
    }

    async fn estimate_wait(&self, queue_id: Id, position: u64) -> Option<f64> {
        let queue = self.queues.get_by_id(self.tenant_of(queue_id).await?, queue_id).await.ok()??;
        if !queue.active {
            return None;
        }
        let rate_per_second = queue.release_rate_per_minute as f64 / 60.0;
        if rate_per_second <= 0.0 {
            return None;
        }
        Some(position as f64 / rate_per_second)
    }

    /// The store indexes by `(tenant, queue)`; this re-derives tenant from
    /// the queue when only the queue_id is in hand (cache lookups, the
    /// releaser). Cheap relative to the store round trip it guards.
    async fn tenant_of(&self, queue_id: Id) -> Option<Id> {
        self.queues.list_active().await.ok()?.into_iter().find(|q| q.queue_id == queue_id).map(|q| q.tenant_id)
    }

    /// spec.md §4.8.4: one releaser tick for a single queue. Returns the
    /// sessions that were transitioned to Released.
    pub async fn release_tick(&self, queue: &Queue, now: DateTime<Utc>) -> Result<Vec<UserSession>, QueueError> {
        if !queue.active {
            return Ok(Vec::new());
        }
        if !schedule::is_active(&queue.schedule, now) {
            return Ok(Vec::new());
        }
        if queue.release_rate_per_minute == 0 {
            return Ok(Vec::new());
        }

        // A queue that has never released anything has no `last_release_at`
        // to measure elapsed time against; baseline off `created_at` so
        // allowance accrues from the queue's birth instead of from `now`
        // (which would always yield zero elapsed time and never advance).
        let last = queue.last_release_at.unwrap_or(queue.created_at);
        let elapsed_secs = (now - last).num_milliseconds().max(0) as f64 / 1000.0;
        let allowance = queue.release_rate_per_minute as f64 * elapsed_secs / 60.0;
        if allowance < 1.0 {
            return Ok(Vec::new());
        }

        let k = (allowance.floor() as u32).min(queue.max_burst).max(0) as usize;
        if k == 0 {
            return Ok(Vec::new());
        }

        let waiting = self.sessions.get_waiting_by_queue_ordered(queue.queue_id).await?;
        let to_release: Vec<_> = waiting.into_iter().take(k).collect();
        if to_release.is_empty() {
            return Ok(Vec::new());
        }

        let mut released = Vec::with_capacity(to_release.len());
        for mut session in to_release {
            session.status = SessionStatus::Released;
            session.released_at = Some(now);
            let session = self.persist_transition(session).await?;
            self.publish(queue.tenant_id, EventKind::UserReleased, &session).await;
            released.push(session);
        }

        // Advance monotonically by the consumed allowance, never snap to
        // `now`, so unused fractional allowance is never fabricated
        // (spec.md §4.8.4 step 4).
        let consumed_secs = released.len() as f64 * 60.0 / queue.release_rate_per_minute as f64;
        let new_last_release_at = last + chrono::Duration::milliseconds((consumed_secs * 1000.0) as i64);
        self.queues
            .advance_last_release_at(queue.queue_id, new_last_release_at, queue.last_release_at)
            .await?;

        self.recompute_and_persist(queue.queue_id).await?;
        Ok(released)
    }

    async fn load_open_queue(&self, tenant_id: Id, queue_id: Id, now: DateTime<Utc>) -> Result<Queue, QueueError> {
        let queue = self
            .queues
            .get_by_id(tenant_id, queue_id)
            .await?
            .ok_or_else(|| QueueError::not_found("queue not found").with_tenant(tenant_id).with_entity(queue_id))?;
        if !queue.active || !schedule::is_active(&queue.schedule, now) {
            return Err(QueueError::closed("queue is not accepting admissions right now")
                .with_tenant(tenant_id)
                .with_entity(queue_id));
        }
        Ok(queue)
    }

    async fn recompute_and_persist(&self, queue_id: Id) -> Result<(), QueueError> {
        let waiting = self.sessions.get_waiting_by_queue_ordered(queue_id).await?;
        let ranked = recompute_positions(waiting);
        for session in &ranked {
            self.persist_transition(session.clone()).await?;
            let cache_key = keys::queue_user_position(queue_id, &session.user_identifier);
            let _ = self
                .cache
                .set_json(&cache_key, &session.position, Some(StdDuration::from_secs(60)))
                .await;
        }
        Ok(())
    }

    /// Persists a status/position mutation with bounded exponential-backoff
    /// retry on optimistic-concurrency conflicts (spec.md §4.8.7).
    async fn persist_transition(&self, session: UserSession) -> Result<UserSession, QueueError> {
        RetryIf::spawn(
            retry_strategy(),
            || {
                let sessions = Arc::clone(&self.sessions);
                let session = session.clone();
                async move { sessions.update(&session).await }
            },
            |err: &QueueError| is_conflict(err),
        )
        .await
        .map_err(|err| match err.kind {
            ErrorKind::Conflict => QueueError::transient(format!(
                "session update conflicted after {MAX_WRITE_RETRIES} retries: {err}"
            )),
            _ => err,
        })
    }

    async fn publish(&self, tenant_id: Id, kind: EventKind, session: &UserSession) {
        let payload = serde_json::json!({
            "session_id": session.session_id,
            "queue_id": session.queue_id,
            "user_identifier": session.user_identifier,
            "status": session.status,
            "position": session.position,
        });
        self.events.publish(DomainEvent::new(tenant_id, kind, payload)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::queue::domain::model::Schedule;
    use crate::domains::queue::domain::ordering;
    use async_trait::async_trait;
    use shared_cache::InMemoryKvCache;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeQueueRepository {
        queues: Mutex<HashMap<Id, Queue>>,
    }

    impl FakeQueueRepository {
        fn with(queues: Vec<Queue>) -> Self {
            Self { queues: Mutex::new(queues.into_iter().map(|q| (q.queue_id, q)).collect()) }
        }
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
                q.deleted_at = Some(Utc::now());
            }
            Ok(())
        }

        async fn advance_last_release_at(
            &self,
            queue_id: Id,
            new_last_release_at: DateTime<Utc>,
            expected_last_release_at: Option<DateTime<Utc>>,
        ) -> Result<(), QueueError> {
            let mut queues = self.queues.lock().unwrap();
            let queue = queues.get_mut(&queue_id).ok_or_else(|| QueueError::not_found("queue not found"))?;
            if queue.last_release_at != expected_last_release_at {
                return Err(QueueError::conflict("last_release_at changed concurrently"));
            }
            queue.last_release_at = Some(new_last_release_at);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeSessionRepository {
        sessions: Mutex<HashMap<Id, UserSession>>,
    }

    #[async_trait]
    impl SessionRepository for FakeSessionRepository {
        async fn get_by_id(&self, tenant_id: Id, session_id: Id) -> Result<Option<UserSession>, QueueError> {
            Ok(self.sessions.lock().unwrap().get(&session_id).filter(|s| s.tenant_id == tenant_id).cloned())
        }

        async fn get_active_by_identifier(
            &self,
            queue_id: Id,
            user_identifier: &str,
        ) -> Result<Option<UserSession>, QueueError> {
            Ok(self
                .sessions
                .lock()
                .unwrap()
                .values()
                .find(|s| s.queue_id == queue_id && s.user_identifier == user_identifier && !s.status.is_terminal())
                .cloned())
        }

        async fn get_waiting_by_queue_ordered(&self, queue_id: Id) -> Result<Vec<UserSession>, QueueError> {
            let mut waiting: Vec<_> = self
                .sessions
                .lock()
                .unwrap()
                .values()
                .filter(|s| s.queue_id == queue_id && s.status == SessionStatus::Waiting)
                .cloned()
                .collect();
            waiting.sort_by(ordering::compare);
            Ok(waiting)
        }

        async fn count_by_status(&self, queue_id: Id, status: SessionStatus) -> Result<u64, QueueError> {
            Ok(self
                .sessions
                .lock()
                .unwrap()
                .values()
                .filter(|s| s.queue_id == queue_id && s.status == status)
                .count() as u64)
        }

        async fn sessions_in_range(
            &self,
            _tenant_id: Id,
            queue_id: Id,
            range: shared_types::TimeRange,
        ) -> Result<Vec<UserSession>, QueueError> {
            Ok(self
                .sessions
                .lock()
                .unwrap()
                .values()
                .filter(|s| s.queue_id == queue_id && range.contains(s.enqueued_at))
                .cloned()
                .collect())
        }

        async fn add(&self, session: &UserSession) -> Result<UserSession, QueueError> {
            self.sessions.lock().unwrap().insert(session.session_id, session.clone());
            Ok(session.clone())
        }

        async fn update(&self, session: &UserSession) -> Result<UserSession, QueueError> {
            let mut sessions = self.sessions.lock().unwrap();
            let stored = sessions.get(&session.session_id).ok_or_else(|| QueueError::not_found("session not found"))?;
            if stored.version != session.version {
                return Err(QueueError::conflict("session version changed concurrently"));
            }
            let mut next = session.clone();
            next.version += 1;
            sessions.insert(session.session_id, next.clone());
            Ok(next)
        }
    }

    fn open_queue(tenant_id: Id, rate_per_minute: u32) -> Queue {
        Queue {
            queue_id: Id::new_v4(),
            tenant_id,
            name: "support".into(),
            description: None,
            max_concurrent_users: 100,
            release_rate_per_minute: rate_per_minute,
            active: true,
            last_release_at: None,
            schedule: Schedule::default(),
            max_burst: Queue::default_max_burst(rate_per_minute),
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn engine(queue_repo: FakeQueueRepository) -> (QueueEngine, Arc<FakeSessionRepository>) {
        let sessions = Arc::new(FakeSessionRepository::default());
        let engine = QueueEngine::new(
            Arc::new(queue_repo),
            sessions.clone(),
            Arc::new(InMemoryKvCache::new()),
            Arc::new(EventBus::new()),
            QueueEngineConfig { strict_capacity_mode: false },
        );
        (engine, sessions)
    }

    #[tokio::test]
    async fn priority_overrides_fifo() {
        let tenant_id = Id::new_v4();
        let queue = open_queue(tenant_id, 6);
        let queue_id = queue.queue_id;
        let (engine, _) = engine(FakeQueueRepository::with(vec![queue]));

        let t0 = Utc::now();
        let alice = engine
            .enqueue(tenant_id, queue_id, "alice", Priority::Standard, Value::Null, t0)
            .await
            .unwrap();
        let bob = engine
            .enqueue(tenant_id, queue_id, "bob", Priority::VIP, Value::Null, t0 + chrono::Duration::seconds(1))
            .await
            .unwrap();

        assert_eq!(bob.position, 1);
        assert_eq!(alice.position, 2);
    }

    #[tokio::test]
    async fn enqueue_is_idempotent() {
        let tenant_id = Id::new_v4();
        let queue = open_queue(tenant_id, 6);
        let queue_id = queue.queue_id;
        let (engine, _) = engine(FakeQueueRepository::with(vec![queue]));

        let now = Utc::now();
        let first = engine.enqueue(tenant_id, queue_id, "u1", Priority::Standard, Value::Null, now).await.unwrap();
        let second = engine.enqueue(tenant_id, queue_id, "u1", Priority::Standard, Value::Null, now).await.unwrap();

        assert_eq!(first.session_id, second.session_id);
        assert_eq!(first.position, second.position);
    }

    #[tokio::test]
    async fn drop_closes_the_gap() {
        let tenant_id = Id::new_v4();
        let queue = open_queue(tenant_id, 6);
        let queue_id = queue.queue_id;
        let (engine, _) = engine(FakeQueueRepository::with(vec![queue]));

        let now = Utc::now();
        let u1 = engine.enqueue(tenant_id, queue_id, "u1", Priority::Standard, Value::Null, now).await.unwrap();
        let u2 = engine
            .enqueue(tenant_id, queue_id, "u2", Priority::Standard, Value::Null, now + chrono::Duration::seconds(1))
            .await
            .unwrap();
        let u3 = engine
            .enqueue(tenant_id, queue_id, "u3", Priority::Standard, Value::Null, now + chrono::Duration::seconds(2))
            .await
            .unwrap();
        assert_eq!((u1.position, u2.position, u3.position), (1, 2, 3));

        engine.drop_session(tenant_id, queue_id, u2.session_id, DropReason::User, now).await.unwrap();

        let u1_after = engine.position(queue_id, "u1").await.unwrap().unwrap();
        let u3_after = engine.position(queue_id, "u3").await.unwrap().unwrap();
        assert_eq!(u1_after.position, 1);
        assert_eq!(u3_after.position, 2);
    }

    #[tokio::test]
    async fn drop_is_idempotent_once_terminal() {
        let tenant_id = Id::new_v4();
        let queue = open_queue(tenant_id, 6);
        let queue_id = queue.queue_id;
        let (engine, _) = engine(FakeQueueRepository::with(vec![queue]));

        let now = Utc::now();
        let u1 = engine.enqueue(tenant_id, queue_id, "u1", Priority::Standard, Value::Null, now).await.unwrap();
        engine.drop_session(tenant_id, queue_id, u1.session_id, DropReason::User, now).await.unwrap();
        // Second drop on an already-terminal session must be a silent no-op.
        engine.drop_session(tenant_id, queue_id, u1.session_id, DropReason::User, now).await.unwrap();
    }

    #[tokio::test]
    async fn closed_schedule_rejects_enqueue() {
        let tenant_id = Id::new_v4();
        let mut queue = open_queue(tenant_id, 6);
        queue.active = false;
        let queue_id = queue.queue_id;
        let (engine, _) = engine(FakeQueueRepository::with(vec![queue]));

        let err = engine
            .enqueue(tenant_id, queue_id, "u1", Priority::Standard, Value::Null, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Closed);
    }

    #[tokio::test]
    async fn rate_zero_releases_nothing() {
        let tenant_id = Id::new_v4();
        let queue = open_queue(tenant_id, 0);
        let (engine, sessions) = engine(FakeQueueRepository::with(vec![queue.clone()]));

        let now = Utc::now();
        engine.enqueue(tenant_id, queue.queue_id, "u1", Priority::Standard, Value::Null, now).await.unwrap();

        let released = engine.release_tick(&queue, now + chrono::Duration::hours(1)).await.unwrap();
        assert!(released.is_empty());
        assert_eq!(sessions.sessions.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn a_queue_with_no_last_release_at_releases_off_its_created_at() {
        let tenant_id = Id::new_v4();
        let mut queue = open_queue(tenant_id, 60);
        queue.created_at = Utc::now() - chrono::Duration::seconds(5);
        let queue_id = queue.queue_id;
        let (engine, _) = engine(FakeQueueRepository::with(vec![queue.clone()]));

        engine.enqueue(tenant_id, queue_id, "u1", Priority::Standard, Value::Null, queue.created_at).await.unwrap();

        let released = engine.release_tick(&queue, Utc::now()).await.unwrap();
        assert_eq!(released.len(), 1);
    }

    #[tokio::test]
    async fn release_tick_respects_priority_order_and_max_burst() {
        let tenant_id = Id::new_v4();
        let mut queue = open_queue(tenant_id, 60);
        queue.max_burst = 10;
        queue.last_release_at = Some(Utc::now());
        let queue_id = queue.queue_id;
        let (engine, _) = engine(FakeQueueRepository::with(vec![queue.clone()]));

        let t0 = queue.last_release_at.unwrap();
        let alice = engine.enqueue(tenant_id, queue_id, "alice", Priority::Standard, Value::Null, t0).await.unwrap();
        let bob = engine
            .enqueue(tenant_id, queue_id, "bob", Priority::VIP, Value::Null, t0 + chrono::Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(bob.position, 1);
        assert_eq!(alice.position, 2);

        // 60/min for 10s of elapsed time yields an allowance of exactly 10.
        let tick_at = t0 + chrono::Duration::seconds(10);
        let released = engine.release_tick(&queue, tick_at).await.unwrap();

        assert_eq!(released.len(), 2);
        assert_eq!(released[0].session_id, bob.session_id);
        assert_eq!(released[1].session_id, alice.session_id);
    }
}
