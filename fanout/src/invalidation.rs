//! Cache invalidation coordinator: chunks an affected audience into
//! fixed-size batches and defers each batch with a randomized delay, so a
//! mutation touching thousands of users never slams the cache backend in
//! one burst.
//!
//! Fire-and-forget for the caller. A failed chunk is logged and does not
//! block or retry sibling chunks; the stale entries it leaves behind expire
//! by TTL.

use crate::cache::{user_overdue_key, user_summary_prefix, CacheBackend};
use crate::jitter::Jitter;
use async_trait::async_trait;
use domain::scheduling::InvalidationScheduler;
use entity::Id;
use events::{CacheInvalidationTask, InvalidationReason, QueuedTask, TaskQueue};
use log::*;
use service::Config;
use std::collections::BTreeSet;
use std::sync::Arc;

pub struct Coordinator {
    queue: Arc<dyn TaskQueue>,
    jitter: Arc<dyn Jitter>,
    chunk_size: usize,
}

impl Coordinator {
    pub fn new(queue: Arc<dyn TaskQueue>, jitter: Arc<dyn Jitter>, config: &Config) -> Self {
        Self {
            queue,
            jitter,
            // A zero chunk size would loop forever; treat it as 1.
            chunk_size: config.invalidation_chunk_size.max(1),
        }
    }

    /// Splits the audience into chunks and enqueues one task per chunk,
    /// each with its own jittered delay.
    pub async fn schedule(&self, user_ids: &BTreeSet<Id>, reason: InvalidationReason) {
        if user_ids.is_empty() {
            return;
        }

        let ids: Vec<Id> = user_ids.iter().copied().collect();
        let chunk_count = ids.len().div_ceil(self.chunk_size);
        info!(
            "Scheduling cache invalidation for {} user(s) in {} chunk(s), reason {:?}",
            ids.len(),
            chunk_count,
            reason
        );

        for chunk in ids.chunks(self.chunk_size) {
            let task = CacheInvalidationTask {
                user_ids: chunk.to_vec(),
                reason: reason.clone(),
            };
            self.queue
                .schedule(QueuedTask::CacheInvalidation(task), self.jitter.delay())
                .await;
        }
    }
}

#[async_trait]
impl InvalidationScheduler for Coordinator {
    async fn schedule_invalidation(&self, user_ids: &BTreeSet<Id>, reason: InvalidationReason) {
        self.schedule(user_ids, reason).await;
    }
}

/// Worker side: executes one invalidation chunk against the cache backend.
pub struct InvalidationWorker {
    cache: Arc<dyn CacheBackend>,
    key_prefix: String,
}

impl InvalidationWorker {
    pub fn new(cache: Arc<dyn CacheBackend>, config: &Config) -> Self {
        Self {
            cache,
            key_prefix: config.cache_key_prefix.clone(),
        }
    }

    /// Clears every user's payment-summary namespace, plus the derived
    /// overdue cache when the concept changed status. Idempotent; a failure
    /// for one user is logged and does not stop the rest of the chunk.
    pub async fn run(&self, task: &CacheInvalidationTask) {
        let is_status_transition =
            matches!(task.reason, InvalidationReason::StatusTransition { .. });

        let mut failed = 0usize;
        for user_id in &task.user_ids {
            let prefix = user_summary_prefix(&self.key_prefix, *user_id);
            if let Err(err) = self.cache.clear_prefix(&prefix).await {
                failed += 1;
                error!("CRITICAL: failed to invalidate {prefix}: {err}; entry expires by TTL");
                continue;
            }
            if is_status_transition {
                let overdue = user_overdue_key(*user_id);
                if let Err(err) = self.cache.clear(&overdue).await {
                    failed += 1;
                    error!("CRITICAL: failed to invalidate {overdue}: {err}; entry expires by TTL");
                }
            }
        }

        if failed == 0 {
            debug!(
                "Invalidated summaries for {} user(s), reason {:?}",
                task.user_ids.len(),
                task.reason
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::jitter::FixedJitter;
    use crate::queue::RecordingQueue;
    use serde_json::json;
    use std::time::Duration;
    use uuid::Uuid;

    fn config() -> Config {
        use clap::Parser;
        Config::try_parse_from(["pagos_platform_rs"]).unwrap()
    }

    fn audience(n: u128) -> BTreeSet<Id> {
        (0..n).map(Uuid::from_u128).collect()
    }

    #[tokio::test]
    async fn test_chunks_1234_ids_into_three_tasks() {
        let queue = Arc::new(RecordingQueue::new());
        let coordinator = Coordinator::new(
            queue.clone(),
            Arc::new(FixedJitter(Duration::from_secs(2))),
            &config(),
        );

        coordinator
            .schedule(&audience(1234), InvalidationReason::RelationChange)
            .await;

        let tasks = queue.tasks();
        assert_eq!(tasks.len(), 3);
        let sizes: Vec<usize> = tasks.iter().map(|(task, _)| task.user_count()).collect();
        assert_eq!(sizes, vec![500, 500, 234]);
        for (_, delay) in &tasks {
            assert_eq!(*delay, Duration::from_secs(2));
        }
    }

    #[tokio::test]
    async fn test_empty_audience_schedules_nothing() {
        let queue = Arc::new(RecordingQueue::new());
        let coordinator = Coordinator::new(
            queue.clone(),
            Arc::new(FixedJitter(Duration::ZERO)),
            &config(),
        );

        coordinator
            .schedule(&BTreeSet::new(), InvalidationReason::FieldChange)
            .await;
        assert!(queue.tasks().is_empty());
    }

    #[tokio::test]
    async fn test_worker_clears_summary_namespace() {
        let user = Uuid::from_u128(1);
        let other = Uuid::from_u128(2);
        let cache = Arc::new(MemoryCache::new(Duration::from_secs(60)));
        cache.put(format!("payment_summary:{user}:pending"), json!("150.00"));
        cache.put(format!("payment_summary:{user}:history"), json!([]));
        cache.put(format!("payment_summary:{other}:pending"), json!("80.00"));

        let worker = InvalidationWorker::new(cache.clone(), &config());
        worker
            .run(&CacheInvalidationTask {
                user_ids: vec![user],
                reason: InvalidationReason::FieldChange,
            })
            .await;

        assert!(cache.get(&format!("payment_summary:{user}:pending")).is_none());
        assert!(cache.get(&format!("payment_summary:{user}:history")).is_none());
        assert!(cache.get(&format!("payment_summary:{other}:pending")).is_some());
    }

    #[tokio::test]
    async fn test_status_transition_also_clears_overdue_cache() {
        let user = Uuid::from_u128(1);
        let cache = Arc::new(MemoryCache::new(Duration::from_secs(60)));
        cache.put(user_overdue_key(user), json!(["colegiatura"]));

        let worker = InvalidationWorker::new(cache.clone(), &config());

        // A relation change leaves the derived cache alone.
        worker
            .run(&CacheInvalidationTask {
                user_ids: vec![user],
                reason: InvalidationReason::RelationChange,
            })
            .await;
        assert!(cache.get(&user_overdue_key(user)).is_some());

        worker
            .run(&CacheInvalidationTask {
                user_ids: vec![user],
                reason: InvalidationReason::StatusTransition {
                    from: "active".to_string(),
                    to: "disabled".to_string(),
                },
            })
            .await;
        assert!(cache.get(&user_overdue_key(user)).is_none());
    }

    #[tokio::test]
    async fn test_double_invalidation_is_a_safe_noop() {
        let user = Uuid::from_u128(1);
        let cache = Arc::new(MemoryCache::new(Duration::from_secs(60)));
        cache.put(format!("payment_summary:{user}:paid"), json!("0.00"));

        let worker = InvalidationWorker::new(cache.clone(), &config());
        let task = CacheInvalidationTask {
            user_ids: vec![user],
            reason: InvalidationReason::FieldChange,
        };
        worker.run(&task).await;
        worker.run(&task).await;

        assert!(cache.get(&format!("payment_summary:{user}:paid")).is_none());
    }
}
