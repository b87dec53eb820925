//! Worker-side dispatch of queued tasks. One runner instance serves the
//! whole queue; failures are contained per task so a bad batch never takes
//! down its siblings.

use crate::invalidation::InvalidationWorker;
use crate::notifier::NotificationDelivery;
use async_trait::async_trait;
use events::{QueuedTask, TaskRunner};
use log::*;
use std::sync::Arc;

pub struct FanoutRunner {
    invalidation: InvalidationWorker,
    delivery: Arc<dyn NotificationDelivery>,
}

impl FanoutRunner {
    pub fn new(invalidation: InvalidationWorker, delivery: Arc<dyn NotificationDelivery>) -> Self {
        Self {
            invalidation,
            delivery,
        }
    }
}

#[async_trait]
impl TaskRunner for FanoutRunner {
    async fn run(&self, task: QueuedTask) {
        match task {
            QueuedTask::CacheInvalidation(task) => self.invalidation.run(&task).await,
            QueuedTask::Notification(batch) => {
                if let Err(err) = self
                    .delivery
                    .send_batch(&batch.user_ids, &batch.payload)
                    .await
                {
                    // Best-effort: no retry, and no backstop equivalent to
                    // the cache TTL. The batch is gone.
                    error!(
                        "Notification batch '{}' for {} recipient(s) failed: {err}",
                        batch.payload.title,
                        batch.user_ids.len()
                    );
                }
            }
        }
    }
}
