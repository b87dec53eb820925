//! Task-queue implementations. The production queue defers work onto the
//! Tokio runtime; tasks fire after their delay regardless of later
//! mutations (idempotent effects make redundant firing harmless, merely
//! wasteful), and nothing supports cancellation.

use async_trait::async_trait;
use events::{QueuedTask, TaskQueue, TaskRunner};
use log::*;
use std::sync::Arc;
use std::time::Duration;

/// In-process queue: each scheduled task becomes a detached Tokio task that
/// sleeps its delay and runs. No ordering guarantee between tasks.
pub struct TokioTaskQueue {
    runner: Arc<dyn TaskRunner>,
}

impl TokioTaskQueue {
    pub fn new(runner: Arc<dyn TaskRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl TaskQueue for TokioTaskQueue {
    async fn schedule(&self, task: QueuedTask, delay: Duration) {
        debug!(
            "Deferring task for {} user(s) by {:?}",
            task.user_count(),
            delay
        );
        let runner = self.runner.clone();
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            runner.run(task).await;
        });
    }
}

/// Captures scheduled tasks instead of running them, for assertions.
#[cfg(any(test, feature = "mock"))]
pub struct RecordingQueue {
    pub scheduled: std::sync::Mutex<Vec<(QueuedTask, Duration)>>,
}

#[cfg(any(test, feature = "mock"))]
impl RecordingQueue {
    pub fn new() -> Self {
        Self {
            scheduled: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn tasks(&self) -> Vec<(QueuedTask, Duration)> {
        self.scheduled.lock().unwrap().clone()
    }
}

#[cfg(any(test, feature = "mock"))]
impl Default for RecordingQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "mock"))]
#[async_trait]
impl TaskQueue for RecordingQueue {
    async fn schedule(&self, task: QueuedTask, delay: Duration) {
        self.scheduled.lock().unwrap().push((task, delay));
    }
}
