//! Queued-task infrastructure for the payments platform.
//!
//! This crate defines the payloads that travel through the background task
//! queue (cache invalidation chunks, notification batches) and the traits
//! for scheduling and running them.
//!
//! This crate has no dependencies on internal crates (entity, domain, etc.),
//! avoiding circular dependencies. Concept statuses travel as their wire
//! strings for the same reason.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// A type alias that represents any Entity's internal id field data type.
/// This matches the definition in the entity crate to maintain compatibility.
pub type Id = Uuid;

/// Why a batch of per-user caches is being invalidated. Drives which derived
/// caches get cleared alongside the payment-summary entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvalidationReason {
    /// A concept moved between statuses; statuses are carried as their wire
    /// strings (`active`, `finalized`, `disabled`, `deleted`).
    StatusTransition { from: String, to: String },
    /// The targeting mode itself changed.
    TargetingChange,
    /// Relation or exception sets changed under the same targeting mode.
    RelationChange,
    /// Scalar fields changed (amount, dates, ...).
    FieldChange,
    /// A concept was created and its audience now owes it.
    ConceptCreated,
}

/// One chunk of cache-invalidation work. At-least-once delivery; the effect
/// is idempotent, so redundant firing is harmless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheInvalidationTask {
    pub user_ids: Vec<Id>,
    pub reason: InvalidationReason,
}

/// Client-side ordering/highlighting hint; no backend behavioral difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
}

/// Which slice of the audience a notification batch addresses. Recipients
/// newly added to a concept's exception set get a different message than
/// the rest of the audience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudienceKind {
    Regular,
    NewlyExcluded,
    ExceptionLifted,
}

/// The message delivered to every recipient of one notification batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub concept_id: Id,
    pub concept_name: String,
    pub title: String,
    pub body: String,
    pub priority: Priority,
    pub audience_kind: AudienceKind,
}

/// One chunk of notification fan-out. Best-effort: a dropped batch is not
/// redelivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationBatch {
    pub user_ids: Vec<Id>,
    pub payload: NotificationPayload,
}

/// Everything that can be deferred onto the background queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum QueuedTask {
    CacheInvalidation(CacheInvalidationTask),
    Notification(NotificationBatch),
}

impl QueuedTask {
    /// Number of users the task touches; used for logging.
    pub fn user_count(&self) -> usize {
        match self {
            QueuedTask::CacheInvalidation(task) => task.user_ids.len(),
            QueuedTask::Notification(batch) => batch.user_ids.len(),
        }
    }
}

/// Deferred-work scheduler. Implementations decide what "later" means
/// (an in-process Tokio timer, an external queue, a test recorder); callers
/// only promise that the task is safe to run at least once.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn schedule(&self, task: QueuedTask, delay: Duration);
}

/// Worker-side execution of a queued task. Failures must be handled (logged)
/// inside `run`; the queue does not retry.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn run(&self, task: QueuedTask);
}
