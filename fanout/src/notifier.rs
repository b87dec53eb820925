//! Recipient fan-out notifier: decides who gets which message for a
//! mutation and defers chunked delivery through the task queue.
//!
//! Best-effort by design: each batch is attempted once, a failed batch is
//! logged and does not abort its siblings, and there is no at-least-once
//! guarantee for notifications (unlike cache entries, they have no TTL
//! backstop). A small pause between batches respects downstream delivery
//! rate limits.

use crate::message;
use async_trait::async_trait;
use domain::diff::{priority_for, ChangeSet};
use domain::scheduling::NotificationScheduler;
use entity::{ConceptStatus, Id, PaymentConcept};
use events::{NotificationBatch, NotificationPayload, QueuedTask, TaskQueue};
use log::*;
use std::collections::BTreeSet;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Failure from the delivery provider for one batch.
#[derive(Debug)]
pub struct DeliveryError {
    pub message: String,
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Delivery Error: {}", self.message)
    }
}

impl StdError for DeliveryError {}

/// Downstream notification delivery (push provider, mailer, ...).
#[async_trait]
pub trait NotificationDelivery: Send + Sync {
    async fn send_batch(
        &self,
        user_ids: &[Id],
        payload: &NotificationPayload,
    ) -> Result<(), DeliveryError>;
}

pub struct Notifier {
    queue: Arc<dyn TaskQueue>,
    chunk_size: usize,
    batch_pause: Duration,
}

impl Notifier {
    pub fn new(queue: Arc<dyn TaskQueue>, config: &service::Config) -> Self {
        Self {
            queue,
            chunk_size: config.notification_chunk_size.max(1),
            batch_pause: config.notification_batch_pause(),
        }
    }

    /// Chunks one audience slice and enqueues its batches, spacing each
    /// batch one pause further out than the previous one.
    async fn dispatch(&self, user_ids: Vec<Id>, payload: NotificationPayload) {
        if user_ids.is_empty() {
            return;
        }
        debug!(
            "Dispatching '{}' to {} recipient(s) as {:?}",
            payload.title,
            user_ids.len(),
            payload.audience_kind
        );
        for (index, chunk) in user_ids.chunks(self.chunk_size).enumerate() {
            let batch = NotificationBatch {
                user_ids: chunk.to_vec(),
                payload: payload.clone(),
            };
            let delay = self.batch_pause * index as u32;
            self.queue
                .schedule(QueuedTask::Notification(batch), delay)
                .await;
        }
    }
}

#[async_trait]
impl NotificationScheduler for Notifier {
    async fn schedule_change(
        &self,
        change_set: &ChangeSet,
        audience: &BTreeSet<Id>,
        concept: &PaymentConcept,
    ) {
        let (added, removed) = match change_set.exceptions_delta() {
            Some((added, removed)) => (added.clone(), removed.clone()),
            None => (BTreeSet::new(), BTreeSet::new()),
        };

        let mut newly_excluded = Vec::new();
        let mut exception_lifted = Vec::new();
        let mut regular = Vec::new();
        for user_id in audience {
            if added.contains(user_id) {
                newly_excluded.push(*user_id);
            } else if removed.contains(user_id) {
                exception_lifted.push(*user_id);
            } else {
                regular.push(*user_id);
            }
        }

        info!(
            "Notifying concept '{}' change: {} regular, {} excluded, {} reinstated",
            concept.name,
            regular.len(),
            newly_excluded.len(),
            exception_lifted.len()
        );

        let priority = priority_for(change_set);
        self.dispatch(regular, message::for_change(change_set, concept))
            .await;
        self.dispatch(newly_excluded, message::excluded(concept, priority))
            .await;
        self.dispatch(exception_lifted, message::reinstated(concept, priority))
            .await;
    }

    async fn schedule_created(&self, audience: &BTreeSet<Id>, concept: &PaymentConcept) {
        self.dispatch(audience.iter().copied().collect(), message::created(concept))
            .await;
    }

    async fn schedule_status_change(
        &self,
        from: ConceptStatus,
        to: ConceptStatus,
        audience: &BTreeSet<Id>,
        concept: &PaymentConcept,
    ) {
        self.dispatch(
            audience.iter().copied().collect(),
            message::status_changed(from, to, concept),
        )
        .await;
    }
}
