//! Seams to the asynchronous side: cache invalidation and notification
//! fan-out are scheduled through these traits so the use cases stay testable
//! without a real queue. The `fanout` crate provides the production
//! implementations.
//!
//! Scheduling is fire-and-forget from the caller's perspective: failures
//! past this point are the async side's problem (logged, never propagated
//! back to the originating request).

use crate::diff::ChangeSet;
use async_trait::async_trait;
use entity::{ConceptStatus, Id, PaymentConcept};
use events::InvalidationReason;
use std::collections::BTreeSet;

/// Defers per-user cache invalidation for the given audience.
#[async_trait]
pub trait InvalidationScheduler: Send + Sync {
    async fn schedule_invalidation(&self, user_ids: &BTreeSet<Id>, reason: InvalidationReason);
}

/// Defers notification fan-out to the given audience.
#[async_trait]
pub trait NotificationScheduler: Send + Sync {
    /// Notify about a mutation described by a change-set. The audience is
    /// already the right one for the change (union vs. current).
    async fn schedule_change(
        &self,
        change_set: &ChangeSet,
        audience: &BTreeSet<Id>,
        concept: &PaymentConcept,
    );

    /// Notify a freshly created concept's audience.
    async fn schedule_created(&self, audience: &BTreeSet<Id>, concept: &PaymentConcept);

    /// Notify the audience about a status transition.
    async fn schedule_status_change(
        &self,
        from: ConceptStatus,
        to: ConceptStatus,
        audience: &BTreeSet<Id>,
        concept: &PaymentConcept,
    );
}
