//! School-payments platform core: payment-concept lifecycle, audience
//! resolution, cache invalidation, and recipient notification fan-out.
//!
//! The workspace splits into `entity` (plain domain types), `entity_api`
//! (repository seams), `domain` (mutation flows and change diffing),
//! `fanout` (the asynchronous delivery side), and `service` (configuration
//! and logging). This facade re-exports the pieces an embedding application
//! needs and wires them together.

pub use domain::audience::resolve as resolve_audience;
pub use domain::diff::{diff as diff_concepts, ChangeRecord, ChangeSet, DominantChange};
pub use domain::error::{DomainErrorKind, Error};
pub use domain::payment_concept::{
    create, update_exceptions, update_fields, update_relations, update_status, ConceptDeps,
};
pub use domain::scheduling::{InvalidationScheduler, NotificationScheduler};
pub use domain::transition::{allowed_transitions, can_transition, guard_transition};
pub use domain::{
    AppliesTo, ConceptFieldPatch, ConceptStatus, Id, InvalidationReason, NewPaymentConcept,
    PaymentConcept, Priority, TargetingUpdate,
};
pub use entity_api::{ConceptRepository, RecipientRepository};
pub use fanout::{CacheBackend, FixedJitter, Jitter, MemoryCache, NotificationDelivery};
pub use service::{logging::Logger, Config};

use fanout::{Coordinator, FanoutRunner, InvalidationWorker, Notifier, RandomJitter, TokioTaskQueue};
use std::sync::Arc;

/// Builds the production dependency graph: one in-process Tokio task queue
/// whose runner serves both cache invalidation (against `cache`) and
/// notification delivery (through `delivery`).
pub fn build_platform(
    config: &Config,
    concepts: Arc<dyn ConceptRepository>,
    recipients: Arc<dyn RecipientRepository>,
    cache: Arc<dyn CacheBackend>,
    delivery: Arc<dyn NotificationDelivery>,
) -> ConceptDeps {
    let runner = FanoutRunner::new(InvalidationWorker::new(cache, config), delivery);
    let queue = Arc::new(TokioTaskQueue::new(Arc::new(runner)));

    let (jitter_min, jitter_max) = config.invalidation_jitter_window();
    let coordinator = Coordinator::new(
        queue.clone(),
        Arc::new(RandomJitter::new(jitter_min, jitter_max)),
        config,
    );
    let notifier = Notifier::new(queue, config);

    ConceptDeps {
        concepts,
        recipients,
        invalidation: Arc::new(coordinator),
        notifications: Arc::new(notifier),
    }
}
