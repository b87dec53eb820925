//! Payment-concept mutation flows.
//!
//! Each flow brackets the persistence write with audience resolution: the
//! "before" audience is captured from the pre-write snapshot, the "after"
//! audience from the post-write one, both inside the caller's transactional
//! scope. The resulting diff plus the right audience slice is then handed to
//! the asynchronous cache-invalidation and notification schedulers.
//!
//! Every rejection here (bad transition, missing targeting data, empty
//! audience) happens before the write and before anything is scheduled.

use crate::audience::{self, audience_for};
use crate::diff::{diff, ChangeRecord, ChangeSet};
use crate::error::{Error, ValidationErrorKind};
use crate::scheduling::{InvalidationScheduler, NotificationScheduler};
use crate::transition::guard_transition;
use entity::{
    ConceptFieldPatch, ConceptStatus, Id, NewPaymentConcept, PaymentConcept, TargetingUpdate,
};
use entity_api::{ConceptRepository, RecipientRepository};
use events::InvalidationReason;
use log::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

/// Collaborators injected into every concept flow.
#[derive(Clone)]
pub struct ConceptDeps {
    pub concepts: Arc<dyn ConceptRepository>,
    pub recipients: Arc<dyn RecipientRepository>,
    pub invalidation: Arc<dyn InvalidationScheduler>,
    pub notifications: Arc<dyn NotificationScheduler>,
}

/// Creates a concept. Rejected outright when the targeting rule is invalid
/// or resolves to nobody; nothing is persisted or scheduled in that case.
pub async fn create(
    deps: &ConceptDeps,
    new_concept: NewPaymentConcept,
) -> Result<PaymentConcept, Error> {
    let concept = new_concept.into_concept(Uuid::new_v4());
    concept.validate_targeting()?;

    let audience = audience::resolve(deps.recipients.as_ref(), &concept).await?;
    if audience.is_empty() {
        warn!(
            "Rejecting creation of concept '{}': targeting {} resolves to nobody",
            concept.name, concept.applies_to
        );
        return Err(Error::validation(ValidationErrorKind::RecipientsNotFound));
    }

    let created = deps.concepts.create(concept).await?;
    info!(
        "Created payment concept '{}' ({}) for {} recipients",
        created.name,
        created.applies_to,
        audience.len()
    );

    deps.invalidation
        .schedule_invalidation(&audience, InvalidationReason::ConceptCreated)
        .await;
    deps.notifications
        .schedule_created(&audience, &created)
        .await;

    Ok(created)
}

/// Updates scalar fields. Only the current audience is notified; former
/// recipients are unaffected by a name or amount change.
pub async fn update_fields(
    deps: &ConceptDeps,
    id: Id,
    patch: ConceptFieldPatch,
) -> Result<PaymentConcept, Error> {
    let old = deps.concepts.find_by_id(id).await?;
    guard_updatable(&old)?;

    if patch.is_empty() {
        return Ok(old);
    }

    let new = deps.concepts.update_fields(id, patch).await?;
    let change_set = diff(&old, &new);
    if change_set.is_empty() {
        return Ok(new);
    }

    let audience = audience::resolve(deps.recipients.as_ref(), &new).await?;
    debug!(
        "Concept {} field update: {} change(s), {} recipients",
        id,
        change_set.len(),
        audience.len()
    );

    deps.invalidation
        .schedule_invalidation(&audience, InvalidationReason::FieldChange)
        .await;
    deps.notifications
        .schedule_change(&change_set, &audience, &new)
        .await;

    Ok(new)
}

/// Replaces the targeting rule (mode, relation sets, exceptions). Both the
/// former and the new audience must learn about the change, so the union is
/// notified and invalidated.
pub async fn update_relations(
    deps: &ConceptDeps,
    id: Id,
    update: TargetingUpdate,
) -> Result<PaymentConcept, Error> {
    let old = deps.concepts.find_by_id(id).await?;
    guard_updatable(&old)?;

    // Preview the post-write snapshot so an empty audience blocks the
    // mutation entirely, before the store is touched.
    let mut candidate = old.clone();
    let cleared_exceptions = update.apply_to(&mut candidate);
    candidate.validate_targeting()?;
    if cleared_exceptions {
        warn!(
            "Concept {}: dropping {} exception(s), explicit student lists take none",
            id,
            old.exception_ids.len()
        );
    }

    let old_audience = audience::resolve(deps.recipients.as_ref(), &old).await?;
    let new_audience = audience::resolve(deps.recipients.as_ref(), &candidate).await?;
    if new_audience.is_empty() {
        warn!(
            "Rejecting targeting update of concept {}: {} would resolve to nobody",
            id, candidate.applies_to
        );
        return Err(Error::validation(ValidationErrorKind::RecipientsNotFound));
    }

    let new = deps.concepts.update_targeting(id, update).await?;
    let change_set = diff(&old, &new);
    if change_set.is_empty() {
        return Ok(new);
    }

    let audience = audience_for(&change_set, &old_audience, &new_audience);
    let reason = relation_reason(&change_set);
    info!(
        "Concept {} targeting update ({} -> {}): notifying {} recipients",
        id,
        old.applies_to,
        new.applies_to,
        audience.len()
    );

    deps.invalidation
        .schedule_invalidation(&audience, reason)
        .await;
    deps.notifications
        .schedule_change(&change_set, &audience, &new)
        .await;

    Ok(new)
}

/// Replaces the exception set under an unchanged targeting rule.
pub async fn update_exceptions(
    deps: &ConceptDeps,
    id: Id,
    exception_ids: BTreeSet<Id>,
) -> Result<PaymentConcept, Error> {
    let old = deps.concepts.find_by_id(id).await?;
    guard_updatable(&old)?;

    if !old.applies_to.allows_exceptions() {
        return Err(Error::validation(ValidationErrorKind::ExceptionsNotAllowed));
    }

    let mut candidate = old.clone();
    candidate.exception_ids = exception_ids.clone();
    let old_audience = audience::resolve(deps.recipients.as_ref(), &old).await?;
    let new_audience = audience::resolve(deps.recipients.as_ref(), &candidate).await?;
    if new_audience.is_empty() {
        warn!(
            "Rejecting exception update of concept {}: every recipient would be excluded",
            id
        );
        return Err(Error::validation(ValidationErrorKind::RecipientsNotFound));
    }

    let new = deps.concepts.set_exceptions(id, exception_ids).await?;
    let change_set = diff(&old, &new);
    if change_set.is_empty() {
        return Ok(new);
    }

    let audience = audience_for(&change_set, &old_audience, &new_audience);
    deps.invalidation
        .schedule_invalidation(&audience, InvalidationReason::RelationChange)
        .await;
    deps.notifications
        .schedule_change(&change_set, &audience, &new)
        .await;

    Ok(new)
}

/// Moves a concept along the status graph. The transition guard runs before
/// the write and before any side effect.
pub async fn update_status(
    deps: &ConceptDeps,
    id: Id,
    requested: ConceptStatus,
) -> Result<PaymentConcept, Error> {
    let current = deps.concepts.find_by_id(id).await?;
    guard_transition(current.status, requested)?;

    let new = deps.concepts.update_status(id, requested).await?;
    let audience = audience::resolve(deps.recipients.as_ref(), &new).await?;
    info!(
        "Concept {} status {} -> {}: invalidating {} summaries",
        id,
        current.status,
        requested,
        audience.len()
    );

    deps.invalidation
        .schedule_invalidation(
            &audience,
            InvalidationReason::StatusTransition {
                from: current.status.to_string(),
                to: requested.to_string(),
            },
        )
        .await;
    deps.notifications
        .schedule_status_change(current.status, requested, &audience, &new)
        .await;

    Ok(new)
}

fn guard_updatable(concept: &PaymentConcept) -> Result<(), Error> {
    if concept.status.is_updatable() {
        Ok(())
    } else {
        Err(Error::validation(ValidationErrorKind::ConceptNotUpdatable(
            concept.status,
        )))
    }
}

/// Invalidation reason for a relation-flavored change-set: a mode switch is
/// a targeting change, everything else a relation change.
fn relation_reason(change_set: &ChangeSet) -> InvalidationReason {
    let mode_changed = change_set
        .records()
        .iter()
        .any(|record| matches!(record, ChangeRecord::AppliesToChanged { .. }));
    if mode_changed {
        InvalidationReason::TargetingChange
    } else {
        InvalidationReason::RelationChange
    }
}
