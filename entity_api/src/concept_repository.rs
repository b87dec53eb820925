use crate::error::Error;
use async_trait::async_trait;
use entity::{ConceptFieldPatch, ConceptStatus, Id, PaymentConcept, TargetingUpdate};
use std::collections::BTreeSet;

/// Persistence contract for payment concepts. Implementations own the
/// transactional boundary; every method that mutates returns the post-write
/// snapshot so the caller can diff against the pre-write one it already holds.
#[async_trait]
pub trait ConceptRepository: Send + Sync {
    /// Returns `Error` with `RecordNotFound` when the id does not exist.
    async fn find_by_id(&self, id: Id) -> Result<PaymentConcept, Error>;

    /// Persists a new concept. The snapshot already carries its assigned id.
    async fn create(&self, concept: PaymentConcept) -> Result<PaymentConcept, Error>;

    /// Applies the scalar-field patch and returns the updated snapshot.
    async fn update_fields(
        &self,
        id: Id,
        patch: ConceptFieldPatch,
    ) -> Result<PaymentConcept, Error>;

    /// Persists a status change. Transition legality is the domain layer's
    /// concern; the repository just writes.
    async fn update_status(
        &self,
        id: Id,
        status: ConceptStatus,
    ) -> Result<PaymentConcept, Error>;

    /// Replaces the targeting rule: attaches the new mode's relation sets,
    /// detaches every set belonging to other modes, and syncs exceptions
    /// and the global flag.
    async fn update_targeting(
        &self,
        id: Id,
        update: TargetingUpdate,
    ) -> Result<PaymentConcept, Error>;

    /// Replaces the exception set without touching the targeting rule.
    async fn set_exceptions(
        &self,
        id: Id,
        exception_ids: BTreeSet<Id>,
    ) -> Result<PaymentConcept, Error>;
}
