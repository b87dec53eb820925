//! Domain core for the school-payments platform: audience resolution,
//! concept change diffing, status transitions, and the mutation flows that
//! tie them to the asynchronous cache-invalidation and notification side.
//!
//! This crate re-exports the `entity` types consumers need so they do not
//! have to depend on the `entity` crate directly.

pub use entity::{
    AppliesTo, ConceptFieldPatch, ConceptStatus, Id, NewPaymentConcept, PaymentConcept,
    TargetingUpdate,
};
pub use events::{InvalidationReason, Priority};

pub mod audience;
pub mod diff;
pub mod error;
pub mod payment_concept;
pub mod scheduling;
pub mod transition;
