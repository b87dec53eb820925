//! Persistence contracts consumed by the domain layer.
//!
//! The concrete store (and its transactional boundary) lives behind these
//! traits; the domain layer only ever sees plain [`entity`] snapshots going
//! in and out. The `mock` feature ships in-memory implementations for tests
//! and local wiring.

pub mod concept_repository;
pub mod error;
pub mod recipient_repository;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use concept_repository::ConceptRepository;
pub use recipient_repository::RecipientRepository;

pub use entity::Id;
