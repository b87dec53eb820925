use uuid::Uuid;

pub mod applies_to;
pub mod concept_status;
pub mod payment_concept;

pub use applies_to::AppliesTo;
pub use concept_status::ConceptStatus;
pub use payment_concept::{ConceptFieldPatch, NewPaymentConcept, PaymentConcept, TargetingUpdate};

/// A type alias that represents any Entity's internal id field data type.
/// Aliased so that it's easy to change the underlying type if necessary.
pub type Id = Uuid;
