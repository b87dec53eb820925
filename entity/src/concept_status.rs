use serde::{Deserialize, Serialize};

/// Status of a payment concept through its lifecycle.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Deserialize, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConceptStatus {
    /// Concept is live and billable
    #[default]
    Active,
    /// Billing cycle closed; concept kept for historical queries
    Finalized,
    /// Temporarily suspended, can be reactivated
    Disabled,
    /// Logically deleted, recoverable by reactivation
    Deleted,
}

impl ConceptStatus {
    /// Whether field/relation mutations are accepted in this status.
    /// Finalized and deleted concepts reject any mutation attempt.
    pub fn is_updatable(&self) -> bool {
        matches!(self, ConceptStatus::Active | ConceptStatus::Disabled)
    }
}

impl std::fmt::Display for ConceptStatus {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConceptStatus::Active => write!(fmt, "active"),
            ConceptStatus::Finalized => write!(fmt, "finalized"),
            ConceptStatus::Disabled => write!(fmt, "disabled"),
            ConceptStatus::Deleted => write!(fmt, "deleted"),
        }
    }
}
