//! Error types for the `domain` layer.
use entity::payment_concept::TargetingViolation;
use entity::{AppliesTo, ConceptStatus};
use entity_api::error::{EntityApiErrorKind, Error as EntityApiError};
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the domain layer are modeled as a tree structure with
/// `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums representing the kinds of errors that can occur in this layer or in
/// lower layers. The `source` field holds the original error that caused the
/// domain error. The intent is to translate errors between layers while
/// maintaining layer boundaries: the (external) transport layer depends on
/// `domain`, `domain` depends on `entity_api`, but the transport layer should
/// never depend on `entity_api` directly. The `error_kind` tree is what the
/// transport layer maps to its own status codes and messages.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Entity(EntityErrorKind),
    Validation(ValidationErrorKind),
    Config,
    Other(String),
}

/// Entity errors that bubble up from the persistence layer (`entity_api`),
/// reduced to the subset of kinds that are relevant at this layer.
#[derive(Debug, PartialEq)]
pub enum EntityErrorKind {
    NotFound,
    Invalid,
    DbTransaction,
    Other(String),
}

/// Synchronous rejections raised before any mutation or side effect runs.
#[derive(Debug, PartialEq)]
pub enum ValidationErrorKind {
    /// The requested status change is not an edge of the transition graph.
    InvalidStatusTransition {
        from: ConceptStatus,
        to: ConceptStatus,
    },
    /// Field/relation mutations are rejected for finalized/deleted concepts.
    ConceptNotUpdatable(ConceptStatus),
    /// The chosen targeting mode has no relation data to draw from.
    MissingTargetingData(AppliesTo),
    /// The global flag disagrees with the targeting mode.
    GlobalFlagMismatch,
    /// Exceptions cannot be assigned while the concept targets an explicit
    /// student list.
    ExceptionsNotAllowed,
    /// The mutation would leave the concept with zero affected users.
    /// Deliberate guard: never silently notify nobody and call it success.
    RecipientsNotFound,
}

/// Errors caused by collaborators outside this process (cache backend,
/// delivery provider, ...).
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Network,
    Other(String),
}

impl Error {
    pub fn validation(kind: ValidationErrorKind) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Validation(kind)),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(message.into())),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// This is where we translate errors from the `entity_api` layer to the `domain` layer.
impl From<EntityApiError> for Error {
    fn from(err: EntityApiError) -> Self {
        let entity_error_kind = match err.error_kind {
            EntityApiErrorKind::RecordNotFound => EntityErrorKind::NotFound,
            EntityApiErrorKind::ValidationError => EntityErrorKind::Invalid,
            EntityApiErrorKind::SystemError => EntityErrorKind::DbTransaction,
            _ => EntityErrorKind::Other("EntityApiErrorKind".to_string()),
        };

        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(entity_error_kind)),
        }
    }
}

impl From<TargetingViolation> for Error {
    fn from(violation: TargetingViolation) -> Self {
        let kind = match violation {
            TargetingViolation::MissingTargetingData(applies_to) => {
                ValidationErrorKind::MissingTargetingData(applies_to)
            }
            TargetingViolation::GlobalFlagMismatch => ValidationErrorKind::GlobalFlagMismatch,
        };
        Error::validation(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_api_not_found_translates_to_entity_not_found() {
        let err: Error = EntityApiError::not_found().into();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::NotFound))
        );
    }

    #[test]
    fn test_targeting_violation_translates_to_validation() {
        let err: Error = TargetingViolation::MissingTargetingData(AppliesTo::Career).into();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Validation(
                ValidationErrorKind::MissingTargetingData(AppliesTo::Career)
            ))
        );
    }
}
