//! Error types for the entity API layer.
use std::error::Error as StdError;
use std::fmt;

use serde::Serialize;

/// Errors while executing operations against the persistence layer.
/// The intent is to categorize errors into two major types:
///  * Errors related to data, e.g. a missing payment concept
///  * Errors related to interactions with the store itself
#[derive(Debug)]
pub struct Error {
    // Underlying error emitted by the concrete repository implementation
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    // Enum representing which category of error
    pub error_kind: EntityApiErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntityApiErrorKind {
    // Record not found
    RecordNotFound,
    // Record not updated
    RecordNotUpdated,
    // Input rejected by the store's own constraints
    ValidationError,
    // Errors related to interactions with the store itself, e.g. a lost connection
    SystemError,
    // Other errors
    Other,
}

impl Error {
    pub fn not_found() -> Self {
        Self {
            source: None,
            error_kind: EntityApiErrorKind::RecordNotFound,
        }
    }

    pub fn not_updated() -> Self {
        Self {
            source: None,
            error_kind: EntityApiErrorKind::RecordNotUpdated,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Entity API Error: {:?}", self)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}
