//! Admin error taxonomy
//!
//! Errors stay tagged until the transport renders them as text.

use thiserror::Error;

use crate::error::StoreError;

/// Result type alias for admin operations
pub type ControlResult<T> = std::result::Result<T, ControlError>;

/// Category of an admin failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required parameter was absent
    MissingParameter,

    /// A parameter could not be parsed
    MalformedParameter,

    /// The referenced collection does not exist
    NotFound,

    /// The engine refused the operation (duplicate name, bad count, I/O)
    Conflict,

    /// The listing payload could not be encoded
    Serialization,

    /// The operation did not run to completion on the server
    Internal,
}

impl ErrorKind {
    /// Whether the caller caused the failure
    pub fn is_client_error(self) -> bool {
        matches!(
            self,
            ErrorKind::MissingParameter
                | ErrorKind::MalformedParameter
                | ErrorKind::NotFound
                | ErrorKind::Conflict
        )
    }
}

/// A failed admin operation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ControlError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ControlError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn missing_parameter(name: &str) -> Self {
        Self::new(
            ErrorKind::MissingParameter,
            format!("Please pass POST/PUT/GET parameter value of '{}'.", name),
        )
    }

    pub fn not_found(collection: &str) -> Self {
        Self::new(
            ErrorKind::NotFound,
            format!("Collection {} does not exist", collection),
        )
    }
}

impl From<StoreError> for ControlError {
    fn from(err: StoreError) -> Self {
        let kind = match err {
            StoreError::CollectionNotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Conflict,
        };
        Self::new(kind, err.to_string())
    }
}
