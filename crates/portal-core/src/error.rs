//! Error types for the employee portal.

use thiserror::Error;

/// Stable, machine-readable error codes. Clients match on these, never on
/// the human-readable message.
pub mod error_code {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const CONFLICT: &str = "CONFLICT";
    pub const INVALID_STATE: &str = "INVALID_STATE";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    pub const INTERNAL: &str = "INTERNAL";
}

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// A state-machine precondition or a uniqueness constraint was violated.
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Stored data contradicts an invariant. Surfaced, never auto-repaired.
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    /// A versioned write lost a race with another writer.
    #[error("Concurrent modification of {entity} with id {id}")]
    ConcurrentModification { entity: String, id: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PortalError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        PortalError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        PortalError::Conflict {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        PortalError::Validation {
            message: message.into(),
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        PortalError::AuthorizationDenied {
            reason: reason.into(),
        }
    }

    /// Stable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            PortalError::NotFound { .. } => error_code::NOT_FOUND,
            PortalError::Conflict { .. } | PortalError::ConcurrentModification { .. } => {
                error_code::CONFLICT
            }
            PortalError::InvalidState { .. } => error_code::INVALID_STATE,
            PortalError::AuthenticationFailed { .. } => error_code::UNAUTHENTICATED,
            PortalError::AuthorizationDenied { .. } => error_code::PERMISSION_DENIED,
            PortalError::Validation { .. } => error_code::VALIDATION_FAILED,
            PortalError::Storage(_) => error_code::STORAGE_ERROR,
            PortalError::Database(_) | PortalError::Crypto(_) | PortalError::Internal(_) => {
                error_code::INTERNAL
            }
        }
    }
}

pub type PortalResult<T> = Result<T, PortalError>;
