//! Error types for store operations
//!
//! Revoking something that is not there is not an error; it is reported as
//! [`guild_rbac::RevokeOutcome::NotFound`]. Everything here is a real
//! failure of a single request and never takes the store down.

use guild_rbac::IdentifierError;
use thiserror::Error;

/// Store error types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A principal or role token could not be parsed
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(#[from] IdentifierError),

    /// The snapshot could not be written; the mutation did not succeed
    #[error("Failed to persist snapshot to {target}: {message}")]
    Persistence {
        /// Where the write was going.
        target: String,
        /// Underlying failure.
        message: String,
    },

    /// The snapshot could not be read
    #[error("Failed to load snapshot from {target}: {message}")]
    Load {
        /// Where the read came from.
        target: String,
        /// Underlying failure.
        message: String,
    },

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The snapshot decoded but holds an id that is not numeric
    #[error("Corrupt snapshot: {field} holds non-numeric id '{value}'")]
    CorruptSnapshot {
        /// Which part of the snapshot (e.g. `permissions`, `role_admins`).
        field: &'static str,
        /// The offending value.
        value: String,
    },
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Check whether retrying the persist (`flush`) may succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Persistence { .. })
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::InvalidIdentifier(_) => "INVALID_IDENTIFIER",
            StoreError::Persistence { .. } => "PERSISTENCE_ERROR",
            StoreError::Load { .. } => "LOAD_ERROR",
            StoreError::Serialization(_) => "SERIALIZATION_ERROR",
            StoreError::CorruptSnapshot { .. } => "CORRUPT_SNAPSHOT",
        }
    }

    pub(crate) fn persistence(target: impl Into<String>, err: impl ToString) -> Self {
        StoreError::Persistence {
            target: target.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn load(target: impl Into<String>, err: impl ToString) -> Self {
        StoreError::Load {
            target: target.into(),
            message: err.to_string(),
        }
    }
}
