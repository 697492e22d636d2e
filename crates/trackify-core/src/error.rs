//! The engine error taxonomy.

use thiserror::Error;

use crate::types::ValidationError;

/// Errors surfaced by engine operations.
///
/// The four kinds map one-to-one onto the transport layer's status codes,
/// but that mapping lives with the caller. The engine never retries.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed input: bad date range, end before start, unknown enum value.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// State-machine violation: double start, delete while open.
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// A referenced timer, entry, rule or membership does not exist.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// Internal invariant breach. Always a bug, never expected from valid input.
    #[error("computation error: {message}")]
    Computation { message: String },
}

impl EngineError {
    /// Creates a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a computation error.
    pub fn computation(message: impl Into<String>) -> Self {
        Self::Computation {
            message: message.into(),
        }
    }
}
