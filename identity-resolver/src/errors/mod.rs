//! Error types for the identity resolution pipeline.

use identity_repository::ContactRepositoryError;
use thiserror::Error;

/// Errors that can occur while resolving an identity.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The request carries neither an email nor a phone number.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The store failed; the resolution was rolled back.
    #[error("Storage error: {0}")]
    Storage(#[from] ContactRepositoryError),

    /// Stored clusters break a structural invariant. Never repaired automatically.
    #[error("Consistency violation: {0}")]
    ConsistencyViolation(String),
}

impl ResolveError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a consistency violation error.
    pub fn consistency(msg: impl Into<String>) -> Self {
        Self::ConsistencyViolation(msg.into())
    }

    /// Whether the caller, rather than the service, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
