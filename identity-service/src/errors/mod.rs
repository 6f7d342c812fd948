//! Error types for the identity service.
//! Consolidates errors from configuration, the contact store and the HTTP listener.

use identity_repository::ContactRepositoryError;
use thiserror::Error;

/// Errors that can occur during service initialization or execution.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Contact store error.
    #[error("Repository error: {0}")]
    Repository(#[from] ContactRepositoryError),

    /// Listener or socket error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
