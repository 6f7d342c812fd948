use identity_shared::ParseLinkPrecedenceError;
use thiserror::Error;

/// SQLSTATE raised when `statement_timeout` cancels a query.
const QUERY_CANCELED: &str = "57014";
/// SQLSTATE raised when `lock_timeout` expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// Represents errors that can occur within the contact repository.
///
/// Every variant is fatal to the request that hit it: the surrounding
/// transaction is rolled back and nothing it wrote becomes visible.
#[derive(Debug, Error)]
pub enum ContactRepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Store operation timed out: {0}")]
    Timeout(String),

    #[error("Invalid link precedence: {0}")]
    InvalidLinkPrecedence(#[from] ParseLinkPrecedenceError),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl ContactRepositoryError {
    /// Create a timeout error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a backend error.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<sqlx::Error> for ContactRepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut => {
                Self::Timeout("connection pool acquire timed out".to_string())
            }
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some(QUERY_CANCELED) | Some(LOCK_NOT_AVAILABLE) => {
                    Self::Timeout(db_err.message().to_string())
                }
                _ => Self::DatabaseError(err),
            },
            _ => Self::DatabaseError(err),
        }
    }
}
