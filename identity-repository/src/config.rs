//! Configuration types for the contact repositories.

use std::time::Duration;

/// Upper bounds for waiting inside the store.
///
/// `statement_timeout` caps a single query, `lock_timeout` caps the wait for a
/// transaction-scoped lock (and, for the in-memory store, for the store itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreTimeouts {
    pub statement_timeout: Duration,
    pub lock_timeout: Duration,
}

impl Default for StoreTimeouts {
    fn default() -> Self {
        Self {
            statement_timeout: Duration::from_millis(5_000),
            lock_timeout: Duration::from_millis(3_000),
        }
    }
}

/// Connection settings for `PostgresContactRepository::connect`.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Maximum number of pooled connections.
    pub max_connections: u32,
    /// How long to wait for a free pooled connection.
    pub acquire_timeout: Duration,
    /// Per-transaction statement and lock timeouts.
    pub timeouts: StoreTimeouts,
    /// Apply the embedded schema migrations after connecting.
    pub run_migrations: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
            timeouts: StoreTimeouts::default(),
            run_migrations: true,
        }
    }
}
