//! Dependency initialization and wiring for the identity service.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use identity_repository::{
    ContactRepository, ContactRepositoryError, InMemoryContactRepository,
    PostgresContactRepository, RepositoryConfig,
};
use identity_resolver::IdentityResolver;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::ServiceError;

/// Connection mode for PostgreSQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if connection fails.
    FailFast,
    /// Retry connection at the configured interval until successful.
    Retry,
}

impl ConnectionMode {
    /// Parse connection mode from `DB_CONNECTION_MODE`.
    ///
    /// Valid values: "fail-fast" or "retry" (case-insensitive)
    /// Defaults to "fail-fast" if not set or invalid.
    pub fn from_env() -> Self {
        match env::var("DB_CONNECTION_MODE")
            .unwrap_or_else(|_| "fail-fast".to_string())
            .to_lowercase()
            .as_str()
        {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            _ => {
                warn!("Invalid DB_CONNECTION_MODE, defaulting to 'fail-fast'");
                Self::FailFast
            }
        }
    }
}

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The resolver shared by every request.
    pub resolver: Arc<IdentityResolver>,
}

impl Dependencies {
    /// Builds the contact store and the resolver from `config`.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(ServiceError)` - If the store cannot be reached (only in fail-fast mode)
    pub async fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        info!(
            store = if config.database_url.is_some() { "postgres" } else { "memory" },
            connection_mode = ?config.connection_mode,
            request_timeout_ms = config.resolver.request_timeout.as_millis() as u64,
            "Initializing dependencies"
        );

        let repository: Arc<dyn ContactRepository> = match &config.database_url {
            Some(url) if !is_postgres_url(url) => {
                return Err(ServiceError::config(
                    "DATABASE_URL must start with postgres:// or postgresql://",
                ));
            }
            Some(url) => Arc::new(
                Self::connect_to_postgres(
                    url,
                    &config.repository,
                    config.connection_mode,
                    config.retry_interval,
                )
                .await?,
            ),
            None => {
                warn!("DATABASE_URL not set, contacts are kept in memory and lost on exit");
                Arc::new(InMemoryContactRepository::with_timeouts(
                    config.repository.timeouts,
                ))
            }
        };

        let resolver = IdentityResolver::with_config(repository, config.resolver.clone());

        Ok(Self {
            resolver: Arc::new(resolver),
        })
    }

    /// Connect to PostgreSQL with retry logic based on connection mode.
    async fn connect_to_postgres(
        url: &str,
        repository: &RepositoryConfig,
        mode: ConnectionMode,
        retry_interval: Duration,
    ) -> Result<PostgresContactRepository, ServiceError> {
        loop {
            match PostgresContactRepository::connect(url, repository).await {
                Ok(repository) => {
                    info!("PostgreSQL connection established");
                    return Ok(repository);
                }
                Err(e) => match mode {
                    ConnectionMode::FailFast => return Err(e.into()),
                    ConnectionMode::Retry if is_retryable(&e) => {
                        warn!(
                            error = %e,
                            retry_interval_secs = retry_interval.as_secs(),
                            "Failed to connect to PostgreSQL, retrying..."
                        );
                        sleep(retry_interval).await;
                    }
                    ConnectionMode::Retry => return Err(e.into()),
                },
            }
        }
    }
}

fn is_postgres_url(url: &str) -> bool {
    url.starts_with("postgres://") || url.starts_with("postgresql://")
}

/// Migration failures are not fixed by waiting.
fn is_retryable(error: &ContactRepositoryError) -> bool {
    !matches!(error, ContactRepositoryError::MigrationError(_))
}
