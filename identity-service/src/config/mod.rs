//! Service configuration read from the environment.

pub mod dependencies;

pub use dependencies::{ConnectionMode, Dependencies};

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use identity_repository::{RepositoryConfig, StoreTimeouts};
use identity_resolver::ResolverConfig;
use tracing::warn;

/// Default HTTP listen port.
const DEFAULT_PORT: u16 = 3000;

/// Default HTTP listen address.
const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Default connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parse the log format from `LOG_FORMAT` ("json" or "pretty").
    pub fn from_env() -> Self {
        match env::var("LOG_FORMAT") {
            Ok(value) if value.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Everything the service needs to start.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// PostgreSQL URL. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub listen_addr: SocketAddr,
    pub repository: RepositoryConfig,
    pub resolver: ResolverConfig,
    pub connection_mode: ConnectionMode,
    pub retry_interval: Duration,
}

impl ServiceConfig {
    /// Reads the configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DATABASE_URL`: PostgreSQL URL (unset: in-memory store)
    /// - `HOST`: Listen address (default: 0.0.0.0)
    /// - `PORT`: Listen port (default: 3000)
    /// - `DB_MAX_CONNECTIONS`: Pool size (default: 10)
    /// - `DB_ACQUIRE_TIMEOUT_SECS`: Pool acquire timeout (default: 5)
    /// - `DB_STATEMENT_TIMEOUT_MS`: Per-statement timeout (default: 5000)
    /// - `DB_LOCK_TIMEOUT_MS`: Per-lock wait timeout (default: 3000)
    /// - `DB_RUN_MIGRATIONS`: Apply schema migrations on start (default: true)
    /// - `DB_CONNECTION_MODE`: "fail-fast" or "retry" (default: fail-fast)
    /// - `DB_RETRY_INTERVAL_SECS`: Retry interval in seconds (default: 15)
    /// - `REQUEST_TIMEOUT_MS`: Whole-resolution timeout (default: 10000)
    ///
    /// Values that do not parse fall back to their default with a warning, and
    /// so do zero sizes and zero timeouts.
    pub fn from_env() -> Self {
        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let host = parse_env("HOST", DEFAULT_HOST);
        let port = parse_env("PORT", DEFAULT_PORT);

        let defaults = RepositoryConfig::default();
        let default_timeouts = StoreTimeouts::default();
        let repository = RepositoryConfig {
            max_connections: parse_nonzero_env("DB_MAX_CONNECTIONS", defaults.max_connections),
            acquire_timeout: secs_env("DB_ACQUIRE_TIMEOUT_SECS", defaults.acquire_timeout),
            timeouts: StoreTimeouts {
                statement_timeout: millis_env(
                    "DB_STATEMENT_TIMEOUT_MS",
                    default_timeouts.statement_timeout,
                ),
                lock_timeout: millis_env("DB_LOCK_TIMEOUT_MS", default_timeouts.lock_timeout),
            },
            run_migrations: parse_env("DB_RUN_MIGRATIONS", defaults.run_migrations),
        };

        let resolver = ResolverConfig::with_request_timeout(millis_env(
            "REQUEST_TIMEOUT_MS",
            ResolverConfig::default().request_timeout,
        ));

        Self {
            database_url,
            listen_addr: SocketAddr::new(host, port),
            repository,
            resolver,
            connection_mode: ConnectionMode::from_env(),
            retry_interval: secs_env(
                "DB_RETRY_INTERVAL_SECS",
                Duration::from_secs(DEFAULT_RETRY_INTERVAL_SECS),
            ),
        }
    }
}

/// Reads `name` and parses it, falling back to `default` when unset or invalid.
fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match env::var(name) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(
                    variable = name,
                    value = %raw,
                    default = ?default,
                    "Invalid value, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

/// Like `parse_env`, but zero also falls back to `default`.
///
/// PostgreSQL reads a zero `statement_timeout` or `lock_timeout` as "wait
/// forever", so no bound may be configured as zero.
fn parse_nonzero_env<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug + PartialEq + From<u8> + Copy,
{
    let value = parse_env(name, default);
    if value == T::from(0) {
        warn!(variable = name, default = ?default, "Zero is not allowed, using default");
        return default;
    }
    value
}

fn millis_env(name: &str, default: Duration) -> Duration {
    Duration::from_millis(parse_nonzero_env(name, default.as_millis() as u64))
}

fn secs_env(name: &str, default: Duration) -> Duration {
    Duration::from_secs(parse_nonzero_env(name, default.as_secs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "DATABASE_URL",
        "HOST",
        "PORT",
        "DB_MAX_CONNECTIONS",
        "DB_ACQUIRE_TIMEOUT_SECS",
        "DB_STATEMENT_TIMEOUT_MS",
        "DB_LOCK_TIMEOUT_MS",
        "DB_RUN_MIGRATIONS",
        "DB_CONNECTION_MODE",
        "DB_RETRY_INTERVAL_SECS",
        "REQUEST_TIMEOUT_MS",
        "LOG_FORMAT",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();

        let config = ServiceConfig::from_env();
        assert_eq!(config.database_url, None);
        assert_eq!(config.listen_addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.repository.max_connections, 10);
        assert_eq!(config.repository.acquire_timeout, Duration::from_secs(5));
        assert_eq!(config.repository.timeouts, StoreTimeouts::default());
        assert!(config.repository.run_migrations);
        assert_eq!(config.resolver.request_timeout, Duration::from_secs(10));
        assert_eq!(config.connection_mode, ConnectionMode::FailFast);
        assert_eq!(config.retry_interval, Duration::from_secs(15));
    }

    #[test]
    #[serial]
    fn test_reads_overrides() {
        clear_env();
        env::set_var("DATABASE_URL", "postgres://localhost/identity");
        env::set_var("HOST", "127.0.0.1");
        env::set_var("PORT", "8088");
        env::set_var("DB_MAX_CONNECTIONS", "25");
        env::set_var("DB_STATEMENT_TIMEOUT_MS", "750");
        env::set_var("DB_LOCK_TIMEOUT_MS", "250");
        env::set_var("DB_RUN_MIGRATIONS", "false");
        env::set_var("REQUEST_TIMEOUT_MS", "1500");

        let config = ServiceConfig::from_env();
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/identity"));
        assert_eq!(config.listen_addr, "127.0.0.1:8088".parse().unwrap());
        assert_eq!(config.repository.max_connections, 25);
        assert_eq!(
            config.repository.timeouts.statement_timeout,
            Duration::from_millis(750)
        );
        assert_eq!(config.repository.timeouts.lock_timeout, Duration::from_millis(250));
        assert!(!config.repository.run_migrations);
        assert_eq!(config.resolver.request_timeout, Duration::from_millis(1500));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_values_fall_back_to_defaults() {
        clear_env();
        env::set_var("PORT", "not-a-port");
        env::set_var("DB_MAX_CONNECTIONS", "-3");
        env::set_var("REQUEST_TIMEOUT_MS", "soon");

        let config = ServiceConfig::from_env();
        assert_eq!(config.listen_addr.port(), 3000);
        assert_eq!(config.repository.max_connections, 10);
        assert_eq!(config.resolver.request_timeout, Duration::from_secs(10));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_zero_timeouts_fall_back_to_defaults() {
        clear_env();
        env::set_var("DB_STATEMENT_TIMEOUT_MS", "0");
        env::set_var("DB_LOCK_TIMEOUT_MS", "0");
        env::set_var("DB_ACQUIRE_TIMEOUT_SECS", "0");
        env::set_var("DB_MAX_CONNECTIONS", "0");
        env::set_var("REQUEST_TIMEOUT_MS", "0");

        let config = ServiceConfig::from_env();
        assert_eq!(config.repository.timeouts, StoreTimeouts::default());
        assert_eq!(config.repository.acquire_timeout, Duration::from_secs(5));
        assert_eq!(config.repository.max_connections, 10);
        assert_eq!(config.resolver.request_timeout, Duration::from_secs(10));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_blank_database_url_selects_memory_store() {
        clear_env();
        env::set_var("DATABASE_URL", "  ");

        assert_eq!(ServiceConfig::from_env().database_url, None);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_log_format() {
        clear_env();
        assert_eq!(LogFormat::from_env(), LogFormat::Pretty);

        env::set_var("LOG_FORMAT", "JSON");
        assert_eq!(LogFormat::from_env(), LogFormat::Json);

        env::set_var("LOG_FORMAT", "xml");
        assert_eq!(LogFormat::from_env(), LogFormat::Pretty);

        clear_env();
    }
}
