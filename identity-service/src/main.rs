//! Identity Service Main Entry Point
//!
//! Serves identity reconciliation over HTTP, backed by PostgreSQL
//! (or an in-memory store when no database is configured).

use dotenv::dotenv;
use identity_service::config::LogFormat;
use identity_service::server::{create_app, run_server, state::AppState};
use identity_service::{Dependencies, ServiceConfig, ServiceError};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("identity_service=info,identity_resolver=info,identity_repository=info")
    });

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_thread_ids(true),
                )
                .init();

            info!(
                service_name = "identity-service",
                service_version = env!("CARGO_PKG_VERSION"),
                "Tracing initialized with JSON format"
            );
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
                .init();

            info!(
                service_name = "identity-service",
                service_version = env!("CARGO_PKG_VERSION"),
                "Tracing initialized with console output"
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), ServiceError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing(LogFormat::from_env());

    info!("Starting identity service");

    let config = ServiceConfig::from_env();

    let deps = match Dependencies::new(&config).await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    let app = create_app(AppState {
        resolver: deps.resolver,
    });

    match run_server(app, config.listen_addr).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!(error = %e, "Identity service failed");
            Err(e)
        }
    }
}
