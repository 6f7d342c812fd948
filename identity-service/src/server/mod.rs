// Server module - HTTP server setup and routing
pub mod handlers;
pub mod models;
pub mod state;

use std::net::SocketAddr;

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use self::state::AppState;
use crate::ServiceError;

/// Create CORS layer for browser clients
pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Create the Axum application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health_check))
        .route("/identify", post(handlers::identify_handler))
        .layer(TraceLayer::new_for_http())
        .layer(create_cors_layer())
        .with_state(state)
}

/// Run the server on the specified address until Ctrl-C or SIGTERM
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), ServiceError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("- Identify endpoint: http://{}/identify", addr);
    info!("- Health endpoint: http://{}/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
