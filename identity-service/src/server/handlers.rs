// HTTP request handlers
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use identity_resolver::ResolveError;
use serde_json::json;
use tracing::{error, info};

use crate::server::models::{IdentifyRequest, IdentifyResponse};
use crate::server::state::AppState;

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "Identity service running" })),
    )
}

/// Identify endpoint - resolves an email and/or phone number to its identity cluster
pub async fn identify_handler(
    State(state): State<AppState>,
    Json(payload): Json<IdentifyRequest>,
) -> Response {
    let phone_number = payload.phone_number.map(|phone| phone.into_string());

    match state
        .resolver
        .resolve_identity(payload.email.as_deref(), phone_number.as_deref())
        .await
    {
        Ok(contact) => {
            info!(
                primary_contact_id = contact.primary_contact_id,
                secondaries = contact.secondary_contact_ids.len(),
                "Identity resolved"
            );
            (StatusCode::OK, Json(IdentifyResponse { contact })).into_response()
        }
        Err(ResolveError::Validation(message)) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
        }
        Err(e) => {
            error!(error = %e, "Identity resolution failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error" })),
            )
                .into_response()
        }
    }
}
