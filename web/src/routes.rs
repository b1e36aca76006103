//! Router configuration.

use crate::handlers::{health_check, track_event};
use crate::middleware::observability_layer;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// Path of the track endpoint.
pub const TRACK_PATH: &str = "/v1/track";

/// Build the complete Axum router.
///
/// - `GET /health`: liveness
/// - `POST /v1/track`: track an event
///
/// Every route runs inside the request-id and tracing middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(TRACK_PATH, post(track_event))
        .with_state(state)
        .layer(observability_layer())
}
