//! Health check endpoint.
//!
//! Used by load balancers to verify the process is serving requests. It does
//! not resolve a client or touch the event queue.

use axum::http::StatusCode;

/// Liveness check.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}
