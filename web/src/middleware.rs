//! Request-id and tracing middleware.
//!
//! Every request gets an `x-request-id` (kept from the caller when present,
//! otherwise a fresh UUID v4). The id is recorded on the request's tracing
//! span and echoed back on the response.
//!
//! # Example
//!
//! ```ignore
//! use experiment_agent_web::middleware::observability_layer;
//!
//! let app = Router::new()
//!     .route("/v1/track", post(track_event))
//!     .layer(observability_layer());
//! ```

use axum::http::{HeaderName, Request};
use tower::ServiceBuilder;
use tower::layer::util::{Identity, Stack};
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{MakeSpan, TraceLayer};
use tracing::Span;

/// Header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Creates the `http_request` span for each request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::info_span!(
            "http_request",
            request_id = %request_id,
            method = %request.method(),
            uri = %request.uri(),
        )
    }
}

/// Layer stack installed by [`observability_layer`].
pub type ObservabilityLayer = ServiceBuilder<
    Stack<
        PropagateRequestIdLayer,
        Stack<
            TraceLayer<SharedClassifier<ServerErrorsAsFailures>, RequestSpan>,
            Stack<SetRequestIdLayer<MakeRequestUuid>, Identity>,
        >,
    >,
>;

/// Request-id assignment, request tracing and request-id propagation.
///
/// The id is set before the trace span is created so the span can record it.
#[must_use]
pub fn observability_layer() -> ObservabilityLayer {
    let header = HeaderName::from_static(REQUEST_ID_HEADER);

    ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(header.clone(), MakeRequestUuid))
        .layer(TraceLayer::new_for_http().make_span_with(RequestSpan))
        .layer(PropagateRequestIdLayer::new(header))
}
