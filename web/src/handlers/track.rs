//! Track event endpoint.
//!
//! Records a conversion for a user by forwarding to the request's
//! experimentation client.
//!
//! # Endpoint
//!
//! ```text
//! POST /v1/track?eventKey=<key>
//! ```
//!
//! # Request
//!
//! ```json
//! {
//!   "userID": "user-1",
//!   "userAttributes": { "plan": "pro" },
//!   "eventTags": { "revenue": 1000 }
//! }
//! ```
//!
//! # Responses
//!
//! - 204 No Content: the client accepted the event
//! - 400 Bad Request: malformed body, or `eventKey` missing or empty
//! - 404 Not Found: the client rejected the event, for any reason
//! - 500 Internal Server Error: no client could be resolved

use crate::WebResult;
use crate::error::AppError;
use crate::extractors::{JsonBody, QueryPairs, ResolvedClient};
use axum::http::StatusCode;
use experiment_agent_core::{Attributes, EventTags, UserContext};
use serde::Deserialize;

/// Query parameter naming the tracked event.
pub const EVENT_KEY_PARAM: &str = "eventKey";

/// Message returned when `eventKey` is absent or empty.
pub const MISSING_EVENT_KEY: &str = "missing required path parameter: eventKey";

/// Body of a track request. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TrackRequestBody {
    /// User the event is attributed to
    #[serde(rename = "userID", default)]
    pub user_id: Option<String>,
    /// Attributes of that user
    #[serde(rename = "userAttributes", default)]
    pub user_attributes: Option<Attributes>,
    /// Tags attached to the event
    #[serde(rename = "eventTags", default)]
    pub event_tags: Option<EventTags>,
}

impl TrackRequestBody {
    /// Split into the user context and event tags handed to the client.
    #[must_use]
    pub fn into_parts(self) -> (UserContext, EventTags) {
        let user = UserContext::with_attributes(
            self.user_id.unwrap_or_default(),
            self.user_attributes.unwrap_or_default(),
        );
        (user, self.event_tags.unwrap_or_default())
    }
}

fn record_outcome(outcome: &'static str) {
    metrics::counter!("track.requests", "outcome" => outcome).increment(1);
}

/// Track an event for a user.
///
/// Steps run in order and stop at the first failure: resolve the client,
/// decode the body, validate `eventKey`, call `track` once.
///
/// # Errors
///
/// See the module docs for the status mapping. A failed `track` call is
/// logged at error level with the event key and always maps to 404.
pub async fn track_event(
    client: Result<ResolvedClient, AppError>,
    query: Result<QueryPairs, AppError>,
    body: Result<JsonBody<TrackRequestBody>, AppError>,
) -> WebResult<StatusCode> {
    let ResolvedClient(client) = client.inspect_err(|_| record_outcome("unresolved"))?;
    let JsonBody(body) = body.inspect_err(|_| record_outcome("invalid"))?;
    let query = query.inspect_err(|_| record_outcome("invalid"))?;

    let Some(event_key) = query.get(EVENT_KEY_PARAM).filter(|k| !k.is_empty()) else {
        record_outcome("invalid");
        return Err(AppError::bad_request(MISSING_EVENT_KEY));
    };

    let (user, tags) = body.into_parts();

    if let Err(e) = client.track(event_key, user, tags).await {
        tracing::error!(event_key = %event_key, error = %e, "error tracking event");
        record_outcome("failed");
        return Err(AppError::not_found(e.to_string()).with_source(e));
    }

    tracing::debug!(event_key = %event_key, "tracking event");
    record_outcome("accepted");
    Ok(StatusCode::NO_CONTENT)
}
