//! HTTP API integration tests for the track endpoint.
//!
//! Drives the full router (middleware included) with `tower::ServiceExt::oneshot`
//! against mock and queueing clients.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Integration tests can use unwrap/expect

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
    response::Response,
};
use experiment_agent_core::{
    AttributeValue, ClientProvider, ExperimentClient, KeyedClientProvider, ProviderError,
    QueueConfig, QueueingClient, StaticClientProvider, TrackError,
};
use experiment_agent_testing::{FailingProvider, LogCapture, MockClient, RecordingSink};
use experiment_agent_web::{AppState, REQUEST_ID_HEADER, SDK_KEY_HEADER, TRACK_PATH, build_router};
use std::sync::Arc;
use tower::ServiceExt;
use tracing::Level;

const PURCHASE_BODY: &str = r#"{"userID":"u1","userAttributes":{},"eventTags":{"revenue":10}}"#;

fn router_with(provider: impl ClientProvider + 'static) -> Router {
    build_router(AppState::new(Arc::new(provider)))
}

fn router_for(client: &Arc<MockClient>) -> Router {
    let client: Arc<dyn ExperimentClient> = client.clone();
    router_with(StaticClientProvider::new(client))
}

fn track_request(query: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("{TRACK_PATH}{query}"))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_successful_track_returns_no_content() {
    let client = Arc::new(MockClient::succeeding());

    let response = router_for(&client)
        .oneshot(track_request("?eventKey=purchase", PURCHASE_BODY))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(body_text(response).await.is_empty());

    let calls = client.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].event_key, "purchase");
    assert_eq!(calls[0].user.id, "u1");
    assert!(calls[0].user.attributes.is_empty());
    assert_eq!(calls[0].tags["revenue"], AttributeValue::Integer(10));
}

#[tokio::test]
async fn test_user_attributes_are_forwarded() {
    let client = Arc::new(MockClient::succeeding());
    let body = r#"{"userID":"u9","userAttributes":{"plan":"pro","beta":true},"eventTags":{}}"#;

    let response = router_for(&client)
        .oneshot(track_request("?eventKey=signup", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let user = &client.calls()[0].user;
    assert_eq!(user.id, "u9");
    assert_eq!(user.attributes["plan"], AttributeValue::String("pro".into()));
    assert_eq!(user.attributes["beta"], AttributeValue::Bool(true));
}

#[tokio::test]
async fn test_missing_event_key_is_bad_request() {
    let client = Arc::new(MockClient::succeeding());

    let response = router_for(&client)
        .oneshot(track_request("", PURCHASE_BODY))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response)
        .await
        .contains("missing required path parameter: eventKey"));
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_empty_event_key_is_bad_request() {
    let client = Arc::new(MockClient::succeeding());

    let response = router_for(&client)
        .oneshot(track_request("?eventKey=", PURCHASE_BODY))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response)
        .await
        .contains("missing required path parameter: eventKey"));
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_any_non_empty_event_key_is_accepted() {
    let client = Arc::new(MockClient::succeeding());

    let response = router_for(&client)
        .oneshot(track_request("?eventKey=%F0%9F%9B%92%20cart", "{}"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(client.calls()[0].event_key, "\u{1f6d2} cart");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let client = Arc::new(MockClient::succeeding());

    let response = router_for(&client)
        .oneshot(track_request("?eventKey=purchase", "{\"userID\": "))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_body_is_checked_before_event_key() {
    let client = Arc::new(MockClient::succeeding());

    let response = router_for(&client)
        .oneshot(track_request("", "not json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("invalid request body"));
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_nested_attribute_values_are_bad_request() {
    let client = Arc::new(MockClient::succeeding());
    let body = r#"{"userID":"u1","userAttributes":{"address":{"city":"x"}}}"#;

    let response = router_for(&client)
        .oneshot(track_request("?eventKey=purchase", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_unresolvable_client_is_internal_error() {
    let app = router_with(FailingProvider(ProviderError::Unavailable(
        "not initialized".into(),
    )));

    let response = app
        .oneshot(track_request("?eventKey=purchase", PURCHASE_BODY))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_unresolvable_client_wins_over_bad_input() {
    let app = router_with(FailingProvider(ProviderError::MissingSdkKey));

    let response = app.oneshot(track_request("", "not json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_track_failure_is_not_found_and_logged_once() {
    let logs = LogCapture::new();
    let _guard = logs.set_default();
    let client = Arc::new(MockClient::failing(TrackError::Other("boom".into())));

    let response = router_for(&client)
        .oneshot(track_request("?eventKey=purchase", PURCHASE_BODY))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("tracking failed: boom"));
    assert_eq!(client.call_count(), 1);

    let errors = logs.at_level(Level::ERROR);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field("event_key"), Some("purchase"));
    assert_eq!(errors[0].message, "error tracking event");
}

#[tokio::test]
async fn test_success_is_logged_at_debug() {
    let logs = LogCapture::new();
    let _guard = logs.set_default();
    let client = Arc::new(MockClient::succeeding());

    let response = router_for(&client)
        .oneshot(track_request("?eventKey=purchase", PURCHASE_BODY))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(logs.at_level(Level::ERROR).is_empty());

    let tracked: Vec<_> = logs
        .at_level(Level::DEBUG)
        .into_iter()
        .filter(|e| e.message == "tracking event")
        .collect();
    assert_eq!(tracked.len(), 1);
    assert_eq!(tracked[0].field("event_key"), Some("purchase"));
}

#[tokio::test]
async fn test_identical_requests_track_twice() {
    let client = Arc::new(MockClient::succeeding());
    let app = router_for(&client);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(track_request("?eventKey=purchase", PURCHASE_BODY))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    assert_eq!(client.call_count(), 2);
}

#[tokio::test]
async fn test_sdk_key_header_selects_client() {
    let a = Arc::new(MockClient::succeeding());
    let b = Arc::new(MockClient::succeeding());
    let a_dyn: Arc<dyn ExperimentClient> = a.clone();
    let b_dyn: Arc<dyn ExperimentClient> = b.clone();
    let app = router_with(
        KeyedClientProvider::new()
            .with_client("sdk-a", a_dyn)
            .with_client("sdk-b", b_dyn)
            .with_default_key("sdk-a"),
    );

    let mut request = track_request("?eventKey=purchase", PURCHASE_BODY);
    request
        .headers_mut()
        .insert(SDK_KEY_HEADER, "sdk-b".parse().unwrap());
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(track_request("?eventKey=purchase", PURCHASE_BODY))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert_eq!(a.call_count(), 1);
    assert_eq!(b.call_count(), 1);
}

#[tokio::test]
async fn test_unknown_sdk_key_is_internal_error() {
    let client: Arc<dyn ExperimentClient> = Arc::new(MockClient::succeeding());
    let app = router_with(KeyedClientProvider::new().with_client("sdk-a", client));

    let mut request = track_request("?eventKey=purchase", PURCHASE_BODY);
    request
        .headers_mut()
        .insert(SDK_KEY_HEADER, "sdk-z".parse().unwrap());
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_queueing_client_end_to_end() {
    let sink = Arc::new(RecordingSink::new());
    let config = QueueConfig::default().with_event_keys(["purchase"]);
    let (client, dispatcher) = QueueingClient::new(config, sink.clone());
    let dispatcher = tokio::spawn(dispatcher.run());

    let app = router_with(StaticClientProvider::new(Arc::new(client)));

    let response = app
        .clone()
        .oneshot(track_request("?eventKey=purchase", PURCHASE_BODY))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(track_request("?eventKey=refund", PURCHASE_BODY))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("event with key \\\"refund\\\" not found"));

    // Dropping the router drops the last client handle and closes the queue.
    drop(app);
    dispatcher.await.unwrap();

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_key, "purchase");
    assert_eq!(events[0].user.id, "u1");
    assert_eq!(events[0].revenue, Some(10));
}

#[tokio::test]
async fn test_health_check() {
    let app = router_with(FailingProvider(ProviderError::MissingSdkKey));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_track_response_carries_request_id() {
    let client = Arc::new(MockClient::succeeding());

    let response = router_for(&client)
        .oneshot(track_request("?eventKey=purchase", PURCHASE_BODY))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
}
