//! Custom Axum extractors.
//!
//! - [`ResolvedClient`]: the experimentation client serving this request
//! - [`JsonBody`]: a JSON body decoded regardless of `Content-Type`
//! - [`QueryPairs`]: raw query pairs, first value wins on lookup
//!
//! Every rejection is an [`AppError`], so failures render with the same JSON
//! body as handler errors.
//!
//! # Examples
//!
//! ```ignore
//! async fn handler(
//!     ResolvedClient(client): ResolvedClient,
//!     query: QueryPairs,
//!     JsonBody(body): JsonBody<MyBody>,
//! ) -> Result<StatusCode, AppError> {
//!     // ...
//! }
//! ```

use crate::error::AppError;
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRef, FromRequest, FromRequestParts, Query, Request},
    http::{HeaderMap, request::Parts},
};
use experiment_agent_core::{ClientProvider, ExperimentClient};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Header naming the SDK key whose client should serve the request.
pub const SDK_KEY_HEADER: &str = "X-SDK-Key";

/// SDK key from the `X-SDK-Key` header, used by [`ResolvedClient`].
///
/// Empty or non-UTF-8 header values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SdkKey(pub Option<String>);

impl SdkKey {
    /// Read the key from request headers.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let key = headers
            .get(SDK_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string);

        Self(key)
    }
}

/// The client resolved for this request by the state's [`ClientProvider`].
///
/// Rejects with a 500 when the provider cannot supply a client: that is a
/// deployment fault, not something the caller can correct.
#[derive(Clone)]
pub struct ResolvedClient(pub Arc<dyn ExperimentClient>);

#[async_trait]
impl<S> FromRequestParts<S> for ResolvedClient
where
    S: Send + Sync,
    Arc<dyn ClientProvider>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let provider = <Arc<dyn ClientProvider> as FromRef<S>>::from_ref(state);
        let SdkKey(sdk_key) = SdkKey::from_headers(&parts.headers);

        provider
            .client(sdk_key.as_deref())
            .map(Self)
            .map_err(|e| AppError::internal(e.to_string()).with_source(e))
    }
}

/// JSON request body.
///
/// Unlike `axum::Json`, the `Content-Type` header is not checked, and every
/// read or decode failure is a 400 Bad Request.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::bad_request(format!("failed to read request body: {e}")))?;

        serde_json::from_slice(&bytes)
            .map(Self)
            .map_err(|e| AppError::bad_request(format!("invalid request body: {e}")))
    }
}

/// Query string as ordered key/value pairs.
///
/// Repeated keys are kept; [`QueryPairs::get`] returns the first value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPairs(pub Vec<(String, String)>);

impl QueryPairs {
    /// First value for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for QueryPairs
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::bad_request(format!("invalid query string: {e}")))?;

        Ok(Self(pairs))
    }
}
