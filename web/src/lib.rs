//! Axum HTTP surface for the experiment agent.
//!
//! This crate adapts HTTP requests onto the client traits in
//! `experiment-agent-core`. It owns no tracking logic of its own.
//!
//! # Request Flow
//!
//! 1. **Resolve** the client through the injected `ClientProvider`
//! 2. **Decode** the JSON body
//! 3. **Validate** the `eventKey` query parameter
//! 4. **Track** the event through the client
//! 5. **Map** the result to an HTTP response
//!
//! # Example
//!
//! ```ignore
//! use experiment_agent_core::StaticClientProvider;
//! use experiment_agent_web::{AppState, build_router};
//! use std::sync::Arc;
//!
//! let provider = Arc::new(StaticClientProvider::new(client));
//! let app = build_router(AppState::new(provider));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{JsonBody, QueryPairs, ResolvedClient, SDK_KEY_HEADER, SdkKey};
pub use middleware::{REQUEST_ID_HEADER, observability_layer};
pub use routes::{TRACK_PATH, build_router};
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
