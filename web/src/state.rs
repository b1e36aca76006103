//! Application state for Axum handlers.
//!
//! The state carries the explicitly injected [`ClientProvider`]. Handlers
//! resolve their client through it (see
//! [`ResolvedClient`](crate::extractors::ResolvedClient)) instead of reading
//! one out of ambient request context.

use axum::extract::FromRef;
use experiment_agent_core::ClientProvider;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply via `Arc`) for each request.
#[derive(Clone)]
pub struct AppState {
    /// Resolves the experimentation client for each request
    pub provider: Arc<dyn ClientProvider>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(provider: Arc<dyn ClientProvider>) -> Self {
        Self { provider }
    }
}

impl FromRef<AppState> for Arc<dyn ClientProvider> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.provider)
    }
}
