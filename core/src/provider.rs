//! Client resolution.
//!
//! A [`ClientProvider`] hands the web layer the client that should serve a
//! request. It is injected into the router state, so handlers never look a
//! client up from ambient request context.

use crate::client::ExperimentClient;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while resolving a client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The request named no SDK key and no default is configured.
    #[error("no SDK key provided and no default client configured")]
    MissingSdkKey,

    /// No client is registered for the SDK key.
    #[error("no client registered for SDK key \"{0}\"")]
    UnknownSdkKey(String),

    /// The provider cannot serve clients right now.
    #[error("client provider unavailable: {0}")]
    Unavailable(String),
}

/// Resolves the client bound to a request.
pub trait ClientProvider: Send + Sync {
    /// Resolve the client for the given SDK key, if the request carried one.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] when no client can serve the request.
    fn client(&self, sdk_key: Option<&str>) -> Result<Arc<dyn ExperimentClient>, ProviderError>;
}

/// Serves the same client for every request, ignoring the SDK key.
#[derive(Clone)]
pub struct StaticClientProvider {
    client: Arc<dyn ExperimentClient>,
}

impl StaticClientProvider {
    /// Create a provider around a single client.
    #[must_use]
    pub fn new(client: Arc<dyn ExperimentClient>) -> Self {
        Self { client }
    }
}

impl ClientProvider for StaticClientProvider {
    fn client(&self, _sdk_key: Option<&str>) -> Result<Arc<dyn ExperimentClient>, ProviderError> {
        Ok(Arc::clone(&self.client))
    }
}

/// Serves one client per SDK key.
///
/// Requests without a key fall back to the default key, when one is set.
#[derive(Clone, Default)]
pub struct KeyedClientProvider {
    clients: HashMap<String, Arc<dyn ExperimentClient>>,
    default_key: Option<String>,
}

impl KeyedClientProvider {
    /// Create an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client under an SDK key.
    #[must_use]
    pub fn with_client(
        mut self,
        sdk_key: impl Into<String>,
        client: Arc<dyn ExperimentClient>,
    ) -> Self {
        self.clients.insert(sdk_key.into(), client);
        self
    }

    /// Use `sdk_key` for requests that do not name one.
    #[must_use]
    pub fn with_default_key(mut self, sdk_key: impl Into<String>) -> Self {
        self.default_key = Some(sdk_key.into());
        self
    }
}

impl ClientProvider for KeyedClientProvider {
    fn client(&self, sdk_key: Option<&str>) -> Result<Arc<dyn ExperimentClient>, ProviderError> {
        let key = sdk_key
            .or(self.default_key.as_deref())
            .ok_or(ProviderError::MissingSdkKey)?;

        self.clients
            .get(key)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownSdkKey(key.to_string()))
    }
}
