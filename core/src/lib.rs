//! # Experiment Agent Core
//!
//! Core types and client traits for the experiment agent.
//!
//! This crate defines the values that flow from an HTTP request into an
//! experimentation client, and the seams the web layer talks through:
//!
//! - **Values**: [`AttributeValue`] and the [`Attributes`] / [`EventTags`] maps
//! - **Users**: [`UserContext`], the identity an event is attributed to
//! - **Clients**: [`ExperimentClient`], the tracking capability
//! - **Providers**: [`ClientProvider`], which resolves a client per request
//! - **Queueing**: [`QueueingClient`] and [`EventDispatcher`], the bundled
//!   client that batches conversion events onto an [`EventSink`]
//!
//! ## Example
//!
//! ```ignore
//! use experiment_agent_core::*;
//! use std::sync::Arc;
//!
//! let (client, dispatcher) = QueueingClient::new(QueueConfig::default(), Arc::new(LogSink));
//! tokio::spawn(dispatcher.run());
//!
//! let user = UserContext::new("user-1");
//! client.track("purchase", user, EventTags::new()).await?;
//! ```

pub mod client;
pub mod dispatcher;
pub mod event;
pub mod provider;
pub mod queue;
pub mod user;
pub mod value;

pub use client::{ExperimentClient, TrackError, TrackFuture};
pub use dispatcher::{DispatchError, EventDispatcher, EventSink, LogSink};
pub use event::ConversionEvent;
pub use provider::{ClientProvider, KeyedClientProvider, ProviderError, StaticClientProvider};
pub use queue::{MAX_QUEUE_CAPACITY, QueueConfig, QueueingClient};
pub use user::UserContext;
pub use value::{AttributeValue, Attributes, EventTags};
