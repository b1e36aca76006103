//! The experimentation client abstraction.
//!
//! [`ExperimentClient`] is the only capability the track endpoint needs from a
//! client library: record that a user performed an event. Implementations may
//! send synchronously, enqueue for batching, or record calls for tests.

use crate::user::UserContext;
use crate::value::EventTags;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors returned by [`ExperimentClient::track`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackError {
    /// The event key is not part of the client's project.
    #[error("event with key \"{0}\" not found")]
    UnknownEvent(String),

    /// The outbound event queue is at capacity.
    #[error("event queue is full (capacity {capacity})")]
    QueueFull {
        /// Configured queue capacity
        capacity: usize,
    },

    /// The client has been shut down.
    #[error("client is closed")]
    Closed,

    /// Any other client failure.
    #[error("tracking failed: {0}")]
    Other(String),
}

/// Future returned by [`ExperimentClient::track`].
pub type TrackFuture<'a> = Pin<Box<dyn Future<Output = Result<(), TrackError>> + Send + 'a>>;

/// A client able to record conversion events.
///
/// # Dyn Compatibility
///
/// `track` returns a boxed future instead of using `async fn` so that clients
/// can be shared as `Arc<dyn ExperimentClient>` across request handlers.
pub trait ExperimentClient: Send + Sync {
    /// Record that `user` performed the event named `event_key`.
    ///
    /// Each call records one event; calling twice with identical input
    /// records two.
    ///
    /// # Errors
    ///
    /// Returns a [`TrackError`] when the event cannot be recorded.
    fn track<'a>(
        &'a self,
        event_key: &'a str,
        user: UserContext,
        tags: EventTags,
    ) -> TrackFuture<'a>;
}
