//! The bundled queueing client.
//!
//! [`QueueingClient`] validates the event key, turns each call into a
//! [`ConversionEvent`] and enqueues it without waiting. Delivery happens on
//! the paired [`EventDispatcher`], which the caller spawns.

use crate::client::{ExperimentClient, TrackError, TrackFuture};
use crate::dispatcher::{EventDispatcher, EventSink};
use crate::event::ConversionEvent;
use crate::user::UserContext;
use crate::value::EventTags;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Largest queue a [`QueueingClient`] will allocate; larger capacities are
/// clamped to it.
pub const MAX_QUEUE_CAPACITY: usize = usize::MAX >> 3;

/// Queue and batching parameters for a [`QueueingClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Maximum number of undispatched events (default: 1000)
    pub capacity: usize,
    /// Events per dispatched batch (default: 10)
    pub batch_size: usize,
    /// Maximum time a partial batch waits before flushing (default: 30s)
    pub flush_interval: Duration,
    /// Event keys the client accepts; `None` accepts any key
    pub event_keys: Option<HashSet<String>>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            batch_size: 10,
            flush_interval: Duration::from_secs(30),
            event_keys: None,
        }
    }
}

impl QueueConfig {
    /// Restrict the client to the given event keys.
    #[must_use]
    pub fn with_event_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.event_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }
}

/// Client that enqueues conversions for a background [`EventDispatcher`].
///
/// Cloning shares the queue. The queue closes once every clone is dropped,
/// which lets the dispatcher drain and stop.
#[derive(Clone)]
pub struct QueueingClient {
    sender: mpsc::Sender<ConversionEvent>,
    capacity: usize,
    event_keys: Option<Arc<HashSet<String>>>,
}

impl QueueingClient {
    /// Create a client and the dispatcher that drains it into `sink`.
    ///
    /// The dispatcher does nothing until [`EventDispatcher::run`] is spawned.
    #[must_use]
    pub fn new(config: QueueConfig, sink: Arc<dyn EventSink>) -> (Self, EventDispatcher) {
        let capacity = config.capacity.clamp(1, MAX_QUEUE_CAPACITY);
        let (sender, receiver) = mpsc::channel(capacity);
        let dispatcher =
            EventDispatcher::new(receiver, sink, config.batch_size, config.flush_interval);

        let client = Self {
            sender,
            capacity,
            event_keys: config.event_keys.map(Arc::new),
        };

        (client, dispatcher)
    }

    fn enqueue(
        &self,
        event_key: &str,
        user: UserContext,
        tags: EventTags,
    ) -> Result<(), TrackError> {
        if let Some(keys) = &self.event_keys {
            if !keys.contains(event_key) {
                return Err(TrackError::UnknownEvent(event_key.to_string()));
            }
        }

        let event = ConversionEvent::new(event_key, user, tags);
        match self.sender.try_send(event) {
            Ok(()) => {
                metrics::counter!("track.events.enqueued").increment(1);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                metrics::counter!("track.events.dropped", "reason" => "queue_full").increment(1);
                Err(TrackError::QueueFull {
                    capacity: self.capacity,
                })
            }
            Err(TrySendError::Closed(_)) => Err(TrackError::Closed),
        }
    }
}

impl ExperimentClient for QueueingClient {
    fn track<'a>(
        &'a self,
        event_key: &'a str,
        user: UserContext,
        tags: EventTags,
    ) -> TrackFuture<'a> {
        let result = self.enqueue(event_key, user, tags);
        Box::pin(std::future::ready(result))
    }
}
