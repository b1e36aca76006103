//! Batching dispatcher for queued conversion events.
//!
//! The dispatcher owns the receiving end of a [`QueueingClient`]'s channel.
//! It collects events into batches and hands each batch to an [`EventSink`]
//! once the batch is full or the flush interval elapses, whichever happens
//! first.
//!
//! # Lifecycle
//!
//! ```text
//! track() ──try_send──▶ [bounded channel] ──recv──▶ batch ──flush──▶ EventSink
//! ```
//!
//! When every sender is dropped the channel closes; the dispatcher flushes
//! the partial batch and [`EventDispatcher::run`] returns.
//!
//! [`QueueingClient`]: crate::queue::QueueingClient

use crate::event::ConversionEvent;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// Errors reported by an [`EventSink`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The sink could not deliver the batch.
    #[error("failed to deliver {batch_size} events: {reason}")]
    DeliveryFailed {
        /// Number of events in the failed batch
        batch_size: usize,
        /// Why delivery failed
        reason: String,
    },
}

/// Destination for batches of conversion events.
pub trait EventSink: Send + Sync {
    /// Deliver one batch.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if the batch could not be delivered. The
    /// dispatcher logs and drops failed batches; it does not retry.
    fn dispatch(
        &self,
        batch: Vec<ConversionEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<(), DispatchError>> + Send + '_>>;
}

/// Sink that writes each batch to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn dispatch(
        &self,
        batch: Vec<ConversionEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<(), DispatchError>> + Send + '_>> {
        Box::pin(async move {
            for event in &batch {
                tracing::debug!(
                    uuid = %event.uuid,
                    event_key = %event.event_key,
                    user_id = %event.user.id,
                    revenue = ?event.revenue,
                    value = ?event.value,
                    "conversion"
                );
            }
            tracing::info!(batch_size = batch.len(), "dispatched conversion batch");
            Ok(())
        })
    }
}

/// Drains a conversion queue into an [`EventSink`].
pub struct EventDispatcher {
    receiver: mpsc::Receiver<ConversionEvent>,
    sink: Arc<dyn EventSink>,
    batch_size: usize,
    flush_interval: Duration,
}

impl EventDispatcher {
    /// Create a dispatcher over `receiver`.
    ///
    /// A zero `batch_size` is treated as 1 and a zero `flush_interval` as one
    /// millisecond.
    #[must_use]
    pub fn new(
        receiver: mpsc::Receiver<ConversionEvent>,
        sink: Arc<dyn EventSink>,
        batch_size: usize,
        flush_interval: Duration,
    ) -> Self {
        Self {
            receiver,
            sink,
            batch_size: batch_size.max(1),
            flush_interval: flush_interval.max(Duration::from_millis(1)),
        }
    }

    /// Run until the queue closes, flushing the final partial batch.
    pub async fn run(mut self) {
        let mut batch = Vec::new();
        let mut ticker = tokio::time::interval(self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                received = self.receiver.recv() => match received {
                    Some(event) => {
                        batch.push(event);
                        if batch.len() >= self.batch_size {
                            self.flush(&mut batch).await;
                            ticker.reset();
                        }
                    }
                    None => {
                        self.flush(&mut batch).await;
                        break;
                    }
                },
                _ = ticker.tick() => self.flush(&mut batch).await,
            }
        }

        tracing::debug!("event queue closed, dispatcher stopped");
    }

    async fn flush(&self, batch: &mut Vec<ConversionEvent>) {
        if batch.is_empty() {
            return;
        }

        let events = std::mem::take(batch);
        let count = events.len() as u64;

        match self.sink.dispatch(events).await {
            Ok(()) => {
                metrics::counter!("track.events.dispatched").increment(count);
            }
            Err(e) => {
                tracing::warn!(error = %e, "dropping conversion batch");
                metrics::counter!("track.events.dropped", "reason" => "sink").increment(count);
            }
        }
    }
}
