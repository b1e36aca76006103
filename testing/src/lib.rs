//! # Experiment Agent Testing
//!
//! Mocks and helpers for testing code built on the experiment agent.
//!
//! This crate provides:
//! - [`MockClient`]: records every `track` call and returns a scripted outcome
//! - [`FailingProvider`]: a client provider that never resolves
//! - [`RecordingSink`]: an event sink that keeps every dispatched batch
//! - [`LogCapture`]: a tracing layer that captures log records for assertions
//!
//! ## Example
//!
//! ```ignore
//! use experiment_agent_testing::{LogCapture, MockClient};
//!
//! #[tokio::test]
//! async fn test_track() {
//!     let logs = LogCapture::new();
//!     let _guard = logs.set_default();
//!     let client = MockClient::failing(TrackError::UnknownEvent("x".into()));
//!
//!     // ... drive the code under test ...
//!
//!     assert_eq!(client.call_count(), 1);
//!     assert_eq!(logs.at_level(tracing::Level::ERROR).len(), 1);
//! }
//! ```

pub mod logs;

/// Mock implementations of the core client traits.
pub mod mocks {
    use experiment_agent_core::{
        ClientProvider, ConversionEvent, DispatchError, EventSink, EventTags, ExperimentClient,
        ProviderError, TrackError, TrackFuture, UserContext,
    };
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex, PoisonError};

    /// One recorded `track` call.
    #[derive(Debug, Clone, PartialEq)]
    pub struct TrackCall {
        /// Event key passed to the client
        pub event_key: String,
        /// User passed to the client
        pub user: UserContext,
        /// Tags passed to the client
        pub tags: EventTags,
    }

    /// Client that records calls and returns a fixed outcome.
    ///
    /// # Example
    ///
    /// ```
    /// use experiment_agent_testing::mocks::MockClient;
    ///
    /// let client = MockClient::succeeding();
    /// assert_eq!(client.call_count(), 0);
    /// ```
    #[derive(Debug, Default)]
    pub struct MockClient {
        outcome: Option<TrackError>,
        calls: Mutex<Vec<TrackCall>>,
    }

    impl MockClient {
        /// A client whose `track` always succeeds.
        #[must_use]
        pub fn succeeding() -> Self {
            Self::default()
        }

        /// A client whose `track` always fails with `error`.
        #[must_use]
        pub fn failing(error: TrackError) -> Self {
            Self {
                outcome: Some(error),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// All calls received so far, oldest first.
        #[must_use]
        pub fn calls(&self) -> Vec<TrackCall> {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Number of calls received so far.
        #[must_use]
        pub fn call_count(&self) -> usize {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len()
        }
    }

    impl ExperimentClient for MockClient {
        fn track<'a>(
            &'a self,
            event_key: &'a str,
            user: UserContext,
            tags: EventTags,
        ) -> TrackFuture<'a> {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(TrackCall {
                    event_key: event_key.to_string(),
                    user,
                    tags,
                });

            let result = self.outcome.clone().map_or(Ok(()), Err);
            Box::pin(std::future::ready(result))
        }
    }

    /// Provider that fails every resolution with the same error.
    #[derive(Debug, Clone)]
    pub struct FailingProvider(pub ProviderError);

    impl ClientProvider for FailingProvider {
        fn client(
            &self,
            _sdk_key: Option<&str>,
        ) -> Result<Arc<dyn ExperimentClient>, ProviderError> {
            Err(self.0.clone())
        }
    }

    /// Sink that keeps every batch it delivers.
    ///
    /// [`RecordingSink::failing_first`] rejects a number of batches before
    /// delivering; rejected batches are not kept.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        batches: Mutex<Vec<Vec<ConversionEvent>>>,
        failures_left: AtomicUsize,
    }

    impl RecordingSink {
        /// Create an empty sink.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// A sink that rejects the first `count` batches.
        #[must_use]
        pub fn failing_first(count: usize) -> Self {
            Self {
                batches: Mutex::new(Vec::new()),
                failures_left: AtomicUsize::new(count),
            }
        }

        /// Batches received so far, oldest first.
        #[must_use]
        pub fn batches(&self) -> Vec<Vec<ConversionEvent>> {
            self.batches
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// All received events, flattened in arrival order.
        #[must_use]
        pub fn events(&self) -> Vec<ConversionEvent> {
            self.batches().into_iter().flatten().collect()
        }
    }

    impl EventSink for RecordingSink {
        fn dispatch(
            &self,
            batch: Vec<ConversionEvent>,
        ) -> Pin<Box<dyn Future<Output = Result<(), DispatchError>> + Send + '_>> {
            let rejected = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();

            let result = if rejected {
                Err(DispatchError::DeliveryFailed {
                    batch_size: batch.len(),
                    reason: "sink unavailable".to_string(),
                })
            } else {
                self.batches
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(batch);
                Ok(())
            };
            Box::pin(std::future::ready(result))
        }
    }
}

// Re-export commonly used items
pub use logs::{CapturedEvent, LogCapture};
pub use mocks::{FailingProvider, MockClient, RecordingSink, TrackCall};
