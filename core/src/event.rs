//! Conversion events produced by tracking calls.
//!
//! A [`ConversionEvent`] is the unit the dispatcher batches and hands to an
//! [`EventSink`](crate::dispatcher::EventSink). The reserved `revenue` and
//! `value` tags are lifted into typed fields so sinks do not have to
//! re-parse them.

use crate::user::UserContext;
use crate::value::EventTags;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reserved tag carrying integer revenue (e.g. cents).
pub const REVENUE_TAG: &str = "revenue";

/// Reserved tag carrying a numeric metric value.
pub const VALUE_TAG: &str = "value";

/// A single tracked conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionEvent {
    /// Unique id of this conversion
    pub uuid: Uuid,
    /// When the conversion was recorded
    pub timestamp: DateTime<Utc>,
    /// Key of the tracked event
    pub event_key: String,
    /// User the conversion is attributed to
    pub user: UserContext,
    /// All tags as sent by the caller
    pub tags: EventTags,
    /// Integer `revenue` tag, when present
    pub revenue: Option<i64>,
    /// Numeric `value` tag, when present
    pub value: Option<f64>,
}

impl ConversionEvent {
    /// Build a conversion stamped with a fresh id and the current time.
    #[must_use]
    pub fn new(event_key: impl Into<String>, user: UserContext, tags: EventTags) -> Self {
        Self::at(Utc::now(), event_key, user, tags)
    }

    /// Build a conversion stamped with the given time.
    #[must_use]
    pub fn at(
        timestamp: DateTime<Utc>,
        event_key: impl Into<String>,
        user: UserContext,
        tags: EventTags,
    ) -> Self {
        let revenue = tags.get(REVENUE_TAG).and_then(|v| v.as_i64());
        let value = tags.get(VALUE_TAG).and_then(|v| v.as_f64());

        Self {
            uuid: Uuid::new_v4(),
            timestamp,
            event_key: event_key.into(),
            user,
            tags,
            revenue,
            value,
        }
    }
}
