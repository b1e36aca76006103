//! The user an event is attributed to.

use crate::value::{AttributeValue, Attributes};
use serde::{Deserialize, Serialize};

/// Identity and attributes passed to a client with every tracked event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    /// User identifier. May be empty; clients decide whether that is valid.
    pub id: String,
    /// Attributes used for audience segmentation.
    #[serde(default)]
    pub attributes: Attributes,
}

impl UserContext {
    /// Create a user context with no attributes.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Attributes::new(),
        }
    }

    /// Create a user context with the given attributes.
    #[must_use]
    pub fn with_attributes(id: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            id: id.into(),
            attributes,
        }
    }

    /// Set a single attribute, replacing any previous value.
    #[must_use]
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}
