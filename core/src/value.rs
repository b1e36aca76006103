//! Attribute and tag values.
//!
//! User attributes and event tags are flat maps of scalar values. Nested
//! objects and arrays are not representable and fail to deserialize, so a
//! request carrying them is rejected before it reaches a client.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A scalar value attached to a user or an event.
///
/// Serialized without a tag: `null`, `true`, `42`, `4.2` and `"text"` map
/// directly onto the variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// JSON `null`.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Whole number that fits in an `i64`.
    Integer(i64),
    /// Any other number.
    Float(f64),
    /// String value.
    String(String),
}

impl AttributeValue {
    /// Returns the value as an integer, accepting floats with no fractional part.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Float(f) if f.fract() == 0.0 && f.is_finite() => {
                // Range-checked before the cast.
                if *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                    Some(*f as i64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Returns any numeric value widened to `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the string payload, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Attributes describing a user.
pub type Attributes = HashMap<String, AttributeValue>;

/// Tags attached to a tracked event (`revenue`, `value`, free-form keys).
pub type EventTags = HashMap<String, AttributeValue>;
