//! HTTP request handlers.

pub mod health;
pub mod track;

pub use health::health_check;
pub use track::{TrackRequestBody, track_event};
