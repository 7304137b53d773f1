//! Normalized facts emitted towards the message bus

use std::fmt::Display;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A single (topic, value) publication.
///
/// `topic` is relative to the vehicle prefix; the publisher prepends it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub topic: String,
    pub payload: String,
    pub retained: bool,
    pub qos: u8,
}

/// Batch of facts produced by one state transition
pub type Facts = Vec<Fact>;

impl Fact {
    /// Retained state fact with QoS 0
    pub fn new(topic: impl Into<String>, value: impl Display) -> Self {
        Self {
            topic: topic.into(),
            payload: value.to_string(),
            retained: true,
            qos: 0,
        }
    }

    /// Retained timestamp fact, RFC 3339 in UTC
    pub fn timestamp(topic: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(topic, at.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    /// Non-retained acknowledgement
    pub fn ack(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            retained: false,
            qos: 0,
        }
    }
}
