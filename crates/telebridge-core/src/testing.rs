//! Test utilities shared by the gateway crates
//!
//! [`RecordingSink`] stands in for the message bus and keeps every
//! publication in order.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::SinkError;
use crate::sink::MessageSink;

/// One publication captured by [`RecordingSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: Vec<u8>,
    pub retained: bool,
    pub qos: u8,
}

impl Published {
    pub fn payload_str(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// In-memory sink that records publications
#[derive(Default)]
pub struct RecordingSink {
    published: Mutex<Vec<Published>>,
    closed: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All publications so far
    pub fn published(&self) -> Vec<Published> {
        self.published.lock().clone()
    }

    /// Payloads published on `topic`, oldest first
    pub fn payloads(&self, topic: &str) -> Vec<String> {
        self.published
            .lock()
            .iter()
            .filter(|p| p.topic == topic)
            .map(Published::payload_str)
            .collect()
    }

    /// Most recent payload on `topic`
    pub fn last(&self, topic: &str) -> Option<String> {
        self.payloads(topic).pop()
    }

    /// Publications whose topic ends with `suffix`
    pub fn ending_with(&self, suffix: &str) -> Vec<Published> {
        self.published
            .lock()
            .iter()
            .filter(|p| p.topic.ends_with(suffix))
            .cloned()
            .collect()
    }

    /// Make further publications fail with [`SinkError::Closed`]
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        retained: bool,
        qos: u8,
    ) -> Result<(), SinkError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SinkError::Closed);
        }
        self.published.lock().push(Published {
            topic: topic.to_string(),
            payload,
            retained,
            qos,
        });
        Ok(())
    }
}
