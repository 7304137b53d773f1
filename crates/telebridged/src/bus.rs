//! In-process retained message bus
//!
//! Retained publications are kept per topic (an empty retained payload
//! clears the topic). Every publication, retained or not, is also fanned
//! out to live subscribers.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use telebridge_core::{MessageSink, SinkError};
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

/// One publication on the bus
#[derive(Debug, Clone, PartialEq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub retained: bool,
    pub qos: u8,
}

impl BusMessage {
    pub fn payload_str(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

pub struct RetainedBus {
    retained: RwLock<BTreeMap<String, Vec<u8>>>,
    events: broadcast::Sender<BusMessage>,
    closed: AtomicBool,
}

impl RetainedBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// `capacity` bounds how far a live subscriber may lag behind
    pub fn with_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self {
            retained: RwLock::new(BTreeMap::new()),
            events,
            closed: AtomicBool::new(false),
        }
    }

    /// Live feed of publications made after this call
    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.events.subscribe()
    }

    pub fn retained(&self, topic: &str) -> Option<Vec<u8>> {
        self.retained.read().get(topic).cloned()
    }

    /// All retained topics with their payloads as text
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.retained
            .read()
            .iter()
            .map(|(topic, payload)| {
                (
                    topic.clone(),
                    String::from_utf8_lossy(payload).into_owned(),
                )
            })
            .collect()
    }

    /// Retained topics under `prefix`
    pub fn snapshot_prefix(&self, prefix: &str) -> BTreeMap<String, String> {
        self.snapshot()
            .into_iter()
            .filter(|(topic, _)| topic.starts_with(prefix))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.retained.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.retained.read().is_empty()
    }

    /// Reject further publications
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl Default for RetainedBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageSink for RetainedBus {
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

        if retained {
            let mut store = self.retained.write();
            if payload.is_empty() {
                store.remove(topic);
            } else {
                store.insert(topic.to_string(), payload.clone());
            }
        }

        // no live subscribers is fine
        let _ = self.events.send(BusMessage {
            topic: topic.to_string(),
            payload,
            retained,
            qos,
        });
        Ok(())
    }
}
