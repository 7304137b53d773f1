//! Mock transport adapter for testing

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use url::Url;

use super::{Transport, TransportError};

/// A request captured by [`MockTransport`]
#[derive(Debug, Clone, PartialEq)]
pub struct SentRequest {
    pub url: Url,
    pub body: Vec<u8>,
}

impl SentRequest {
    /// Decode the body as JSON (requests produced by the JSON codec)
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Mock transport that replays scripted responses in order
pub struct MockTransport {
    connected: AtomicBool,
    latency: RwLock<Duration>,
    responses: RwLock<VecDeque<Result<Vec<u8>, TransportError>>>,
    requests: RwLock<Vec<SentRequest>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            latency: RwLock::new(Duration::ZERO),
            responses: RwLock::new(VecDeque::new()),
            requests: RwLock::new(Vec::new()),
        }
    }

    /// Queue a raw response body
    pub fn push_response(&self, response: Vec<u8>) {
        self.responses.write().push_back(Ok(response));
    }

    /// Queue a value serialized as JSON
    pub fn push_json<T: Serialize>(&self, value: &T) {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.push_response(bytes),
            Err(e) => self.push_error(TransportError::ReceiveFailed(e.to_string())),
        }
    }

    /// Queue a transport failure
    pub fn push_error(&self, error: TransportError) {
        self.responses.write().push_back(Err(error));
    }

    /// Simulated round-trip latency
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write() = latency;
    }

    /// Set connection state
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Requests sent so far
    pub fn requests(&self) -> Vec<SentRequest> {
        self.requests.read().clone()
    }

    /// Scripted responses not consumed yet
    pub fn pending_responses(&self) -> usize {
        self.responses.read().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, url: &Url, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed);
        }

        self.requests.write().push(SentRequest {
            url: url.clone(),
            body: request.to_vec(),
        });

        let latency = *self.latency.read();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        tracing::debug!(%url, request = %hex::encode(request), "Mock transport: sent request");

        self.responses
            .write()
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::ReceiveFailed(
                    "No mock response configured".to_string(),
                ))
            })
    }
}
