//! HTTP transport adapter

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use super::{Transport, TransportError};

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Whole-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Connect timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Content type sent with every request body
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT.as_millis() as u64
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_millis() as u64
}

fn default_content_type() -> String {
    "application/json".to_string()
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            content_type: default_content_type(),
        }
    }
}

/// Posts encoded requests over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    content_type: HeaderValue,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()
            .map_err(|e| TransportError::InvalidConfig(e.to_string()))?;

        let content_type = HeaderValue::from_str(&config.content_type)
            .map_err(|e| TransportError::InvalidConfig(format!("Invalid content type: {}", e)))?;

        Ok(Self {
            client,
            content_type,
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_connect() {
        TransportError::ConnectionFailed(err.to_string())
    } else {
        TransportError::SendFailed(err.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(len = request.len()))]
    async fn send(&self, url: &Url, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, self.content_type.clone())
            .body(request.to_vec())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| format!("HTTP {}", status));
            return Err(TransportError::HttpStatus {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;

        debug!(status = status.as_u16(), len = body.len(), "Backend responded");
        Ok(body.to_vec())
    }
}
