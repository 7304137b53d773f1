//! Transport adapter trait

use async_trait::async_trait;
use url::Url;

use super::TransportError;

/// Request/response primitive the exchange runs on.
///
/// One call posts an encoded request to `url` and returns the raw response
/// body. Implementations own connection handling and timeouts.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send an encoded request and wait for the response body
    async fn send(&self, url: &Url, request: &[u8]) -> Result<Vec<u8>, TransportError>;
}
