//! Transport layer for backend communication
//!
//! This module provides transport adapters for talking to the telematics
//! backend:
//! - HTTP adapter built on reqwest
//! - Mock adapter for testing
//!
//! # Example
//!
//! ```ignore
//! use telebridge_exchange::transport::{create_transport, Transport, TransportConfig};
//!
//! let transport = create_transport(&TransportConfig::default())?;
//! let url = url::Url::parse("https://backend.example.com/TAP.Web/ota.mpv21")?;
//! let response = transport.send(&url, &request_bytes).await?;
//! ```

mod adapter;
pub mod error;
pub mod http;
pub mod mock;

pub use adapter::Transport;
pub use error::TransportError;
pub use http::{HttpTransport, TransportConfig};
pub use mock::MockTransport;

use std::sync::Arc;

/// Create the HTTP transport adapter from configuration
pub fn create_transport(config: &TransportConfig) -> Result<Arc<dyn Transport>, TransportError> {
    let adapter = HttpTransport::new(config)?;
    Ok(Arc::new(adapter))
}
