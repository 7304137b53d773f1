//! telebridge-exchange - Correlated exchange with the telematics backend
//!
//! This crate provides:
//! - Transport adapters (HTTP via reqwest, scripted mock for tests)
//! - A JSON envelope codec
//! - [`CorrelatedExchange`], the request/resubmit protocol shared by status,
//!   charge and command requests
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use telebridge_core::{Credentials, ExchangeRequest};
//! use telebridge_exchange::{CorrelatedExchange, JsonCodec, transport::MockTransport};
//!
//! let exchange = CorrelatedExchange::new(
//!     Arc::new(MockTransport::new()),
//!     Arc::new(JsonCodec),
//!     url::Url::parse("https://backend.example.com")?,
//! );
//! let response = exchange
//!     .execute(ExchangeRequest::vehicle_status(credentials, "LSJA0000000000001"))
//!     .await?;
//! ```

pub mod codec;
pub mod error;
pub mod exchange;
pub mod transport;

pub use codec::JsonCodec;
pub use error::ExchangeError;
pub use exchange::{next_step, CorrelatedExchange, ExchangeConfig, ExchangeResponse, Step};
pub use transport::{create_transport, MockTransport, Transport, TransportConfig, TransportError};
