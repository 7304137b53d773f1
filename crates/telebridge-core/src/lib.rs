//! telebridge-core - Core types and collaborator traits for the telematics gateway
//!
//! This crate provides the vocabulary shared by the exchange, vehicle and
//! daemon crates: the request/response envelope exchanged with the
//! telematics backend, the decoded payloads the gateway inspects, the
//! normalized facts it publishes, and the narrow traits behind which the
//! external collaborators (codec, message bus, route planner) live.

pub mod codec;
pub mod error;
pub mod models;
pub mod route_planner;
pub mod sink;
pub mod testing;
pub mod topics;

pub use codec::MessageCodec;
pub use error::{CodecError, RoutePlannerError, SinkError};
pub use models::*;
pub use route_planner::RoutePlanner;
pub use sink::{FactPublisher, MessageSink};
