//! Error types shared by the gateway collaborators

use thiserror::Error;

use crate::models::PayloadKind;

/// Errors raised while encoding requests or decoding backend responses
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    /// Request could not be encoded
    #[error("Failed to encode request: {0}")]
    Encode(String),

    /// Response bytes could not be decoded
    #[error("Failed to decode {kind} response: {message}")]
    Decode { kind: PayloadKind, message: String },

    /// Decoded payload does not match the requested kind
    #[error("Unexpected payload: expected {expected}, got {actual}")]
    UnexpectedPayload {
        expected: PayloadKind,
        actual: PayloadKind,
    },
}

/// Errors raised by a message sink
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SinkError {
    /// The sink has been shut down
    #[error("Message sink closed")]
    Closed,
}

/// Errors raised by the route-planner integration
#[derive(Debug, Error)]
pub enum RoutePlannerError {
    /// HTTP or network failure
    #[error("Route planner request failed: {0}")]
    Request(String),

    /// Route planner answered with a non-success status
    #[error("Route planner returned {status}: {message}")]
    Status { status: u16, message: String },
}
