//! Exchange errors

use std::time::Duration;

use telebridge_core::CodecError;
use thiserror::Error;

use crate::transport::TransportError;

/// Terminal failures of one correlated exchange
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExchangeError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    /// Backend reported an error for a refresh request; retried next tick
    #[error("Backend not ready (result {result_code}): {message}")]
    NotReady { result_code: i32, message: String },

    /// Backend reported an error for a command
    #[error("{message}")]
    Rejected { result_code: i32, message: String },

    /// Credentials expired; re-authentication is required
    #[error("Session expired: {message}")]
    SessionExpired { message: String },

    #[error("No result after {attempts} attempts")]
    AttemptsExhausted { attempts: u32 },

    #[error("No result within {0:?}")]
    DeadlineExceeded(Duration),
}

impl ExchangeError {
    /// Failures callers should report as "timed out waiting for the backend"
    pub fn is_timeout_class(&self) -> bool {
        match self {
            ExchangeError::Rejected { .. }
            | ExchangeError::AttemptsExhausted { .. }
            | ExchangeError::DeadlineExceeded(_) => true,
            ExchangeError::Transport(e) => e.is_timeout(),
            _ => false,
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ExchangeError::SessionExpired { .. })
    }
}
