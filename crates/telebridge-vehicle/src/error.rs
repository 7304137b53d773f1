//! Vehicle session errors

use telebridge_core::SinkError;
use telebridge_exchange::ExchangeError;
use thiserror::Error;

/// Failure of one inbound command; its text becomes the acknowledgement
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Message may not be retained")]
    Retained,

    #[error("Unsupported topic {0}")]
    UnsupportedTopic(String),

    #[error("Unsupported payload {0}")]
    UnsupportedPayload(String),

    #[error("Invalid period {0}")]
    InvalidPeriod(String),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

impl CommandError {
    pub fn is_session_expired(&self) -> bool {
        matches!(self, CommandError::Exchange(e) if e.is_session_expired())
    }
}

/// Errors that stop a vehicle session
#[derive(Debug, Error)]
pub enum SessionError {
    /// Backend credentials expired; the process must re-authenticate
    #[error("Authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("Message sink error: {0}")]
    Sink(#[from] SinkError),

    /// The session task is no longer running
    #[error("Session for {0} has stopped")]
    Stopped(String),
}
