//! Correlated request/resubmit exchange
//!
//! The backend answers a request either with a result, with an error, or
//! with an empty envelope meaning "accepted, still processing". In the last
//! case the request is resubmitted carrying the correlation id the backend
//! handed out, until a terminal answer arrives. Resubmission is bounded by
//! an attempt cap and a per-call deadline.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use telebridge_core::{ApplicationPayload, ExchangeKind, ExchangeRequest, MessageCodec, ProtocolMessage};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::ExchangeError;
use crate::transport::Transport;

const DEFAULT_MAX_ATTEMPTS: u32 = 30;
const DEFAULT_DEADLINE: Duration = Duration::from_secs(60);
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Bounds applied to one exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeConfig {
    /// Maximum number of submissions, including the first
    pub max_attempts: u32,
    /// Deadline for the whole exchange
    pub deadline: Duration,
    /// Pause before each resubmission
    pub retry_delay: Duration,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            deadline: DEFAULT_DEADLINE,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Successful outcome of an exchange
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeResponse {
    /// Application id of the answering service
    pub application_id: String,
    /// Protocol version of the answer
    pub protocol_version: u32,
    pub payload: ApplicationPayload,
    /// Number of submissions it took
    pub attempts: u32,
}

/// What to do with a decoded response
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Payload arrived
    Complete(ApplicationPayload),
    /// Backend still processing; resubmit with this correlation id
    Resubmit { correlation_id: i64 },
    /// Terminal failure
    Fail(ExchangeError),
}

/// Classify one decoded response.
///
/// Refresh requests always carry the returned correlation id forward.
/// Commands only do so while the backend reports result code 0; any other
/// code means the backend dropped the operation and correlation restarts
/// at 0.
pub fn next_step(kind: ExchangeKind, message: ProtocolMessage) -> Step {
    if let Some(payload) = message.payload {
        return Step::Complete(payload);
    }

    if message.error_present {
        let text = message.error_message();
        if message.is_session_expired() {
            return Step::Fail(ExchangeError::SessionExpired { message: text });
        }
        let err = if kind.is_refresh() {
            ExchangeError::NotReady {
                result_code: message.result_code,
                message: text,
            }
        } else {
            ExchangeError::Rejected {
                result_code: message.result_code,
                message: text,
            }
        };
        return Step::Fail(err);
    }

    let correlation_id = match kind {
        ExchangeKind::Command if message.result_code != 0 => 0,
        _ => message.correlation_id,
    };
    Step::Resubmit { correlation_id }
}

/// Runs correlated exchanges against one backend
#[derive(Clone)]
pub struct CorrelatedExchange {
    transport: Arc<dyn Transport>,
    codec: Arc<dyn MessageCodec>,
    base_url: Url,
    config: ExchangeConfig,
}

impl CorrelatedExchange {
    pub fn new(transport: Arc<dyn Transport>, codec: Arc<dyn MessageCodec>, base_url: Url) -> Self {
        Self {
            transport,
            codec,
            base_url,
            config: ExchangeConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExchangeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// Backend endpoint for a request kind
    pub fn url_for(&self, kind: ExchangeKind) -> Result<Url, ExchangeError> {
        self.base_url
            .join(kind.path())
            .map_err(|e| ExchangeError::InvalidUrl(e.to_string()))
    }

    /// Perform one logical request until it yields a payload or fails
    #[instrument(skip(self, request), fields(kind = %request.kind, vin = %request.vin))]
    pub async fn execute(&self, request: ExchangeRequest) -> Result<ExchangeResponse, ExchangeError> {
        let deadline = self.config.deadline;
        match tokio::time::timeout(deadline, self.run(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(?deadline, "Exchange deadline exceeded");
                Err(ExchangeError::DeadlineExceeded(deadline))
            }
        }
    }

    async fn run(&self, request: ExchangeRequest) -> Result<ExchangeResponse, ExchangeError> {
        let kind = request.kind;
        let url = self.url_for(kind)?;
        let response_kind = kind.response_payload();

        let mut request = request;
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let encoded = self.codec.encode(&request)?;
            let raw = self.transport.send(&url, &encoded).await?;
            let message = self.codec.decode(response_kind, &raw)?;

            debug!(
                attempt,
                correlation_id = message.correlation_id,
                result_code = message.result_code,
                error_present = message.error_present,
                has_payload = message.payload.is_some(),
                "Decoded response"
            );

            let application_id = message.application_id.clone();
            let protocol_version = message.protocol_version;

            match next_step(kind, message) {
                Step::Complete(payload) => {
                    return Ok(ExchangeResponse {
                        application_id,
                        protocol_version,
                        payload,
                        attempts: attempt,
                    });
                }
                Step::Fail(err) => return Err(err),
                Step::Resubmit { correlation_id } => {
                    if attempt >= self.config.max_attempts {
                        warn!(attempts = attempt, "Backend never produced a result");
                        return Err(ExchangeError::AttemptsExhausted { attempts: attempt });
                    }
                    tokio::time::sleep(self.config.retry_delay).await;
                    request = request
                        .with_correlation_id(correlation_id)
                        .stamped(Utc::now());
                }
            }
        }
    }
}
