//! Backend response envelope and decoded application payloads

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ChargeStatus, VehicleStatus};

/// Result code the backend uses to signal that the session credentials expired
pub const SESSION_EXPIRED_RESULT_CODE: i32 = 2;

/// Kind of application payload a codec decodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    /// Vehicle status request/response
    VehicleStatus,
    /// Charge management data request/response
    ChargeStatus,
    /// Remote vehicle control status response
    CommandStatus,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PayloadKind::VehicleStatus => "vehicle-status",
            PayloadKind::ChargeStatus => "charge-status",
            PayloadKind::CommandStatus => "command-status",
        };
        f.write_str(name)
    }
}

/// Decoded backend response.
///
/// Only the envelope fields the gateway needs are modelled; everything else
/// stays inside the codec. A message lives for one exchange attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolMessage {
    /// Application id of the responding service (e.g. "511")
    pub application_id: String,
    /// Application data protocol version (e.g. 25857)
    pub protocol_version: u32,
    /// Correlation token (backend "event id"); 0 means a new request
    #[serde(default)]
    pub correlation_id: i64,
    /// Whether the backend attached an error message
    #[serde(default)]
    pub error_present: bool,
    /// Backend result code; 0 is success
    #[serde(default)]
    pub result_code: i32,
    /// Raw error message bytes
    #[serde(default)]
    pub error_text: Vec<u8>,
    /// Application payload, absent while the backend is still processing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ApplicationPayload>,
}

impl ProtocolMessage {
    /// Error text as a lossy UTF-8 string
    pub fn error_message(&self) -> String {
        String::from_utf8_lossy(&self.error_text).into_owned()
    }

    /// Whether the result code signals expired credentials
    pub fn is_session_expired(&self) -> bool {
        self.result_code == SESSION_EXPIRED_RESULT_CODE
    }
}

/// Decoded application payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApplicationPayload {
    VehicleStatus(VehicleStatus),
    ChargeStatus(ChargeStatus),
    CommandStatus(CommandStatus),
}

impl ApplicationPayload {
    /// The payload kind this value was decoded as
    pub fn kind(&self) -> PayloadKind {
        match self {
            ApplicationPayload::VehicleStatus(_) => PayloadKind::VehicleStatus,
            ApplicationPayload::ChargeStatus(_) => PayloadKind::ChargeStatus,
            ApplicationPayload::CommandStatus(_) => PayloadKind::CommandStatus,
        }
    }
}

/// Status returned once a remote command has been executed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandStatus {
    /// Echo of the command type that was executed
    #[serde(default)]
    pub command_type: Vec<u8>,
    /// Execution status bytes reported by the vehicle
    #[serde(default)]
    pub status: Vec<u8>,
    /// Failure type, if the vehicle reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_type: Option<i32>,
}

/// Informational message pushed by the backend for a vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleMessage {
    pub message_id: i64,
    pub message_type: String,
    pub title: String,
    pub message_time: DateTime<Utc>,
    pub sender: String,
    pub content: String,
    #[serde(default)]
    pub read_status: Option<i32>,
    pub vin: String,
}
