//! Requests sent to the telematics backend

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PayloadKind;

/// Session identifiers issued by the backend login
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub uid: String,
    pub token: String,
}

impl Credentials {
    pub fn new(uid: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            token: token.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("uid", &self.uid)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// The three logical request kinds the gateway performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeKind {
    VehicleStatus,
    ChargeStatus,
    Command,
}

impl ExchangeKind {
    /// Backend path the request is posted to
    pub fn path(&self) -> &'static str {
        match self {
            ExchangeKind::VehicleStatus | ExchangeKind::Command => "/TAP.Web/ota.mpv21",
            ExchangeKind::ChargeStatus => "/TAP.Web/ota.mpv30",
        }
    }

    /// Application id of the backend service
    pub fn application_id(&self) -> &'static str {
        match self {
            ExchangeKind::VehicleStatus => "511",
            ExchangeKind::ChargeStatus => "516",
            ExchangeKind::Command => "510",
        }
    }

    /// Application data protocol version
    pub fn protocol_version(&self) -> u32 {
        match self {
            ExchangeKind::VehicleStatus | ExchangeKind::Command => 25857,
            ExchangeKind::ChargeStatus => 768,
        }
    }

    /// Payload kind the response is decoded as
    pub fn response_payload(&self) -> PayloadKind {
        match self {
            ExchangeKind::VehicleStatus => PayloadKind::VehicleStatus,
            ExchangeKind::ChargeStatus => PayloadKind::ChargeStatus,
            ExchangeKind::Command => PayloadKind::CommandStatus,
        }
    }

    /// Status and charge polls are refreshes; a failed refresh is retried next tick
    pub fn is_refresh(&self) -> bool {
        !matches!(self, ExchangeKind::Command)
    }
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExchangeKind::VehicleStatus => "vehicle-status",
            ExchangeKind::ChargeStatus => "charge-status",
            ExchangeKind::Command => "command",
        };
        f.write_str(name)
    }
}

/// Remote vehicle control command with its parameter set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCommand {
    /// Command type byte
    pub command_type: u8,
    /// Parameters keyed by parameter id
    #[serde(default)]
    pub params: BTreeMap<u8, Vec<u8>>,
}

impl RemoteCommand {
    const LOCK: u8 = 0x01;
    const UNLOCK: u8 = 0x02;
    const CLIMATE: u8 = 0x06;

    /// Lock all doors (no parameters)
    pub fn lock() -> Self {
        Self {
            command_type: Self::LOCK,
            params: BTreeMap::new(),
        }
    }

    /// Unlock doors
    pub fn unlock() -> Self {
        let params = BTreeMap::from([
            (4, vec![0x00]),
            (5, vec![0x00]),
            (6, vec![0x00]),
            (7, vec![0x03]),
            (255, vec![0x00]),
        ]);
        Self {
            command_type: Self::UNLOCK,
            params,
        }
    }

    /// Remote climate control
    pub fn climate(command: u8, temperature: u8) -> Self {
        let params = BTreeMap::from([
            (19, vec![command]),
            (20, vec![temperature]),
            (255, vec![0x00]),
        ]);
        Self {
            command_type: Self::CLIMATE,
            params,
        }
    }
}

/// Request-specific body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestBody {
    /// Vehicle status poll with the requested status type
    VehicleStatus { request_type: u8 },
    /// Charge management data poll
    ChargeStatus,
    /// Remote control command
    Command(RemoteCommand),
}

impl RequestBody {
    /// Full vehicle status poll
    pub fn vehicle_status() -> Self {
        RequestBody::VehicleStatus { request_type: 2 }
    }
}

/// One request template, already bound to credentials, vehicle and body.
///
/// Treated as an immutable value: each resubmission builds the next request
/// with [`with_correlation_id`](Self::with_correlation_id) and
/// [`stamped`](Self::stamped).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRequest {
    pub kind: ExchangeKind,
    pub application_id: String,
    pub protocol_version: u32,
    pub vin: String,
    pub credentials: Credentials,
    /// Correlation token, 0 starts a new operation
    pub correlation_id: i64,
    /// Time-varying transport field, refreshed on every submission
    pub issued_at: DateTime<Utc>,
    pub body: RequestBody,
}

impl ExchangeRequest {
    pub fn new(
        kind: ExchangeKind,
        credentials: Credentials,
        vin: impl Into<String>,
        body: RequestBody,
    ) -> Self {
        Self {
            kind,
            application_id: kind.application_id().to_string(),
            protocol_version: kind.protocol_version(),
            vin: vin.into(),
            credentials,
            correlation_id: 0,
            issued_at: Utc::now(),
            body,
        }
    }

    pub fn vehicle_status(credentials: Credentials, vin: impl Into<String>) -> Self {
        Self::new(
            ExchangeKind::VehicleStatus,
            credentials,
            vin,
            RequestBody::vehicle_status(),
        )
    }

    pub fn charge_status(credentials: Credentials, vin: impl Into<String>) -> Self {
        Self::new(
            ExchangeKind::ChargeStatus,
            credentials,
            vin,
            RequestBody::ChargeStatus,
        )
    }

    pub fn command(credentials: Credentials, vin: impl Into<String>, command: RemoteCommand) -> Self {
        Self::new(
            ExchangeKind::Command,
            credentials,
            vin,
            RequestBody::Command(command),
        )
    }

    /// Next request carrying the given correlation id
    pub fn with_correlation_id(self, correlation_id: i64) -> Self {
        Self {
            correlation_id,
            ..self
        }
    }

    /// Next request with refreshed transport fields
    pub fn stamped(self, now: DateTime<Utc>) -> Self {
        Self {
            issued_at: now,
            ..self
        }
    }
}
