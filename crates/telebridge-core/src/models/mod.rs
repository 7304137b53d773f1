//! Data models shared across the gateway
//!
//! The backend protocol is opaque to the gateway except for the handful of
//! envelope fields and decoded payload fields modelled here.

mod charge;
mod fact;
mod message;
mod request;
mod status;

pub use charge::{ChargeStatus, ChargingGunState};
pub use fact::{Fact, Facts};
pub use message::{
    ApplicationPayload, CommandStatus, PayloadKind, ProtocolMessage, VehicleMessage,
    SESSION_EXPIRED_RESULT_CODE,
};
pub use request::{Credentials, ExchangeKind, ExchangeRequest, RemoteCommand, RequestBody};
pub use status::{BasicVehicleStatus, GpsPosition, Position, VehicleStatus, WayPoint};
