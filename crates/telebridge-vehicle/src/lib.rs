//! telebridge-vehicle - Per-vehicle logic of the telematics gateway
//!
//! This crate provides:
//! - [`VehicleState`]: activity timestamps, power state and normalization of
//!   decoded payloads into facts
//! - [`RefreshScheduler`]: the OFF / PERIODIC / FORCE polling policy
//! - [`VehicleCommand`]: parsing of inbound command and control topics
//! - [`VehicleSession`]: the per-vehicle loop tying scheduler, exchange and
//!   message sink together
//! - [`AbrpClient`]: the route-planner telemetry push

pub mod abrp;
pub mod commands;
pub mod error;
pub mod normalize;
pub mod scheduler;
pub mod session;
pub mod state;

pub use abrp::{AbrpClient, Telemetry};
pub use commands::{ClimateMode, VehicleCommand};
pub use error::{CommandError, SessionError};
pub use normalize::{ChargeReadings, StatusSignals};
pub use scheduler::{
    ActivitySnapshot, Decision, RefreshMode, RefreshPeriods, RefreshReason, RefreshScheduler,
    RefreshState,
};
pub use session::{
    RefreshOutcome, RoutePlannerLink, SessionInput, VehicleConfig, VehicleHandle, VehicleSession,
};
pub use state::{configuration_facts, VehicleState};
