//! Inbound command parsing
//!
//! Commands arrive as (topic, payload) pairs relative to the vehicle
//! prefix. Remote commands are forwarded to the backend; controls only
//! change local state.

use telebridge_core::{topics, RemoteCommand};

use crate::error::CommandError;
use crate::scheduler::RefreshMode;

/// Remote climate setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClimateMode {
    Off,
    On,
    Front,
}

impl ClimateMode {
    /// Backend climate command with its temperature parameter
    pub fn remote_command(&self) -> RemoteCommand {
        match self {
            ClimateMode::Off => RemoteCommand::climate(0, 0),
            ClimateMode::On => RemoteCommand::climate(2, 8),
            ClimateMode::Front => RemoteCommand::climate(5, 8),
        }
    }
}

/// A parsed inbound command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleCommand {
    DoorsLocked(bool),
    RemoteClimate(ClimateMode),
    HvBatteryActive(bool),
    RefreshMode(RefreshMode),
    RefreshPeriodActive(u64),
    RefreshPeriodInactive(u64),
    RefreshPeriodAfterShutdown(u64),
}

impl VehicleCommand {
    /// Parse a command; retained messages are always rejected
    pub fn parse(topic: &str, payload: &str, retained: bool) -> Result<Self, CommandError> {
        if retained {
            return Err(CommandError::Retained);
        }

        let value = payload.trim().to_lowercase();
        let unsupported = || CommandError::UnsupportedPayload(payload.to_string());

        match topic {
            topics::DOORS_LOCKED => parse_bool(&value)
                .map(VehicleCommand::DoorsLocked)
                .ok_or_else(unsupported),
            topics::DRIVETRAIN_HV_BATTERY_ACTIVE => parse_bool(&value)
                .map(VehicleCommand::HvBatteryActive)
                .ok_or_else(unsupported),
            topics::CLIMATE_REMOTE_CLIMATE_STATE => match value.as_str() {
                "off" => Ok(VehicleCommand::RemoteClimate(ClimateMode::Off)),
                "on" => Ok(VehicleCommand::RemoteClimate(ClimateMode::On)),
                "front" => Ok(VehicleCommand::RemoteClimate(ClimateMode::Front)),
                _ => Err(unsupported()),
            },
            _ => Self::parse_control(topic, &value, payload),
        }
    }

    fn parse_control(topic: &str, value: &str, payload: &str) -> Result<Self, CommandError> {
        let Some(control) = topic.strip_suffix(topics::SET_SUFFIX) else {
            return Err(CommandError::UnsupportedTopic(topic.to_string()));
        };

        match control {
            topics::REFRESH_MODE => value
                .parse::<RefreshMode>()
                .map(VehicleCommand::RefreshMode)
                .map_err(|_| CommandError::UnsupportedPayload(payload.to_string())),
            topics::REFRESH_PERIOD_ACTIVE => {
                parse_period(value).map(VehicleCommand::RefreshPeriodActive)
            }
            topics::REFRESH_PERIOD_INACTIVE => {
                parse_period(value).map(VehicleCommand::RefreshPeriodInactive)
            }
            topics::REFRESH_PERIOD_INACTIVE_GRACE => {
                parse_period(value).map(VehicleCommand::RefreshPeriodAfterShutdown)
            }
            _ => Err(CommandError::UnsupportedTopic(topic.to_string())),
        }
    }

    /// Backend command to send, if this is a remote command
    pub fn remote_command(&self) -> Option<RemoteCommand> {
        match self {
            VehicleCommand::DoorsLocked(true) => Some(RemoteCommand::lock()),
            VehicleCommand::DoorsLocked(false) => Some(RemoteCommand::unlock()),
            VehicleCommand::RemoteClimate(mode) => Some(mode.remote_command()),
            _ => None,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn parse_period(value: &str) -> Result<u64, CommandError> {
    value
        .parse::<u64>()
        .map_err(|_| CommandError::InvalidPeriod(value.to_string()))
}
