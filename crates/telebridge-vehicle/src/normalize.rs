//! Normalization of decoded payloads into facts
//!
//! Raw backend encodings are scaled to physical units here. Values the
//! vehicle reports as "unknown" are suppressed instead of published.

use chrono::{DateTime, Utc};
use serde::Serialize;
use telebridge_core::{topics, ChargeStatus, Fact, Facts, VehicleStatus};
use tracing::warn;

/// Temperatures at or below this value mean "unknown"
const TEMPERATURE_UNKNOWN: i32 = -128;

/// Activity signals derived from a vehicle status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSignals {
    pub engine_running: bool,
    pub is_charging: bool,
    pub remote_climate_status: i32,
}

impl StatusSignals {
    pub fn from_status(status: &VehicleStatus) -> Self {
        let basic = &status.basic_vehicle_status;
        Self {
            engine_running: basic.engine_status == 1,
            is_charging: basic.extended_data2.is_some_and(|value| value >= 1),
            remote_climate_status: basic.remote_climate_status,
        }
    }

    /// Whether the high-voltage battery is considered active
    pub fn hv_battery_active(&self) -> bool {
        self.is_charging || self.engine_running || self.remote_climate_status > 0
    }
}

/// Human-readable remote climate state
pub fn remote_climate_state(code: i32) -> String {
    match code {
        0 => "off".to_string(),
        2 => "on".to_string(),
        5 => "front".to_string(),
        other => format!("unknown ({})", other),
    }
}

/// Charge readings in physical units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargeReadings {
    /// Pack current in A (negative while charging)
    pub current: f64,
    /// Pack voltage in V
    pub voltage: f64,
    /// Power in kW
    pub power: f64,
    /// Remaining charging time in minutes, 0 unless a charger is plugged in
    pub remaining_charging_time: i64,
    pub charger_connected: bool,
    pub charging_type: i32,
    /// State of charge in %
    pub soc: f64,
}

impl ChargeReadings {
    pub fn from_charge(charge: &ChargeStatus) -> Self {
        let current = charge.bms_pack_crnt as f64 / 20.0 - 1000.0;
        let voltage = charge.bms_pack_vol as f64 / 4.0;
        let charger_connected = charge.charge_status.charging_gun_state;
        Self {
            current,
            voltage,
            power: current * voltage / 1000.0,
            remaining_charging_time: if charger_connected {
                charge.chrgng_rmnng_time
            } else {
                0
            },
            charger_connected,
            charging_type: charge.charge_status.charging_type,
            soc: charge.bms_pack_soc_dsp as f64 / 10.0,
        }
    }
}

/// Decoded payload mirrored as JSON on the internal topic
pub fn raw_json_fact<T: Serialize>(
    application_id: &str,
    protocol_version: u32,
    payload: &T,
) -> Option<Fact> {
    match serde_json::to_string(payload) {
        Ok(json) => Some(Fact::new(
            topics::internal_json(application_id, protocol_version),
            json,
        )),
        Err(e) => {
            warn!(error = %e, "Failed to serialize payload mirror");
            None
        }
    }
}

fn tyre_pressure(raw: i32) -> f64 {
    (raw as f64 * 4.0) / 100.0
}

/// Facts for one vehicle status payload
pub fn vehicle_status_facts(status: &VehicleStatus, now: DateTime<Utc>) -> Facts {
    let basic = &status.basic_vehicle_status;
    let way_point = &status.gps_position.way_point;
    let signals = StatusSignals::from_status(status);

    let mut facts = vec![
        Fact::new(topics::DRIVETRAIN_RUNNING, signals.engine_running),
        Fact::new(topics::DRIVETRAIN_CHARGING, signals.is_charging),
    ];

    if basic.interior_temperature > TEMPERATURE_UNKNOWN {
        facts.push(Fact::new(
            topics::CLIMATE_INTERIOR_TEMPERATURE,
            basic.interior_temperature,
        ));
    }
    if basic.exterior_temperature > TEMPERATURE_UNKNOWN {
        facts.push(Fact::new(
            topics::CLIMATE_EXTERIOR_TEMPERATURE,
            basic.exterior_temperature,
        ));
    }

    facts.push(Fact::new(
        topics::DRIVETRAIN_AUXILIARY_BATTERY_VOLTAGE,
        basic.battery_voltage as f64 / 10.0,
    ));

    match serde_json::to_string(&way_point.position) {
        Ok(position) => facts.push(Fact::new(topics::LOCATION_POSITION, position)),
        Err(e) => warn!(error = %e, "Failed to serialize position"),
    }
    facts.push(Fact::new(topics::LOCATION_SPEED, way_point.speed as f64 / 10.0));
    facts.push(Fact::new(
        topics::LOCATION_HEADING,
        way_point.heading as f64 / 10.0,
    ));

    facts.extend([
        Fact::new(topics::DOORS_LOCKED, basic.lock_status),
        Fact::new(topics::DOORS_DRIVER, basic.driver_door),
        Fact::new(topics::DOORS_PASSENGER, basic.passenger_door),
        Fact::new(topics::DOORS_REAR_LEFT, basic.rear_left_door),
        Fact::new(topics::DOORS_REAR_RIGHT, basic.rear_right_door),
        Fact::new(topics::DOORS_BOOT, basic.boot_status),
        Fact::new(topics::DOORS_BONNET, basic.bonnet_status),
        Fact::new(
            topics::TYRES_FRONT_LEFT_PRESSURE,
            tyre_pressure(basic.front_left_tyre_pressure),
        ),
        Fact::new(
            topics::TYRES_FRONT_RIGHT_PRESSURE,
            tyre_pressure(basic.front_right_tyre_pressure),
        ),
        Fact::new(
            topics::TYRES_REAR_LEFT_PRESSURE,
            tyre_pressure(basic.rear_left_tyre_pressure),
        ),
        Fact::new(
            topics::TYRES_REAR_RIGHT_PRESSURE,
            tyre_pressure(basic.rear_right_tyre_pressure),
        ),
        Fact::new(
            topics::CLIMATE_REMOTE_CLIMATE_STATE,
            remote_climate_state(signals.remote_climate_status),
        ),
        Fact::new(topics::CLIMATE_BACK_WINDOW_HEAT, basic.rear_window_heat_state),
    ]);

    // a zero mileage comes with a zero range; both are bogus
    if basic.mileage > 0 {
        facts.push(Fact::new(
            topics::DRIVETRAIN_MILEAGE,
            basic.mileage as f64 / 10.0,
        ));
        facts.push(Fact::new(
            topics::DRIVETRAIN_RANGE,
            basic.fuel_range_elec as f64 / 10.0,
        ));
    }

    facts.push(Fact::timestamp(topics::REFRESH_LAST_VEHICLE_STATE, now));
    facts
}

/// Facts for one charge status payload
pub fn charge_status_facts(charge: &ChargeStatus, now: DateTime<Utc>) -> Facts {
    let readings = ChargeReadings::from_charge(charge);
    vec![
        Fact::new(topics::DRIVETRAIN_CURRENT, readings.current),
        Fact::new(topics::DRIVETRAIN_VOLTAGE, readings.voltage),
        Fact::new(
            topics::DRIVETRAIN_REMAINING_CHARGING_TIME,
            readings.remaining_charging_time,
        ),
        Fact::new(topics::DRIVETRAIN_POWER, readings.power),
        Fact::new(topics::DRIVETRAIN_CHARGER_CONNECTED, readings.charger_connected),
        Fact::new(topics::DRIVETRAIN_CHARGING_TYPE, readings.charging_type),
        Fact::new(topics::DRIVETRAIN_SOC, readings.soc),
        Fact::timestamp(topics::REFRESH_LAST_CHARGE_STATE, now),
    ]
}
