//! Decoded vehicle status payload
//!
//! Raw integer encodings are kept as delivered by the backend; scaling and
//! sentinel handling happen during normalization.

use serde::{Deserialize, Serialize};

/// Vehicle status response payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleStatus {
    pub basic_vehicle_status: BasicVehicleStatus,
    pub gps_position: GpsPosition,
}

/// Basic vehicle status block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicVehicleStatus {
    /// Engine status, 1 = running
    pub engine_status: i32,
    /// Extended field carrying the charging indicator, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_data2: Option<i32>,
    /// Remote climate status code (0 off, 2 on, 5 front)
    pub remote_climate_status: i32,
    /// Interior temperature in °C, -128 means unknown
    pub interior_temperature: i32,
    /// Exterior temperature in °C, -128 means unknown
    pub exterior_temperature: i32,
    /// Auxiliary battery voltage in 0.1 V
    pub battery_voltage: i32,
    pub lock_status: bool,
    pub driver_door: bool,
    pub passenger_door: bool,
    pub rear_left_door: bool,
    pub rear_right_door: bool,
    pub boot_status: bool,
    pub bonnet_status: bool,
    /// Tyre pressures in units of 0.04 bar
    pub front_left_tyre_pressure: i32,
    pub front_right_tyre_pressure: i32,
    pub rear_left_tyre_pressure: i32,
    pub rear_right_tyre_pressure: i32,
    /// Remote rear window heating state
    pub rear_window_heat_state: i32,
    /// Odometer in 0.1 km, 0 when the vehicle did not report it
    pub mileage: i32,
    /// Electric range in 0.1 km
    pub fuel_range_elec: i32,
}

/// GPS block of the vehicle status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpsPosition {
    pub way_point: WayPoint,
    /// Fix timestamp (seconds since epoch)
    #[serde(default)]
    pub timestamp_4_short: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WayPoint {
    pub position: Position,
    /// Heading in 0.1 degrees
    pub heading: i32,
    /// Speed in 0.1 km/h
    pub speed: i32,
}

/// Position in micro-degrees and metres
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: i32,
    pub longitude: i32,
    pub altitude: i32,
}
