//! Topic names, relative to a vehicle prefix `<account>/vehicles/<vin>`

pub const DRIVETRAIN_RUNNING: &str = "drivetrain/running";
pub const DRIVETRAIN_CHARGING: &str = "drivetrain/charging";
pub const DRIVETRAIN_AUXILIARY_BATTERY_VOLTAGE: &str = "drivetrain/auxiliaryBatteryVoltage";
pub const DRIVETRAIN_MILEAGE: &str = "drivetrain/mileage";
pub const DRIVETRAIN_RANGE: &str = "drivetrain/range";
pub const DRIVETRAIN_CURRENT: &str = "drivetrain/current";
pub const DRIVETRAIN_VOLTAGE: &str = "drivetrain/voltage";
pub const DRIVETRAIN_POWER: &str = "drivetrain/power";
pub const DRIVETRAIN_REMAINING_CHARGING_TIME: &str = "drivetrain/remainingChargingTime";
pub const DRIVETRAIN_CHARGER_CONNECTED: &str = "drivetrain/chargerConnected";
pub const DRIVETRAIN_CHARGING_TYPE: &str = "drivetrain/chargingType";
pub const DRIVETRAIN_SOC: &str = "drivetrain/soc";
pub const DRIVETRAIN_HV_BATTERY_ACTIVE: &str = "drivetrain/hvBatteryActive";

pub const CLIMATE_INTERIOR_TEMPERATURE: &str = "climate/interiorTemperature";
pub const CLIMATE_EXTERIOR_TEMPERATURE: &str = "climate/exteriorTemperature";
pub const CLIMATE_REMOTE_CLIMATE_STATE: &str = "climate/remoteClimateState";
pub const CLIMATE_BACK_WINDOW_HEAT: &str = "climate/rearWindowDefrosterHeating";

pub const LOCATION_POSITION: &str = "location/position";
pub const LOCATION_SPEED: &str = "location/speed";
pub const LOCATION_HEADING: &str = "location/heading";

pub const DOORS_LOCKED: &str = "doors/locked";
pub const DOORS_DRIVER: &str = "doors/driver";
pub const DOORS_PASSENGER: &str = "doors/passenger";
pub const DOORS_REAR_LEFT: &str = "doors/rearLeft";
pub const DOORS_REAR_RIGHT: &str = "doors/rearRight";
pub const DOORS_BOOT: &str = "doors/boot";
pub const DOORS_BONNET: &str = "doors/bonnet";

pub const TYRES_FRONT_LEFT_PRESSURE: &str = "tyres/frontLeft/pressure";
pub const TYRES_FRONT_RIGHT_PRESSURE: &str = "tyres/frontRight/pressure";
pub const TYRES_REAR_LEFT_PRESSURE: &str = "tyres/rearLeft/pressure";
pub const TYRES_REAR_RIGHT_PRESSURE: &str = "tyres/rearRight/pressure";

pub const REFRESH_MODE: &str = "refresh/mode";
pub const REFRESH_PERIOD_ACTIVE: &str = "refresh/period/active";
pub const REFRESH_PERIOD_INACTIVE: &str = "refresh/period/inActive";
pub const REFRESH_PERIOD_INACTIVE_GRACE: &str = "refresh/period/inActiveGrace";
pub const REFRESH_LAST_ACTIVITY: &str = "refresh/lastActivity";
pub const REFRESH_LAST_VEHICLE_STATE: &str = "refresh/lastVehicleState";
pub const REFRESH_LAST_CHARGE_STATE: &str = "refresh/lastChargeState";

pub const INFO_LAST_MESSAGE: &str = "info/lastMessage";
pub const INFO_CONFIGURATION: &str = "configuration";

pub const INTERNAL: &str = "_internal";
pub const INTERNAL_CONFIGURATION_RAW: &str = "_internal/configuration/raw";
pub const INTERNAL_ABRP: &str = "_internal/abrp";

/// Suffix of writable control topics
pub const SET_SUFFIX: &str = "/set";
/// Suffix of command acknowledgement topics
pub const RESULT_SUFFIX: &str = "/result";

/// Topic the raw decoded payload of an application is mirrored to
pub fn internal_json(application_id: &str, protocol_version: u32) -> String {
    format!("{}/{}_{}/json", INTERNAL, application_id, protocol_version)
}

/// Acknowledgement topic for a command or control topic
pub fn result_topic(topic: &str) -> String {
    format!("{}{}", topic, RESULT_SUFFIX)
}

/// Prefix under which all facts of one vehicle are published
pub fn vehicle_prefix(account_prefix: &str, vin: &str) -> String {
    format!("{}/vehicles/{}", account_prefix.trim_end_matches('/'), vin)
}
