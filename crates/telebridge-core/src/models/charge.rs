//! Decoded charge management payload

use serde::{Deserialize, Serialize};

/// Charge management data response payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChargeStatus {
    /// Battery pack current, raw (0.05 A steps, offset -1000 A)
    pub bms_pack_crnt: i64,
    /// Battery pack voltage, raw (0.25 V steps)
    pub bms_pack_vol: i64,
    /// Remaining charging time in minutes
    pub chrgng_rmnng_time: i64,
    /// Displayed state of charge in 0.1 %
    pub bms_pack_soc_dsp: i64,
    pub charge_status: ChargingGunState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChargingGunState {
    /// Whether a charging gun is plugged in
    pub charging_gun_state: bool,
    /// Charging type code
    pub charging_type: i32,
}
