//! Application state for the bus API

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use telebridge_core::topics;
use telebridge_vehicle::VehicleHandle;

use crate::bus::RetainedBus;
use crate::error::ApiError;

const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(90);

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    bus: Arc<RetainedBus>,
    /// VIN -> running session
    vehicles: Arc<HashMap<String, VehicleHandle>>,
    account_prefix: String,
    command_timeout: Duration,
}

impl AppState {
    pub fn new(bus: Arc<RetainedBus>, account_prefix: &str) -> Self {
        Self {
            bus,
            vehicles: Arc::new(HashMap::new()),
            account_prefix: account_prefix.trim_end_matches('/').to_string(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn with_vehicles(mut self, handles: impl IntoIterator<Item = VehicleHandle>) -> Self {
        let vehicles = handles
            .into_iter()
            .map(|handle| (handle.vin().to_string(), handle))
            .collect();
        self.vehicles = Arc::new(vehicles);
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn bus(&self) -> &Arc<RetainedBus> {
        &self.bus
    }

    pub fn account_prefix(&self) -> &str {
        &self.account_prefix
    }

    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Get a running session by VIN
    pub fn get_vehicle(&self, vin: &str) -> Result<&VehicleHandle, ApiError> {
        self.vehicles
            .get(vin)
            .ok_or_else(|| ApiError::NotFound(format!("Vehicle not found: {}", vin)))
    }

    /// All VINs, sorted
    pub fn vins(&self) -> Vec<&str> {
        let mut vins: Vec<&str> = self.vehicles.keys().map(String::as_str).collect();
        vins.sort_unstable();
        vins
    }

    pub fn vehicle_prefix(&self, vin: &str) -> String {
        topics::vehicle_prefix(&self.account_prefix, vin)
    }

    /// Split a full command topic into VIN and vehicle-relative topic.
    ///
    /// The topic must have the form `<account_prefix>/vehicles/<vin>/<relative>`.
    pub fn split_command_topic<'a>(&self, topic: &'a str) -> Result<(&'a str, &'a str), ApiError> {
        topic
            .strip_prefix(self.account_prefix.as_str())
            .and_then(|rest| rest.strip_prefix("/vehicles/"))
            .and_then(|rest| rest.split_once('/'))
            .filter(|(vin, relative)| !vin.is_empty() && !relative.is_empty())
            .ok_or_else(|| {
                ApiError::BadRequest(format!(
                    "Topic must start with {}/vehicles/<vin>/: {}",
                    self.account_prefix, topic
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        AppState::new(Arc::new(RetainedBus::new()), "saic/user@example.com/")
    }

    #[test]
    fn test_split_command_topic() {
        let state = state();
        let (vin, relative) = state
            .split_command_topic("saic/user@example.com/vehicles/VIN1/doors/locked")
            .unwrap();
        assert_eq!(vin, "VIN1");
        assert_eq!(relative, "doors/locked");
    }

    #[test]
    fn test_split_command_topic_rejects_foreign_prefix() {
        let state = state();
        assert!(state.split_command_topic("other/vehicles/VIN1/doors/locked").is_err());
        assert!(state
            .split_command_topic("saic/user@example.com/vehicles/VIN1")
            .is_err());
        assert!(state
            .split_command_topic("saic/user@example.com/vehicles//doors/locked")
            .is_err());
    }

    #[test]
    fn test_unknown_vehicle() {
        let state = state();
        assert!(matches!(
            state.get_vehicle("VIN9"),
            Err(ApiError::NotFound(_))
        ));
        assert_eq!(
            state.vehicle_prefix("VIN1"),
            "saic/user@example.com/vehicles/VIN1"
        );
    }
}
