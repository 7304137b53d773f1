//! Per-vehicle state model
//!
//! Holds the activity timestamps and power state of one vehicle together
//! with its refresh scheduler. Every mutating operation takes the current
//! time explicitly and returns the facts to publish, so the model stays
//! free of I/O.

use chrono::{DateTime, Utc};
use telebridge_core::{topics, ChargeStatus, Fact, Facts, VehicleMessage, VehicleStatus};
use tracing::{debug, warn};

use crate::normalize::{self, StatusSignals};
use crate::scheduler::{ActivitySnapshot, Decision, RefreshMode, RefreshPeriods, RefreshReason, RefreshScheduler};

/// Normalized, mutable view of one vehicle
#[derive(Debug, Clone)]
pub struct VehicleState {
    last_car_activity: Option<DateTime<Utc>>,
    last_successful_refresh: Option<DateTime<Utc>>,
    last_car_shutdown: DateTime<Utc>,
    last_vehicle_message: Option<DateTime<Utc>>,
    /// Optimistically active until telemetry says otherwise
    hv_battery_active: bool,
    scheduler: RefreshScheduler,
}

impl VehicleState {
    pub fn new(periods: RefreshPeriods, now: DateTime<Utc>) -> Self {
        Self {
            last_car_activity: None,
            last_successful_refresh: None,
            last_car_shutdown: now,
            last_vehicle_message: None,
            hv_battery_active: true,
            scheduler: RefreshScheduler::new(periods),
        }
    }

    pub fn last_car_activity(&self) -> Option<DateTime<Utc>> {
        self.last_car_activity
    }

    pub fn last_successful_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_successful_refresh
    }

    pub fn last_car_shutdown(&self) -> DateTime<Utc> {
        self.last_car_shutdown
    }

    pub fn last_vehicle_message(&self) -> Option<DateTime<Utc>> {
        self.last_vehicle_message
    }

    pub fn hv_battery_active(&self) -> bool {
        self.hv_battery_active
    }

    pub fn refresh_mode(&self) -> RefreshMode {
        self.scheduler.mode()
    }

    pub fn refresh_periods(&self) -> RefreshPeriods {
        self.scheduler.periods()
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    fn snapshot(&self) -> ActivitySnapshot {
        ActivitySnapshot {
            last_car_activity: self.last_car_activity,
            last_successful_refresh: self.last_successful_refresh,
            last_car_shutdown: self.last_car_shutdown,
            hv_battery_active: self.hv_battery_active,
        }
    }

    /// Record vehicle activity.
    ///
    /// Only moves forward unless `force` is set.
    pub fn notify_car_activity_time(&mut self, at: DateTime<Utc>, force: bool) -> Facts {
        let advance = force || self.last_car_activity.map_or(true, |last| at > last);
        if !advance {
            return Vec::new();
        }
        self.last_car_activity = Some(at);
        vec![Fact::timestamp(topics::REFRESH_LAST_ACTIVITY, at)]
    }

    /// Set the high-voltage battery state.
    ///
    /// An active→inactive transition records the shutdown time; an active
    /// battery counts as activity.
    pub fn set_hv_battery_active(&mut self, active: bool, now: DateTime<Utc>) -> Facts {
        if !active && self.hv_battery_active {
            debug!(at = %now, "Vehicle shut down");
            self.last_car_shutdown = now;
        }
        self.hv_battery_active = active;

        let mut facts = vec![Fact::new(topics::DRIVETRAIN_HV_BATTERY_ACTIVE, active)];
        if active {
            facts.extend(self.notify_car_activity_time(now, true));
        }
        facts
    }

    /// Publish an informational message if it is newer than the last one
    pub fn notify_message(&mut self, message: &VehicleMessage) -> Facts {
        let mut facts = Vec::new();
        let newer = self
            .last_vehicle_message
            .map_or(true, |last| message.message_time > last);

        if newer {
            match serde_json::to_string(message) {
                Ok(json) => facts.push(Fact::new(topics::INFO_LAST_MESSAGE, json)),
                Err(e) => warn!(error = %e, "Failed to serialize vehicle message"),
            }
            self.last_vehicle_message = Some(message.message_time);
        }

        facts.extend(self.notify_car_activity_time(message.message_time, false));
        facts
    }

    /// Record a successful refresh; never moves backwards
    pub fn mark_successful_refresh(&mut self, now: DateTime<Utc>) {
        if self.last_successful_refresh.map_or(true, |last| now > last) {
            self.last_successful_refresh = Some(now);
        }
    }

    /// Scheduling decision for this tick
    pub fn should_refresh(&mut self, now: DateTime<Utc>) -> (Decision, Facts) {
        let snapshot = self.snapshot();
        let (decision, facts) = self.scheduler.should_refresh(&snapshot, now);
        if decision.reason == RefreshReason::Bootstrap {
            self.mark_successful_refresh(now);
        }
        (decision, facts)
    }

    pub fn set_refresh_mode(&mut self, mode: RefreshMode) -> Facts {
        self.scheduler.set_mode(mode)
    }

    pub fn set_refresh_period_active(&mut self, seconds: u64) -> Facts {
        self.scheduler.set_period_active(seconds)
    }

    pub fn set_refresh_period_inactive(&mut self, seconds: u64) -> Facts {
        self.scheduler.set_period_inactive(seconds)
    }

    pub fn set_refresh_period_after_shutdown(&mut self, seconds: u64) -> Facts {
        self.scheduler.set_period_after_shutdown(seconds)
    }

    /// Scheduler settings, published at startup
    pub fn refresh_settings(&self) -> Facts {
        self.scheduler.settings()
    }

    /// Publish the vehicle's model configuration
    pub fn configure(&self, model_configuration: &str) -> Facts {
        configuration_facts(model_configuration)
    }

    /// Apply a decoded vehicle status
    pub fn handle_vehicle_status(
        &mut self,
        status: &VehicleStatus,
        application_id: &str,
        protocol_version: u32,
        now: DateTime<Utc>,
    ) -> Facts {
        let signals = StatusSignals::from_status(status);
        let mut facts = self.set_hv_battery_active(signals.hv_battery_active(), now);
        facts.extend(normalize::raw_json_fact(application_id, protocol_version, status));
        facts.extend(normalize::vehicle_status_facts(status, now));
        facts
    }

    /// Apply a decoded charge status
    pub fn handle_charge_status(
        &mut self,
        charge: &ChargeStatus,
        application_id: &str,
        protocol_version: u32,
        now: DateTime<Utc>,
    ) -> Facts {
        let mut facts: Facts =
            normalize::raw_json_fact(application_id, protocol_version, charge)
                .into_iter()
                .collect();
        facts.extend(normalize::charge_status_facts(charge, now));
        facts
    }
}

/// Facts for a model configuration string `code:X,name:Y,value:Z;...`
///
/// Entries without a `code` or `value` are skipped.
pub fn configuration_facts(model_configuration: &str) -> Facts {
    let mut facts = vec![Fact::new(
        topics::INTERNAL_CONFIGURATION_RAW,
        model_configuration,
    )];

    for entry in model_configuration.split(';').filter(|e| !e.trim().is_empty()) {
        let mut code = None;
        let mut value = None;
        for pair in entry.split(',') {
            match pair.split_once(':') {
                Some(("code", v)) => code = Some(v.trim()),
                Some(("value", v)) => value = Some(v.trim()),
                _ => {}
            }
        }
        match (code, value) {
            (Some(code), Some(value)) if !code.is_empty() => facts.push(Fact::new(
                format!("{}/{}", topics::INFO_CONFIGURATION, code),
                value,
            )),
            _ => warn!(entry = %entry, "Skipping malformed configuration entry"),
        }
    }
    facts
}
