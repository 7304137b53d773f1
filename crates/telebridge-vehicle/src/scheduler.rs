//! Refresh scheduling
//!
//! Decides on every tick whether a vehicle should be polled, based on the
//! operator-selected mode and the activity signals kept by the vehicle
//! state. Awake vehicles are polled often; parked ones rarely, so the 12V
//! battery is not drained by wake-ups.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use telebridge_core::{topics, Fact, Facts};

/// Operator-visible refresh mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    Off,
    Periodic,
    Force,
}

impl RefreshMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshMode::Off => "off",
            RefreshMode::Periodic => "periodic",
            RefreshMode::Force => "force",
        }
    }
}

impl fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefreshMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "off" => Ok(RefreshMode::Off),
            "periodic" => Ok(RefreshMode::Periodic),
            "force" => Ok(RefreshMode::Force),
            other => Err(format!("Unknown refresh mode: {}", other)),
        }
    }
}

/// Scheduler state.
///
/// `Force` carries the mode it returns to after firing once. A forced
/// refresh still owed when the operator switches to periodic is kept as
/// `force_pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Off,
    Periodic { force_pending: bool },
    Force { resume_to: RefreshMode },
}

impl RefreshState {
    pub fn mode(&self) -> RefreshMode {
        match self {
            RefreshState::Off => RefreshMode::Off,
            RefreshState::Periodic { .. } => RefreshMode::Periodic,
            RefreshState::Force { .. } => RefreshMode::Force,
        }
    }

    /// State after the operator selects `mode`
    pub fn transition(self, mode: RefreshMode) -> RefreshState {
        match (self, mode) {
            (_, RefreshMode::Off) => RefreshState::Off,
            (RefreshState::Force { resume_to }, RefreshMode::Force) => {
                RefreshState::Force { resume_to }
            }
            (current, RefreshMode::Force) => RefreshState::Force {
                resume_to: current.mode(),
            },
            (RefreshState::Force { .. }, RefreshMode::Periodic) => {
                RefreshState::Periodic { force_pending: true }
            }
            (RefreshState::Periodic { force_pending }, RefreshMode::Periodic) => {
                RefreshState::Periodic { force_pending }
            }
            (RefreshState::Off, RefreshMode::Periodic) => {
                RefreshState::Periodic { force_pending: false }
            }
        }
    }

    fn resumed(resume_to: RefreshMode) -> RefreshState {
        match resume_to {
            RefreshMode::Off => RefreshState::Off,
            _ => RefreshState::Periodic {
                force_pending: false,
            },
        }
    }
}

impl Default for RefreshState {
    fn default() -> Self {
        RefreshState::Periodic {
            force_pending: false,
        }
    }
}

/// Polling periods in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshPeriods {
    /// While the vehicle is awake or recently shut down
    pub active: u64,
    /// While parked
    pub inactive: u64,
    /// Grace window after shutdown during which `active` still applies
    pub after_shutdown: u64,
}

impl Default for RefreshPeriods {
    fn default() -> Self {
        Self {
            active: 30,
            inactive: 86400,
            after_shutdown: 600,
        }
    }
}

/// Activity signals the decision is based on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivitySnapshot {
    pub last_car_activity: Option<DateTime<Utc>>,
    pub last_successful_refresh: Option<DateTime<Utc>>,
    pub last_car_shutdown: DateTime<Utc>,
    pub hv_battery_active: bool,
}

/// Why a decision came out the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    Off,
    Forced,
    ForcePending,
    /// No refresh has ever succeeded
    Bootstrap,
    /// Activity observed after the last successful refresh
    Activity,
    /// Active period elapsed
    ActiveDue,
    /// Inactive period elapsed
    InactiveDue,
    NotDue,
}

/// Outcome of one scheduling tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub refresh: bool,
    pub reason: RefreshReason,
}

impl Decision {
    fn refresh(reason: RefreshReason) -> Self {
        Self {
            refresh: true,
            reason,
        }
    }

    fn skip(reason: RefreshReason) -> Self {
        Self {
            refresh: false,
            reason,
        }
    }
}

/// Per-vehicle refresh scheduler
#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    state: RefreshState,
    periods: RefreshPeriods,
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new(RefreshPeriods::default())
    }
}

impl RefreshScheduler {
    pub fn new(periods: RefreshPeriods) -> Self {
        Self {
            state: RefreshState::default(),
            periods,
        }
    }

    pub fn state(&self) -> RefreshState {
        self.state
    }

    pub fn mode(&self) -> RefreshMode {
        self.state.mode()
    }

    pub fn periods(&self) -> RefreshPeriods {
        self.periods
    }

    pub fn set_mode(&mut self, mode: RefreshMode) -> Facts {
        tracing::info!(mode = %mode, "Setting refresh mode");
        self.state = self.state.transition(mode);
        vec![Fact::new(topics::REFRESH_MODE, mode)]
    }

    pub fn set_period_active(&mut self, seconds: u64) -> Facts {
        self.periods.active = seconds;
        vec![Fact::new(topics::REFRESH_PERIOD_ACTIVE, seconds)]
    }

    pub fn set_period_inactive(&mut self, seconds: u64) -> Facts {
        self.periods.inactive = seconds;
        vec![Fact::new(topics::REFRESH_PERIOD_INACTIVE, seconds)]
    }

    pub fn set_period_after_shutdown(&mut self, seconds: u64) -> Facts {
        self.periods.after_shutdown = seconds;
        vec![Fact::new(topics::REFRESH_PERIOD_INACTIVE_GRACE, seconds)]
    }

    /// Current mode and periods as facts
    pub fn settings(&self) -> Facts {
        vec![
            Fact::new(topics::REFRESH_MODE, self.mode()),
            Fact::new(topics::REFRESH_PERIOD_ACTIVE, self.periods.active),
            Fact::new(topics::REFRESH_PERIOD_INACTIVE, self.periods.inactive),
            Fact::new(topics::REFRESH_PERIOD_INACTIVE_GRACE, self.periods.after_shutdown),
        ]
    }

    /// Decide whether to refresh now.
    ///
    /// Consumes a pending forced refresh. A fired FORCE returns to the mode it
    /// was entered from, and the mode change is returned as a fact.
    pub fn should_refresh(
        &mut self,
        snapshot: &ActivitySnapshot,
        now: DateTime<Utc>,
    ) -> (Decision, Facts) {
        match self.state {
            RefreshState::Off => (Decision::skip(RefreshReason::Off), Vec::new()),
            RefreshState::Force { resume_to } => {
                self.state = RefreshState::resumed(resume_to);
                let facts = vec![Fact::new(topics::REFRESH_MODE, self.mode())];
                (Decision::refresh(RefreshReason::Forced), facts)
            }
            RefreshState::Periodic {
                force_pending: true,
            } => {
                self.state = RefreshState::Periodic {
                    force_pending: false,
                };
                (Decision::refresh(RefreshReason::ForcePending), Vec::new())
            }
            RefreshState::Periodic {
                force_pending: false,
            } => (periodic_decision(&self.periods, snapshot, now), Vec::new()),
        }
    }
}

/// Periodic mode decision, without side effects
pub fn periodic_decision(
    periods: &RefreshPeriods,
    snapshot: &ActivitySnapshot,
    now: DateTime<Utc>,
) -> Decision {
    let Some(last_refresh) = snapshot.last_successful_refresh else {
        return Decision::refresh(RefreshReason::Bootstrap);
    };

    if snapshot
        .last_car_activity
        .is_some_and(|activity| activity > last_refresh)
    {
        return Decision::refresh(RefreshReason::Activity);
    }

    let in_grace = snapshot
        .last_car_shutdown
        .checked_add_signed(seconds(periods.after_shutdown))
        .map_or(true, |grace_until| grace_until > now);
    let older_than = |period: u64| {
        now.checked_sub_signed(seconds(period))
            .is_some_and(|threshold| last_refresh < threshold)
    };

    if snapshot.hv_battery_active || in_grace {
        if older_than(periods.active) {
            return Decision::refresh(RefreshReason::ActiveDue);
        }
    } else if older_than(periods.inactive) {
        return Decision::refresh(RefreshReason::InactiveDue);
    }

    Decision::skip(RefreshReason::NotDue)
}

/// Periods beyond a century are treated as a century
const MAX_PERIOD_SECS: u64 = 100 * 365 * 86400;

fn seconds(value: u64) -> Duration {
    Duration::seconds(value.min(MAX_PERIOD_SECS) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn parked(last_refresh_ago: i64, shutdown_ago: i64) -> ActivitySnapshot {
        ActivitySnapshot {
            last_car_activity: Some(now() - Duration::seconds(100_000)),
            last_successful_refresh: Some(now() - Duration::seconds(last_refresh_ago)),
            last_car_shutdown: now() - Duration::seconds(shutdown_ago),
            hv_battery_active: false,
        }
    }

    #[test]
    fn test_parked_vehicle_uses_inactive_period() {
        let periods = RefreshPeriods::default();
        assert_eq!(
            periodic_decision(&periods, &parked(40, 700), now()),
            Decision::skip(RefreshReason::NotDue)
        );
        assert_eq!(
            periodic_decision(&periods, &parked(90_000, 700), now()),
            Decision::refresh(RefreshReason::InactiveDue)
        );
    }

    #[test]
    fn test_shutdown_grace_uses_active_period() {
        let periods = RefreshPeriods::default();
        assert_eq!(
            periodic_decision(&periods, &parked(40, 300), now()),
            Decision::refresh(RefreshReason::ActiveDue)
        );
        assert_eq!(
            periodic_decision(&periods, &parked(20, 300), now()),
            Decision::skip(RefreshReason::NotDue)
        );
    }

    #[test]
    fn test_hv_active_uses_active_period() {
        let snapshot = ActivitySnapshot {
            hv_battery_active: true,
            ..parked(31, 5000)
        };
        assert!(periodic_decision(&RefreshPeriods::default(), &snapshot, now()).refresh);
    }

    #[test]
    fn test_activity_after_refresh_triggers() {
        let snapshot = ActivitySnapshot {
            last_car_activity: Some(now() - Duration::seconds(5)),
            ..parked(10, 5000)
        };
        assert_eq!(
            periodic_decision(&RefreshPeriods::default(), &snapshot, now()),
            Decision::refresh(RefreshReason::Activity)
        );
    }

    #[test]
    fn test_bootstrap_without_prior_refresh() {
        let snapshot = ActivitySnapshot {
            last_successful_refresh: None,
            ..parked(0, 0)
        };
        assert_eq!(
            periodic_decision(&RefreshPeriods::default(), &snapshot, now()),
            Decision::refresh(RefreshReason::Bootstrap)
        );
    }

    #[test]
    fn test_off_never_refreshes() {
        let mut scheduler = RefreshScheduler::default();
        scheduler.set_mode(RefreshMode::Off);
        let snapshot = ActivitySnapshot {
            last_successful_refresh: None,
            ..parked(0, 0)
        };
        for _ in 0..3 {
            assert!(!scheduler.should_refresh(&snapshot, now()).0.refresh);
        }
    }

    #[test]
    fn test_force_fires_exactly_once() {
        let mut scheduler = RefreshScheduler::default();
        scheduler.set_mode(RefreshMode::Off);
        let facts = scheduler.set_mode(RefreshMode::Force);
        assert_eq!(facts, vec![Fact::new(topics::REFRESH_MODE, "force")]);

        let snapshot = parked(10, 5000);
        let (decision, facts) = scheduler.should_refresh(&snapshot, now());
        assert_eq!(decision, Decision::refresh(RefreshReason::Forced));
        assert_eq!(facts, vec![Fact::new(topics::REFRESH_MODE, "off")]);
        assert_eq!(scheduler.mode(), RefreshMode::Off);

        assert!(!scheduler.should_refresh(&snapshot, now()).0.refresh);
    }

    #[test]
    fn test_force_from_periodic_resumes_periodic() {
        let mut scheduler = RefreshScheduler::default();
        scheduler.set_mode(RefreshMode::Force);
        let snapshot = parked(10, 5000);

        assert!(scheduler.should_refresh(&snapshot, now()).0.refresh);
        assert_eq!(
            scheduler.state(),
            RefreshState::Periodic {
                force_pending: false
            }
        );
        assert_eq!(
            scheduler.should_refresh(&snapshot, now()).0,
            Decision::skip(RefreshReason::NotDue)
        );
    }

    #[test]
    fn test_repeated_force_keeps_resume_target() {
        let state = RefreshState::Off
            .transition(RefreshMode::Force)
            .transition(RefreshMode::Force);
        assert_eq!(
            state,
            RefreshState::Force {
                resume_to: RefreshMode::Off
            }
        );
    }

    #[test]
    fn test_periodic_while_force_pending_consumes_once() {
        let mut scheduler = RefreshScheduler::default();
        scheduler.set_mode(RefreshMode::Off);
        scheduler.set_mode(RefreshMode::Force);
        scheduler.set_mode(RefreshMode::Periodic);
        let snapshot = parked(10, 5000);

        assert_eq!(
            scheduler.should_refresh(&snapshot, now()).0,
            Decision::refresh(RefreshReason::ForcePending)
        );
        assert!(!scheduler.should_refresh(&snapshot, now()).0.refresh);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("FORCE".parse::<RefreshMode>(), Ok(RefreshMode::Force));
        assert_eq!(" periodic ".parse::<RefreshMode>(), Ok(RefreshMode::Periodic));
        assert!("sometimes".parse::<RefreshMode>().is_err());
    }

    #[test]
    fn test_period_setters_publish() {
        let mut scheduler = RefreshScheduler::default();
        assert_eq!(
            scheduler.set_period_inactive(3600),
            vec![Fact::new(topics::REFRESH_PERIOD_INACTIVE, 3600)]
        );
        assert_eq!(scheduler.periods().inactive, 3600);
        assert_eq!(scheduler.settings().len(), 4);
    }
}
