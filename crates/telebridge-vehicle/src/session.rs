//! Vehicle session orchestration
//!
//! One session owns one vehicle: its state, its exchange and its fact
//! publisher. Scheduling ticks and inbound commands are handled in a single
//! task, so a command never races a refresh over the same correlation
//! state.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use telebridge_core::{
    topics, ApplicationPayload, ChargeStatus, Credentials, ExchangeRequest, Fact, FactPublisher,
    RoutePlanner, VehicleMessage, VehicleStatus,
};
use telebridge_exchange::{CorrelatedExchange, ExchangeResponse};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::commands::VehicleCommand;
use crate::error::{CommandError, SessionError};
use crate::scheduler::RefreshPeriods;
use crate::state::VehicleState;

const DEFAULT_TICK: Duration = Duration::from_secs(1);
const INPUT_CHANNEL_CAPACITY: usize = 32;

/// Static description of one registered vehicle
#[derive(Debug, Clone, Default)]
pub struct VehicleConfig {
    pub vin: String,
    /// Model configuration string (`code:X,name:Y,value:Z;...`)
    pub model_configuration: Option<String>,
    /// Per-vehicle route planner token
    pub abrp_user_token: Option<String>,
}

/// Route planner together with the account API key
#[derive(Clone)]
pub struct RoutePlannerLink {
    pub planner: Arc<dyn RoutePlanner>,
    pub api_key: String,
}

/// Input delivered to a running session
#[derive(Debug, Clone)]
pub enum SessionInput {
    /// Command topic relative to the vehicle prefix
    Command {
        topic: String,
        payload: String,
        retained: bool,
    },
    Message(VehicleMessage),
}

/// Result of one refresh cycle
#[derive(Debug, Clone, Default)]
pub struct RefreshOutcome {
    pub status: Option<VehicleStatus>,
    pub charge: Option<ChargeStatus>,
}

impl RefreshOutcome {
    pub fn is_complete(&self) -> bool {
        self.status.is_some() && self.charge.is_some()
    }
}

/// Orchestrates one vehicle
pub struct VehicleSession {
    vehicle: VehicleConfig,
    credentials: Credentials,
    exchange: CorrelatedExchange,
    publisher: FactPublisher,
    state: VehicleState,
    route_planner: Option<RoutePlannerLink>,
    tick_period: Duration,
}

impl VehicleSession {
    pub fn new(
        vehicle: VehicleConfig,
        credentials: Credentials,
        exchange: CorrelatedExchange,
        publisher: FactPublisher,
    ) -> Self {
        let state = VehicleState::new(RefreshPeriods::default(), Utc::now());
        Self {
            vehicle,
            credentials,
            exchange,
            publisher,
            state,
            route_planner: None,
            tick_period: DEFAULT_TICK,
        }
    }

    pub fn with_periods(mut self, periods: RefreshPeriods) -> Self {
        self.state = VehicleState::new(periods, Utc::now());
        self
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick_period = tick;
        self
    }

    pub fn with_route_planner(mut self, link: RoutePlannerLink) -> Self {
        self.route_planner = Some(link);
        self
    }

    pub fn vin(&self) -> &str {
        &self.vehicle.vin
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    async fn publish(&self, facts: &[Fact]) -> Result<(), SessionError> {
        self.publisher.publish_all(facts).await?;
        Ok(())
    }

    /// Publish configuration and settings, and mark the vehicle active
    pub async fn start(&mut self) -> Result<(), SessionError> {
        info!(vin = %self.vehicle.vin, "Starting vehicle session");

        if let Some(configuration) = &self.vehicle.model_configuration {
            let facts = self.state.configure(configuration);
            self.publish(&facts).await?;
        }

        let mut facts = self.state.notify_car_activity_time(Utc::now(), true);
        facts.extend(self.state.refresh_settings());
        self.publish(&facts).await
    }

    /// Run one scheduling tick; returns whether a refresh cycle ran
    pub async fn tick(&mut self) -> Result<bool, SessionError> {
        let (decision, facts) = self.state.should_refresh(Utc::now());
        self.publish(&facts).await?;

        if !decision.refresh {
            return Ok(false);
        }

        debug!(vin = %self.vehicle.vin, reason = ?decision.reason, "Refreshing vehicle");
        self.refresh().await?;
        Ok(true)
    }

    /// One refresh cycle: vehicle status, then charge status
    pub async fn refresh(&mut self) -> Result<RefreshOutcome, SessionError> {
        let status = self.refresh_vehicle_status().await?;
        let charge = self.refresh_charge_status().await?;
        let outcome = RefreshOutcome { status, charge };

        if let (Some(status), Some(charge)) = (&outcome.status, &outcome.charge) {
            self.state.mark_successful_refresh(Utc::now());
            self.push_route_planner(status, charge).await?;
        }

        Ok(outcome)
    }

    async fn refresh_vehicle_status(&mut self) -> Result<Option<VehicleStatus>, SessionError> {
        let request = ExchangeRequest::vehicle_status(self.credentials.clone(), &self.vehicle.vin);
        let Some(response) = self.execute_refresh(request).await? else {
            return Ok(None);
        };

        match response.payload {
            ApplicationPayload::VehicleStatus(status) => {
                let facts = self.state.handle_vehicle_status(
                    &status,
                    &response.application_id,
                    response.protocol_version,
                    Utc::now(),
                );
                self.publish(&facts).await?;
                Ok(Some(status))
            }
            other => {
                warn!(vin = %self.vehicle.vin, kind = %other.kind(), "Unexpected payload for vehicle status");
                Ok(None)
            }
        }
    }

    async fn refresh_charge_status(&mut self) -> Result<Option<ChargeStatus>, SessionError> {
        let request = ExchangeRequest::charge_status(self.credentials.clone(), &self.vehicle.vin);
        let Some(response) = self.execute_refresh(request).await? else {
            return Ok(None);
        };

        match response.payload {
            ApplicationPayload::ChargeStatus(charge) => {
                let facts = self.state.handle_charge_status(
                    &charge,
                    &response.application_id,
                    response.protocol_version,
                    Utc::now(),
                );
                self.publish(&facts).await?;
                Ok(Some(charge))
            }
            other => {
                warn!(vin = %self.vehicle.vin, kind = %other.kind(), "Unexpected payload for charge status");
                Ok(None)
            }
        }
    }

    /// Failed refreshes are skipped until the next tick, except for an
    /// expired session which stops the vehicle loop
    async fn execute_refresh(
        &self,
        request: ExchangeRequest,
    ) -> Result<Option<ExchangeResponse>, SessionError> {
        let kind = request.kind;
        match self.exchange.execute(request).await {
            Ok(response) => Ok(Some(response)),
            Err(e) if e.is_session_expired() => {
                error!(vin = %self.vehicle.vin, error = %e, "Backend session expired");
                Err(SessionError::AuthenticationRequired(e.to_string()))
            }
            Err(e) => {
                warn!(vin = %self.vehicle.vin, %kind, error = %e, "Refresh skipped");
                Ok(None)
            }
        }
    }

    async fn push_route_planner(
        &self,
        status: &VehicleStatus,
        charge: &ChargeStatus,
    ) -> Result<(), SessionError> {
        let (Some(link), Some(user_token)) = (&self.route_planner, &self.vehicle.abrp_user_token)
        else {
            return Ok(());
        };

        match link
            .planner
            .push(&link.api_key, user_token, status, charge)
            .await
        {
            Ok(response) => self.publish(&[Fact::new(topics::INTERNAL_ABRP, response)]).await,
            Err(e) => {
                warn!(vin = %self.vehicle.vin, error = %e, "Route planner push failed");
                Ok(())
            }
        }
    }

    /// Handle one inbound command and publish its acknowledgement
    pub async fn handle_command(
        &mut self,
        topic: &str,
        payload: &str,
        retained: bool,
    ) -> Result<(), SessionError> {
        let outcome = self.execute_command(topic, payload, retained).await;

        let ack = match &outcome {
            Ok(()) => "Success".to_string(),
            Err(e) => {
                warn!(vin = %self.vehicle.vin, topic, error = %e, "Command failed");
                format!("Command failed. {}", e)
            }
        };
        self.publish(&[Fact::ack(topics::result_topic(topic), ack)])
            .await?;

        match outcome {
            Err(e) if e.is_session_expired() => {
                Err(SessionError::AuthenticationRequired(e.to_string()))
            }
            _ => Ok(()),
        }
    }

    async fn execute_command(
        &mut self,
        topic: &str,
        payload: &str,
        retained: bool,
    ) -> Result<(), CommandError> {
        let command = VehicleCommand::parse(topic, payload, retained)?;
        info!(vin = %self.vehicle.vin, ?command, "Handling command");

        let facts = match command {
            VehicleCommand::HvBatteryActive(active) => {
                self.state.set_hv_battery_active(active, Utc::now())
            }
            VehicleCommand::RefreshMode(mode) => self.state.set_refresh_mode(mode),
            VehicleCommand::RefreshPeriodActive(seconds) => {
                self.state.set_refresh_period_active(seconds)
            }
            VehicleCommand::RefreshPeriodInactive(seconds) => {
                self.state.set_refresh_period_inactive(seconds)
            }
            VehicleCommand::RefreshPeriodAfterShutdown(seconds) => {
                self.state.set_refresh_period_after_shutdown(seconds)
            }
            VehicleCommand::DoorsLocked(_) | VehicleCommand::RemoteClimate(_) => Vec::new(),
        };
        self.publish_quietly(&facts).await;

        if let Some(remote) = command.remote_command() {
            // the vehicle is expected to wake up
            let facts = self.state.notify_car_activity_time(Utc::now(), false);
            self.publish_quietly(&facts).await;

            let request =
                ExchangeRequest::command(self.credentials.clone(), &self.vehicle.vin, remote);
            let response = self.exchange.execute(request).await?;
            debug!(vin = %self.vehicle.vin, attempts = response.attempts, "Command executed");
        }

        Ok(())
    }

    async fn publish_quietly(&self, facts: &[Fact]) {
        if let Err(e) = self.publish(facts).await {
            warn!(vin = %self.vehicle.vin, error = %e, "Failed to publish facts");
        }
    }

    /// Handle an informational message pushed for this vehicle
    pub async fn handle_message(&mut self, message: &VehicleMessage) -> Result<(), SessionError> {
        let facts = self.state.notify_message(message);
        self.publish(&facts).await
    }

    /// Run the session until the input channel closes or the session fails
    pub async fn run(mut self, mut inputs: mpsc::Receiver<SessionInput>) -> Result<(), SessionError> {
        self.start().await?;

        let mut interval = tokio::time::interval(self.tick_period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await?;
                }
                input = inputs.recv() => match input {
                    Some(SessionInput::Command { topic, payload, retained }) => {
                        self.handle_command(&topic, &payload, retained).await?;
                    }
                    Some(SessionInput::Message(message)) => {
                        self.handle_message(&message).await?;
                    }
                    None => {
                        info!(vin = %self.vehicle.vin, "Input channel closed, stopping session");
                        return Ok(());
                    }
                },
            }
        }
    }

    /// Spawn the session on the runtime
    pub fn spawn(self) -> (VehicleHandle, JoinHandle<Result<(), SessionError>>) {
        let (tx, rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
        let handle = VehicleHandle {
            vin: self.vehicle.vin.clone(),
            tx,
        };
        let task = tokio::spawn(self.run(rx));
        (handle, task)
    }
}

/// Sender side of a running session
#[derive(Debug, Clone)]
pub struct VehicleHandle {
    vin: String,
    tx: mpsc::Sender<SessionInput>,
}

impl VehicleHandle {
    pub fn vin(&self) -> &str {
        &self.vin
    }

    /// Deliver a command; fails once the session has stopped
    pub async fn send_command(
        &self,
        topic: impl Into<String>,
        payload: impl Into<String>,
        retained: bool,
    ) -> Result<(), SessionError> {
        self.send(SessionInput::Command {
            topic: topic.into(),
            payload: payload.into(),
            retained,
        })
        .await
    }

    pub async fn send_message(&self, message: VehicleMessage) -> Result<(), SessionError> {
        self.send(SessionInput::Message(message)).await
    }

    async fn send(&self, input: SessionInput) -> Result<(), SessionError> {
        self.tx
            .send(input)
            .await
            .map_err(|_| SessionError::Stopped(self.vin.clone()))
    }
}
