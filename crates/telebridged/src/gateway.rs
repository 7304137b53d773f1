//! Session wiring and supervision
//!
//! Builds one [`VehicleSession`] per configured vehicle, all sharing one
//! transport, codec and sink, and reports the first session that stops.

use std::sync::Arc;

use telebridge_core::{topics, FactPublisher, MessageSink};
use telebridge_exchange::{CorrelatedExchange, JsonCodec, Transport};
use telebridge_vehicle::{AbrpClient, RoutePlannerLink, SessionError, VehicleSession};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::{ConfigError, GatewayConfig};

/// Why a vehicle session ended
#[derive(Debug)]
pub struct SessionExit {
    pub vin: String,
    pub result: Result<(), SessionError>,
}

impl SessionExit {
    pub fn requires_authentication(&self) -> bool {
        matches!(self.result, Err(SessionError::AuthenticationRequired(_)))
    }
}

/// One session per configured vehicle, publishing into `sink`
pub fn build_sessions(
    config: &GatewayConfig,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn MessageSink>,
) -> Result<Vec<VehicleSession>, ConfigError> {
    let exchange = CorrelatedExchange::new(transport, Arc::new(JsonCodec), config.backend_url()?)
        .with_config(config.exchange.exchange_config());

    let route_planner = match &config.abrp.api_key {
        Some(api_key) => {
            let client = AbrpClient::new(&config.abrp.base_url)
                .map_err(|e| ConfigError::Invalid(format!("abrp: {}", e)))?;
            info!(base_url = %client.base_url(), "Route planner integration enabled");
            Some(RoutePlannerLink {
                planner: Arc::new(client),
                api_key: api_key.clone(),
            })
        }
        None => None,
    };

    let credentials = config.credentials.credentials();
    let sessions = config
        .vehicles
        .iter()
        .map(|vehicle| {
            let prefix = topics::vehicle_prefix(config.account_prefix(), &vehicle.vin);
            let session = VehicleSession::new(
                vehicle.vehicle_config(),
                credentials.clone(),
                exchange.clone(),
                FactPublisher::new(sink.clone(), prefix),
            )
            .with_periods(config.refresh.periods())
            .with_tick(config.refresh.tick());

            match &route_planner {
                Some(link) => session.with_route_planner(link.clone()),
                None => session,
            }
        })
        .collect();

    Ok(sessions)
}

/// Funnel session task results into one channel
pub fn watch(
    tasks: Vec<(String, JoinHandle<Result<(), SessionError>>)>,
) -> mpsc::Receiver<SessionExit> {
    let (tx, rx) = mpsc::channel(tasks.len().max(1));

    for (vin, task) in tasks {
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => {
                    error!(vin = %vin, error = %e, "Vehicle task aborted");
                    Err(SessionError::Stopped(vin.clone()))
                }
            };
            let _ = tx.send(SessionExit { vin, result }).await;
        });
    }

    rx
}
