//! HTTP handlers over the retained bus

use std::collections::BTreeMap;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use telebridge_core::{topics, VehicleMessage};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

use crate::bus::BusMessage;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TopicsQuery {
    /// Only topics starting with this prefix
    pub prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommandQuery {
    #[serde(default)]
    pub retained: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VehicleSummary {
    pub vin: String,
    pub prefix: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VehicleListResponse {
    pub items: Vec<VehicleSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResponse {
    pub topic: String,
    /// Acknowledgement text, absent if none arrived in time
    pub result: Option<String>,
}

/// GET /topics
pub async fn list_topics(
    State(state): State<AppState>,
    Query(query): Query<TopicsQuery>,
) -> Json<BTreeMap<String, String>> {
    let snapshot = match query.prefix {
        Some(prefix) => state.bus().snapshot_prefix(&prefix),
        None => state.bus().snapshot(),
    };
    Json(snapshot)
}

/// GET /topics/{*topic}
pub async fn get_topic(
    State(state): State<AppState>,
    Path(topic): Path<String>,
) -> Result<String, ApiError> {
    state
        .bus()
        .retained(&topic)
        .map(|payload| String::from_utf8_lossy(&payload).into_owned())
        .ok_or_else(|| ApiError::NotFound(format!("No retained value for {}", topic)))
}

/// GET /vehicles
pub async fn list_vehicles(State(state): State<AppState>) -> Json<VehicleListResponse> {
    let items = state
        .vins()
        .into_iter()
        .map(|vin| VehicleSummary {
            vin: vin.to_string(),
            prefix: state.vehicle_prefix(vin),
        })
        .collect();
    Json(VehicleListResponse { items })
}

/// POST /commands/{*topic}?retained=<bool>
///
/// Delivers the body as command payload and waits for the acknowledgement
/// on `<topic>/result`. Answers 202 if none arrives within the timeout.
pub async fn send_command(
    State(state): State<AppState>,
    Path(topic): Path<String>,
    Query(query): Query<CommandQuery>,
    payload: String,
) -> Result<(StatusCode, Json<CommandResponse>), ApiError> {
    let (vin, relative) = state.split_command_topic(&topic)?;
    let handle = state.get_vehicle(vin)?;

    info!(vin, topic = relative, retained = query.retained, "Injecting command");

    let mut events = state.bus().subscribe();
    handle
        .send_command(relative, payload, query.retained)
        .await?;

    let result_topic = topics::result_topic(&topic);
    let result = wait_for_result(&mut events, &result_topic, state.command_timeout()).await;
    let status = if result.is_some() {
        StatusCode::OK
    } else {
        StatusCode::ACCEPTED
    };

    Ok((status, Json(CommandResponse { topic, result })))
}

/// POST /vehicles/{vin}/messages
///
/// Hands a backend informational message to the vehicle session. Messages
/// not newer than the last one seen are dropped by the session.
pub async fn post_message(
    State(state): State<AppState>,
    Path(vin): Path<String>,
    Json(message): Json<VehicleMessage>,
) -> Result<StatusCode, ApiError> {
    let handle = state.get_vehicle(&vin)?;
    if message.vin != vin {
        return Err(ApiError::BadRequest(format!(
            "message addressed to '{}', not '{}'",
            message.vin, vin
        )));
    }

    info!(vin = %vin, message_id = message.message_id, "Vehicle message received");
    handle.send_message(message).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn wait_for_result(
    events: &mut broadcast::Receiver<BusMessage>,
    topic: &str,
    timeout: Duration,
) -> Option<String> {
    let wait = async {
        loop {
            match events.recv().await {
                Ok(message) if message.topic == topic => return Some(message.payload_str()),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Command result listener lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    };

    tokio::time::timeout(timeout, wait).await.ok().flatten()
}
