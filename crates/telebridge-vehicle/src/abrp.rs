//! A Better Routeplanner (ABRP) telemetry push

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use telebridge_core::{ChargeStatus, RoutePlanner, RoutePlannerError, VehicleStatus};
use tracing::{debug, instrument};
use url::Url;

use crate::normalize::{ChargeReadings, StatusSignals};

/// Default ABRP API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.iternio.com";

const TELEMETRY_PATH: &str = "/1/tlm/send";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// One ABRP telemetry sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Telemetry {
    /// GPS fix time, seconds since epoch
    pub utc: i64,
    pub soc: f64,
    /// kW, positive while driving, negative while charging
    pub power: f64,
    /// km/h
    pub speed: f64,
    pub lat: f64,
    pub lon: f64,
    pub elevation: i32,
    pub is_charging: bool,
    pub is_parked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext_temp: Option<i32>,
    pub voltage: f64,
    pub current: f64,
}

impl Telemetry {
    pub fn new(status: &VehicleStatus, charge: &ChargeStatus) -> Self {
        let basic = &status.basic_vehicle_status;
        let way_point = &status.gps_position.way_point;
        let signals = StatusSignals::from_status(status);
        let readings = ChargeReadings::from_charge(charge);

        Self {
            utc: status.gps_position.timestamp_4_short,
            soc: readings.soc,
            power: readings.power,
            speed: way_point.speed as f64 / 10.0,
            lat: way_point.position.latitude as f64 / 1_000_000.0,
            lon: way_point.position.longitude as f64 / 1_000_000.0,
            elevation: way_point.position.altitude,
            is_charging: signals.is_charging,
            is_parked: !signals.engine_running,
            ext_temp: (basic.exterior_temperature > -128).then_some(basic.exterior_temperature),
            voltage: readings.voltage,
            current: readings.current,
        }
    }
}

#[derive(Serialize)]
struct TelemetryRequest<'a> {
    tlm: &'a Telemetry,
}

/// HTTP client for the ABRP telemetry API
#[derive(Debug, Clone)]
pub struct AbrpClient {
    client: Client,
    base_url: Url,
}

impl AbrpClient {
    pub fn new(base_url: &str) -> Result<Self, RoutePlannerError> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| RoutePlannerError::Request(e.to_string()))?;
        let base_url = Url::parse(base_url)
            .map_err(|e| RoutePlannerError::Request(format!("Invalid URL: {}", e)))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Endpoint with credentials as query parameters
    pub fn telemetry_url(&self, api_key: &str, user_token: &str) -> Result<Url, RoutePlannerError> {
        let mut url = self
            .base_url
            .join(TELEMETRY_PATH)
            .map_err(|e| RoutePlannerError::Request(format!("Invalid URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("api_key", api_key)
            .append_pair("token", user_token);
        Ok(url)
    }
}

#[async_trait]
impl RoutePlanner for AbrpClient {
    #[instrument(skip_all)]
    async fn push(
        &self,
        api_key: &str,
        user_token: &str,
        status: &VehicleStatus,
        charge: &ChargeStatus,
    ) -> Result<String, RoutePlannerError> {
        let telemetry = Telemetry::new(status, charge);
        let url = self.telemetry_url(api_key, user_token)?;

        let response = self
            .client
            .post(url)
            .json(&TelemetryRequest { tlm: &telemetry })
            .send()
            .await
            .map_err(|e| RoutePlannerError::Request(e.to_string()))?;

        let status_code = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RoutePlannerError::Request(e.to_string()))?;

        if !status_code.is_success() {
            return Err(RoutePlannerError::Status {
                status: status_code.as_u16(),
                message: body,
            });
        }

        debug!(response = %body, "Telemetry pushed");
        Ok(body)
    }
}
