//! TOML configuration for the gateway daemon
//!
//! Every section except `[credentials]` and `[[vehicles]]` may be omitted;
//! missing fields fall back to their defaults.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use telebridge_core::Credentials;
use telebridge_exchange::{ExchangeConfig, TransportConfig};
use telebridge_vehicle::abrp::DEFAULT_BASE_URL as DEFAULT_ABRP_URL;
use telebridge_vehicle::{RefreshPeriods, VehicleConfig};
use url::Url;

const DEFAULT_BACKEND_URL: &str = "https://tap-eu.soimt.com";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Telematics backend endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        let transport = TransportConfig::default();
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout_ms: transport.request_timeout_ms,
            connect_timeout_ms: transport.connect_timeout_ms,
        }
    }
}

impl BackendConfig {
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            request_timeout_ms: self.request_timeout_ms,
            connect_timeout_ms: self.connect_timeout_ms,
            ..Default::default()
        }
    }
}

/// Bounds for one correlated exchange
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExchangeSettings {
    pub max_attempts: u32,
    pub deadline_ms: u64,
    pub retry_delay_ms: u64,
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        let config = ExchangeConfig::default();
        Self {
            max_attempts: config.max_attempts,
            deadline_ms: config.deadline.as_millis() as u64,
            retry_delay_ms: config.retry_delay.as_millis() as u64,
        }
    }
}

impl ExchangeSettings {
    pub fn exchange_config(&self) -> ExchangeConfig {
        ExchangeConfig {
            max_attempts: self.max_attempts,
            deadline: Duration::from_millis(self.deadline_ms),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// Scheduler tick and initial refresh periods (seconds)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    pub tick_ms: u64,
    pub period_active: u64,
    pub period_inactive: u64,
    pub period_after_shutdown: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        let periods = RefreshPeriods::default();
        Self {
            tick_ms: 1000,
            period_active: periods.active,
            period_inactive: periods.inactive,
            period_after_shutdown: periods.after_shutdown,
        }
    }
}

impl RefreshSettings {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn periods(&self) -> RefreshPeriods {
        RefreshPeriods {
            active: self.period_active,
            inactive: self.period_inactive,
            after_shutdown: self.period_after_shutdown,
        }
    }
}

/// Message bus surface
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Topic root; vehicles publish under `<account_prefix>/vehicles/<vin>`
    pub account_prefix: String,
    pub listen_port: u16,
    /// Bearer token for the HTTP surface (disabled if not set)
    pub auth_token: Option<String>,
    /// How long a command request waits for its acknowledgement
    pub command_timeout_ms: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            account_prefix: "telebridge".to_string(),
            listen_port: 8090,
            auth_token: None,
            command_timeout_ms: 90_000,
        }
    }
}

impl BusConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

#[derive(Clone, Deserialize)]
pub struct CredentialsConfig {
    pub uid: String,
    pub token: String,
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("uid", &self.uid)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl CredentialsConfig {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.uid, &self.token)
    }
}

/// Route planner integration (disabled without an API key)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AbrpConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for AbrpConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_ABRP_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VehicleEntry {
    pub vin: String,
    #[serde(default)]
    pub abrp_user_token: Option<String>,
    #[serde(default)]
    pub model_configuration: Option<String>,
}

impl VehicleEntry {
    pub fn vehicle_config(&self) -> VehicleConfig {
        VehicleConfig {
            vin: self.vin.clone(),
            model_configuration: self.model_configuration.clone(),
            abrp_user_token: self.abrp_user_token.clone(),
        }
    }
}

/// Top-level gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub exchange: ExchangeSettings,
    #[serde(default)]
    pub refresh: RefreshSettings,
    #[serde(default)]
    pub bus: BusConfig,
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub abrp: AbrpConfig,
    pub vehicles: Vec<VehicleEntry>,
}

impl GatewayConfig {
    /// Load and validate configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backend_url()?;
        Url::parse(&self.abrp.base_url)
            .map_err(|e| ConfigError::Invalid(format!("abrp.base_url: {}", e)))?;

        if self.vehicles.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one [[vehicles]] entry is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for vehicle in &self.vehicles {
            if vehicle.vin.is_empty() || vehicle.vin.contains('/') {
                return Err(ConfigError::Invalid(format!(
                    "invalid VIN '{}'",
                    vehicle.vin
                )));
            }
            if !seen.insert(vehicle.vin.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate VIN '{}'",
                    vehicle.vin
                )));
            }
        }

        if self.exchange.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "exchange.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.exchange.deadline_ms == 0 {
            return Err(ConfigError::Invalid(
                "exchange.deadline_ms must be positive".to_string(),
            ));
        }
        if self.refresh.tick_ms == 0 {
            return Err(ConfigError::Invalid(
                "refresh.tick_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn backend_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.backend.base_url)
            .map_err(|e| ConfigError::Invalid(format!("backend.base_url: {}", e)))
    }

    /// Account prefix without trailing separators
    pub fn account_prefix(&self) -> &str {
        self.bus.account_prefix.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const MINIMAL: &str = r#"
[credentials]
uid = "user"
token = "secret"

[[vehicles]]
vin = "VIN1"
"#;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let file = write_config(MINIMAL);
        let config = GatewayConfig::load(file.path()).unwrap();

        assert_eq!(config.backend.base_url, DEFAULT_BACKEND_URL);
        assert_eq!(config.exchange.max_attempts, 30);
        assert_eq!(config.exchange.deadline_ms, 60_000);
        assert_eq!(config.exchange.retry_delay_ms, 100);
        assert_eq!(config.refresh.periods(), RefreshPeriods::default());
        assert_eq!(config.refresh.tick(), Duration::from_secs(1));
        assert_eq!(config.bus.listen_port, 8090);
        assert!(config.bus.auth_token.is_none());
        assert!(config.abrp.api_key.is_none());
        assert_eq!(config.vehicles[0].vehicle_config().vin, "VIN1");
    }

    #[test]
    fn test_full_config() {
        let file = write_config(
            r#"
[backend]
base_url = "http://localhost:9000"
request_timeout_ms = 5000

[exchange]
max_attempts = 10
deadline_ms = 20000

[refresh]
tick_ms = 500
period_active = 60

[bus]
account_prefix = "saic/user@example.com/"
listen_port = 9999
auth_token = "bus-secret"

[credentials]
uid = "user"
token = "secret"

[abrp]
api_key = "key"

[[vehicles]]
vin = "VIN1"
abrp_user_token = "tok"
model_configuration = "code:J2,name:Body,value:1"

[[vehicles]]
vin = "VIN2"
"#,
        );
        let config = GatewayConfig::load(file.path()).unwrap();

        assert_eq!(config.backend.transport_config().request_timeout_ms, 5000);
        assert_eq!(config.backend.transport_config().connect_timeout_ms, 10_000);
        let exchange = config.exchange.exchange_config();
        assert_eq!(exchange.max_attempts, 10);
        assert_eq!(exchange.deadline, Duration::from_secs(20));
        assert_eq!(exchange.retry_delay, Duration::from_millis(100));
        assert_eq!(config.refresh.periods().active, 60);
        assert_eq!(config.refresh.periods().inactive, 86_400);
        assert_eq!(config.account_prefix(), "saic/user@example.com");
        assert_eq!(config.bus.auth_token.as_deref(), Some("bus-secret"));
        assert_eq!(config.abrp.api_key.as_deref(), Some("key"));
        assert_eq!(config.vehicles.len(), 2);
        assert_eq!(
            config.vehicles[0].vehicle_config().abrp_user_token.as_deref(),
            Some("tok")
        );
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let file = write_config("[[vehicles]]\nvin = \"VIN1\"\n");
        let err = GatewayConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_duplicate_vin_rejected() {
        let file = write_config(&format!("{}\n[[vehicles]]\nvin = \"VIN1\"\n", MINIMAL));
        let err = GatewayConfig::load(file.path()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid configuration: duplicate VIN 'VIN1'"
        );
    }

    #[test]
    fn test_invalid_backend_url_rejected() {
        let file = write_config(&format!("[backend]\nbase_url = \"not a url\"\n{}", MINIMAL));
        let err = GatewayConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_zero_deadline_rejected() {
        let file = write_config(&format!("[exchange]\ndeadline_ms = 0\n{}", MINIMAL));
        let err = GatewayConfig::load(file.path()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid configuration: exchange.deadline_ms must be positive"
        );
    }

    #[test]
    fn test_missing_file() {
        let err = GatewayConfig::load("/nonexistent/telebridge.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_credentials_debug_redacts_token() {
        let file = write_config(MINIMAL);
        let config = GatewayConfig::load(file.path()).unwrap();
        let debug = format!("{:?}", config.credentials);
        assert!(!debug.contains("secret"));
    }
}
