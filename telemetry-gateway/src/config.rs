use crate::readings::ChannelId;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Sensor cloud token cannot be empty")]
    EmptyToken,

    #[error("At least one sensor channel must be configured")]
    NoChannels,

    #[error("Empty channel identifier")]
    EmptyChannel,

    #[error("Duplicate channel identifier: {0}")]
    DuplicateChannel(String),

    #[error("Poll interval must be greater than zero")]
    InvalidPollInterval,

    #[error("HTTP timeout must be greater than zero")]
    InvalidTimeout,
}

/// Gateway configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for the public API
    #[serde(default)]
    pub listener: Listener,
    /// Optional listener for health and readiness probes
    pub admin_listener: Option<Listener>,
    /// Downstream analytics service
    pub analytics: AnalyticsConfig,
    /// Sensor cloud the relay loop and the aggregation endpoint read from
    pub sensor_cloud: SensorCloudConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub timeouts: Timeouts,
    /// Local JSON file served by `GET /api/predictions`
    #[serde(default = "default_predictions_path")]
    pub predictions_path: PathBuf,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        if let Some(admin) = &self.admin_listener {
            admin.validate()?;
        }

        self.sensor_cloud.validate()?;

        if self.relay.poll_interval_ms == 0 {
            return Err(ValidationError::InvalidPollInterval);
        }

        if self.timeouts.http_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }

        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "0.0.0.0".into(),
            port: 5000,
        }
    }
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AnalyticsConfig {
    /// Base URL, e.g. `http://localhost:5001`. Endpoint paths are appended to it.
    pub url: Url,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SensorCloudConfig {
    #[serde(default = "default_sensor_cloud_url")]
    pub url: Url,
    pub token: String,
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelId>,
}

impl SensorCloudConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.token.is_empty() {
            return Err(ValidationError::EmptyToken);
        }

        if self.channels.is_empty() {
            return Err(ValidationError::NoChannels);
        }

        let mut seen = HashSet::new();
        for channel in &self.channels {
            if channel.is_empty() {
                return Err(ValidationError::EmptyChannel);
            }
            if !seen.insert(channel) {
                return Err(ValidationError::DuplicateChannel(channel.clone()));
            }
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RelayConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl RelayConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Bounds every outbound call made by the gateway.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Timeouts {
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Timeouts {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

fn default_sensor_cloud_url() -> Url {
    Url::parse("https://blynk.cloud/external/api/get").expect("static URL is valid")
}

fn default_channels() -> Vec<ChannelId> {
    (0..6).map(|i| format!("V{i}")).collect()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_predictions_path() -> PathBuf {
    PathBuf::from("predictions.json")
}
