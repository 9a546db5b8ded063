use crate::error::{ExporterError, Result as ExporterResult};
use crate::metrics::DEFAULT_NAMESPACE;
use crate::registers::{EnergyScale, PowerUnit};
use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub meter: MeterConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MeterConfig {
    /// `host:port`, bare host, or serial device path
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub mode: TriggerMode,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// No default: must be chosen per deployment
    #[serde(default)]
    pub energy_scale: Option<EnergyScale>,
    #[serde(default)]
    pub power_unit: PowerUnit,
}

/// When the meter is polled
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    /// Every scrape opens a session, polls and publishes before responding
    #[default]
    OnDemand,
    /// A timer polls over a long-lived session; scrapes serve the last values
    Background,
}

fn default_unit_id() -> u8 {
    1
}

fn default_timeout() -> u64 {
    5
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9100
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_poll_interval() -> u64 {
    10
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            unit_id: default_unit_id(),
            timeout_seconds: default_timeout(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            port: default_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            mode: TriggerMode::default(),
            poll_interval_seconds: default_poll_interval(),
            energy_scale: None,
            power_unit: PowerUnit::default(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        // Load environment variables from .env if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("POWERMETER_EXPORTER").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Check settings that have no usable default.
    ///
    /// Run after CLI overrides are applied, since the endpoint usually comes
    /// from the environment.
    pub fn validate(&self) -> ExporterResult<()> {
        if self.meter.endpoint.trim().is_empty() {
            return Err(ExporterError::Config(
                "meter endpoint not set (POWERMETER_CONN or meter.endpoint)".to_string(),
            ));
        }
        if self.metrics.energy_scale.is_none() {
            return Err(ExporterError::Config(
                "metrics.energy_scale must be set to centi_kwh or milli_kwh".to_string(),
            ));
        }
        if self.meter.timeout_seconds == 0 {
            return Err(ExporterError::Config(
                "meter.timeout_seconds must be greater than zero".to_string(),
            ));
        }
        if self.metrics.mode == TriggerMode::Background && self.metrics.poll_interval_seconds == 0
        {
            return Err(ExporterError::Config(
                "metrics.poll_interval_seconds must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Energy scale after [`Config::validate`] has passed
    pub fn energy_scale(&self) -> ExporterResult<EnergyScale> {
        self.metrics.energy_scale.ok_or_else(|| {
            ExporterError::Config("metrics.energy_scale is not configured".to_string())
        })
    }
}
