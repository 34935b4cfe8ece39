use derive_more::{Display, Error, From};
use log::{debug, info, warn, LevelFilter};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;

/// Wheel circumference in meters.
pub const DEFAULT_WHEEL_CIRCUMFERENCE_M: f64 = 2.1;
/// Interval between periodic telemetry samples.
pub const DEFAULT_TELEMETRY_INTERVAL_MS: u64 = 5000;
/// Maximum reply payload accepted by the reference characteristic.
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 20;

/// Simulated engine speed range (RPM), inclusive.
pub const RPM_RANGE: RangeInclusive<i64> = 800..=3000;
/// Simulated coolant temperature range (°C), inclusive.
pub const ENGINE_TEMP_RANGE: RangeInclusive<i64> = 70..=100;

/// Configurable log level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    #[must_use]
    pub const fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::Off => LevelFilter::Off,
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
        }
    }
}

#[derive(Debug, Display, Error, From)]
pub enum ConfigError {
    #[display("failed to read config: {_0}")]
    Io(std::io::Error),
    #[display("failed to parse config: {_0}")]
    Parse(serde_json::Error),
}

/// Build-time defaults, overridable by the embedding application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_wheel_circumference_m")]
    pub wheel_circumference_m: f64,
    #[serde(default = "default_telemetry_interval_ms")]
    pub telemetry_interval_ms: u64,
    /// Replies longer than this are truncated before they reach the transport
    #[serde(default = "default_max_payload_len")]
    pub max_payload_len: usize,
    #[serde(default)]
    pub log_level: LogLevel,
}

const fn default_wheel_circumference_m() -> f64 {
    DEFAULT_WHEEL_CIRCUMFERENCE_M
}

const fn default_telemetry_interval_ms() -> u64 {
    DEFAULT_TELEMETRY_INTERVAL_MS
}

const fn default_max_payload_len() -> usize {
    DEFAULT_MAX_PAYLOAD_LEN
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wheel_circumference_m: default_wheel_circumference_m(),
            telemetry_interval_ms: default_telemetry_interval_ms(),
            max_payload_len: default_max_payload_len(),
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry_interval_ms)
    }

    /// Reset out-of-range values to their defaults
    pub fn validate(&mut self) {
        if !self.wheel_circumference_m.is_finite() || self.wheel_circumference_m <= 0.0 {
            warn!(
                "Invalid wheel_circumference_m {}, resetting to {DEFAULT_WHEEL_CIRCUMFERENCE_M}",
                self.wheel_circumference_m
            );
            self.wheel_circumference_m = DEFAULT_WHEEL_CIRCUMFERENCE_M;
        }
        if self.telemetry_interval_ms == 0 {
            warn!("telemetry_interval_ms is 0, resetting to {DEFAULT_TELEMETRY_INTERVAL_MS}");
            self.telemetry_interval_ms = DEFAULT_TELEMETRY_INTERVAL_MS;
        }
        if self.max_payload_len == 0 {
            warn!("max_payload_len is 0, resetting to {DEFAULT_MAX_PAYLOAD_LEN}");
            self.max_payload_len = DEFAULT_MAX_PAYLOAD_LEN;
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut config: Config = serde_json::from_str(json)?;
        config.validate();
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading config from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        debug!(
            "Config parsed: wheel={}m interval={}ms payload_cap={} log_level={:?}",
            config.wheel_circumference_m,
            config.telemetry_interval_ms,
            config.max_payload_len,
            config.log_level
        );
        Ok(config)
    }

    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("{e}, using defaults");
                Self::default()
            }
        }
    }
}
