//! Device configuration loaded once at boot from a JSON document.
//!
//! ```json
//! {
//!   "refresh_interval": 30,
//!   "screen_timeout": 10,
//!   "sensors": {
//!     "temp_1": { "id": "0x3c00000f1e64ff28", "label": "Inside" },
//!     "temp_2": { "id": "0x...", "label": "Outside" },
//!     "temp_3": { "id": "0x...", "label": "Garage" }
//!   }
//! }
//! ```

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};

use serde::Deserialize;
use serde_json::Value;
use thiserror_no_std::Error;

use crate::app_state::Millis;
use crate::sensors::BusId;

pub const DEFAULT_REFRESH_INTERVAL_SECS: u32 = 30;
pub const DEFAULT_SCREEN_TIMEOUT_SECS: u32 = 10;

/// Sensor keys every config must define, in home-screen order.
pub const REQUIRED_SENSOR_KEYS: [&str; 3] = ["temp_1", "temp_2", "temp_3"];

/// Startup configuration errors. Any of these stops the device before the
/// control loop starts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),

    #[error("Config must contain 'sensors' section")]
    MissingSensors,

    #[error("Missing sensor: {key}")]
    MissingSensor { key: &'static str },

    #[error("Sensor {key} missing '{field}' field")]
    MissingField { key: String, field: &'static str },

    #[error("Sensor {key} ID must start with '0x': {id}")]
    InvalidBusId { key: String, id: String },

    #[error("refresh_interval {0}")]
    InvalidRefreshInterval(&'static str),

    #[error("screen_timeout {0}")]
    InvalidScreenTimeout(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorConfig {
    pub bus_id: BusId,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub refresh_interval_secs: u32,
    pub screen_timeout_secs: u32,
    /// Logical sensor key (`temp_1` ...) to bus address and label.
    pub sensors: BTreeMap<String, SensorConfig>,
}

/// Config durations converted to loop milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub refresh_interval_ms: Millis,
    pub screen_timeout_ms: Millis,
}

#[derive(Deserialize)]
struct RawConfig {
    sensors: Option<BTreeMap<String, RawSensor>>,
    refresh_interval: Option<Value>,
    screen_timeout: Option<Value>,
}

#[derive(Deserialize)]
struct RawSensor {
    id: Option<String>,
    label: Option<String>,
}

impl Config {
    /// Parse and validate a JSON config document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            serde_json::from_str(text).map_err(|e| ConfigError::InvalidJson(e.to_string()))?;

        let raw_sensors = raw.sensors.ok_or(ConfigError::MissingSensors)?;
        for key in REQUIRED_SENSOR_KEYS {
            if !raw_sensors.contains_key(key) {
                return Err(ConfigError::MissingSensor { key });
            }
        }

        let mut sensors = BTreeMap::new();
        for (key, sensor) in raw_sensors {
            let id = sensor.id.ok_or_else(|| ConfigError::MissingField {
                key: key.clone(),
                field: "id",
            })?;
            let label = sensor.label.ok_or_else(|| ConfigError::MissingField {
                key: key.clone(),
                field: "label",
            })?;
            if !id.starts_with("0x") {
                return Err(ConfigError::InvalidBusId { key, id });
            }
            sensors.insert(
                key,
                SensorConfig {
                    bus_id: BusId::new(id),
                    label,
                },
            );
        }

        let refresh_interval_secs = match raw.refresh_interval {
            None => DEFAULT_REFRESH_INTERVAL_SECS,
            Some(value) => seconds(&value).map_err(ConfigError::InvalidRefreshInterval)?,
        };

        let screen_timeout_secs = match raw.screen_timeout {
            None => DEFAULT_SCREEN_TIMEOUT_SECS,
            Some(value) => match seconds(&value).map_err(ConfigError::InvalidScreenTimeout)? {
                0 => return Err(ConfigError::InvalidScreenTimeout("must be > 0")),
                secs => secs,
            },
        };

        Ok(Self {
            refresh_interval_secs,
            screen_timeout_secs,
            sensors,
        })
    }

    pub fn sensor(&self, key: &str) -> Option<&SensorConfig> {
        self.sensors.get(key)
    }

    pub fn timing(&self) -> Timing {
        Timing {
            refresh_interval_ms: Millis::from(self.refresh_interval_secs) * 1000,
            screen_timeout_ms: Millis::from(self.screen_timeout_secs) * 1000,
        }
    }
}

fn seconds(value: &Value) -> Result<u32, &'static str> {
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).map_err(|_| "is too large");
    }
    if value.as_i64().is_some() {
        return Err("must be >= 0");
    }
    Err("must be an integer")
}
