//! Dispatch Configuration

use action_router::RouterConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::ConfigError;

/// Environment variable prefix, e.g. `PLANT_ALERT_DISPATCH__DEDUP_WINDOW_SECS`
pub const ENV_PREFIX: &str = "PLANT_ALERT";

/// Dispatch configuration, passed to the coordinator at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// How long a delivered alert id is suppressed (default: 24h)
    pub dedup_window_secs: u64,
    /// How long a presented alert stays actionable (default: 1h)
    pub presentation_ttl_secs: u64,
    /// How long to wait for the actuator (default: 10s)
    pub actuator_timeout_secs: u64,
    /// Actuator used when the alert names none
    pub default_device: String,
    /// Presentation channel capacity
    pub presentation_buffer: usize,
    /// Terminal actions kept by the router
    pub archive_capacity: usize,
    /// Period of the background sweep
    pub sweep_interval_secs: u64,
    /// Pump run time for a `Water` command
    pub pump_duration_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            dedup_window_secs: 24 * 3600,
            presentation_ttl_secs: 3600,
            actuator_timeout_secs: 10,
            default_device: "pump".to_string(),
            presentation_buffer: 64,
            archive_capacity: 1000,
            sweep_interval_secs: 300,
            pump_duration_secs: 5,
        }
    }
}

impl DispatchConfig {
    /// Load from an optional file plus `PLANT_ALERT_*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = load_layered(path, ENV_PREFIX)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the coordinator cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("dedup_window_secs", self.dedup_window_secs),
            ("presentation_ttl_secs", self.presentation_ttl_secs),
            ("actuator_timeout_secs", self.actuator_timeout_secs),
            ("sweep_interval_secs", self.sweep_interval_secs),
            ("pump_duration_secs", self.pump_duration_secs),
        ];
        for (field, value) in durations {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be greater than zero", field)));
            }
        }

        // dedup records must outlive the presentation they admitted
        if self.dedup_window_secs < self.presentation_ttl_secs {
            return Err(ConfigError::Invalid(format!(
                "dedup_window_secs ({}) must not be shorter than presentation_ttl_secs ({})",
                self.dedup_window_secs, self.presentation_ttl_secs
            )));
        }
        if self.default_device.trim().is_empty() {
            return Err(ConfigError::Invalid("default_device must not be empty".to_string()));
        }
        if self.presentation_buffer == 0 {
            return Err(ConfigError::Invalid("presentation_buffer must be greater than zero".to_string()));
        }
        Ok(())
    }

    pub fn dedup_window(&self) -> chrono::Duration {
        let secs = i64::try_from(self.dedup_window_secs).unwrap_or(i64::MAX);
        chrono::Duration::seconds(secs.min(i64::MAX / 1000))
    }

    pub fn presentation_ttl(&self) -> Duration {
        Duration::from_secs(self.presentation_ttl_secs)
    }

    pub fn actuator_timeout(&self) -> Duration {
        Duration::from_secs(self.actuator_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn pump_duration(&self) -> Duration {
        Duration::from_secs(self.pump_duration_secs)
    }

    /// Router settings derived from this config
    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            actuator_timeout: self.actuator_timeout(),
            archive_capacity: self.archive_capacity,
            pump_duration: self.pump_duration(),
        }
    }
}

/// Deserialize `T` from an optional file layered under environment
/// variables named `{prefix}_{KEY}`, nested keys separated by `__`.
pub fn load_layered<T: DeserializeOwned>(path: Option<&Path>, prefix: &str) -> Result<T, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        info!("Loading configuration from {}", path.display());
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix(prefix)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    Ok(builder.build()?.try_deserialize()?)
}
