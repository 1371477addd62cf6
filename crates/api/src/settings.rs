//! Service Configuration

use dispatcher::{load_layered, ConfigError, DispatchConfig, ENV_PREFIX};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::rate_limit::RateLimitConfig;

/// Host service configuration.
///
/// Read from an optional TOML file, then `PLANT_ALERT_*` environment
/// variables, e.g. `PLANT_ALERT_LISTEN_ADDR` or
/// `PLANT_ALERT_DISPATCH__PRESENTATION_TTL_SECS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub listen_addr: String,
    /// Pump controller base URL; dry run when unset
    pub actuator_url: Option<String>,
    pub log_level: String,
    pub log_json: bool,
    pub rate_limit: RateLimitConfig,
    pub dispatch: DispatchConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            actuator_url: None,
            log_level: "info".to_string(),
            log_json: false,
            rate_limit: RateLimitConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = load_layered(path, ENV_PREFIX)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dispatch.validate()?;

        if let Some(url) = &self.actuator_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "actuator_url must be an http(s) URL, got {}",
                    url
                )));
            }
        }
        if self.rate_limit.per_second == 0 || self.rate_limit.burst_size == 0 {
            return Err(ConfigError::Invalid("rate_limit values must be greater than zero".to_string()));
        }
        Ok(())
    }
}
