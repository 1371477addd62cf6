//! HTTP Pump Actuator
//!
//! Drives the pump controller's REST interface: `POST /setPumpDuration`
//! with the run time, then `POST /waterPlant`.

use action_router::{Actuator, ActuatorCommand, ActuatorError};
use alerting::ActionKind;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Serialize)]
struct DurationBody {
    /// Whole seconds, as the controller expects
    duration: u64,
}

#[derive(Debug, Serialize)]
struct CommandBody<'a> {
    device: &'a str,
}

/// Actuator backed by the pump controller's HTTP endpoints
pub struct HttpPumpActuator {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPumpActuator {
    /// Create a new actuator client
    ///
    /// `timeout` bounds a single request; the router applies its own
    /// timeout on top.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        info!("Creating HTTP pump actuator for {}", base_url);
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<(), ActuatorError> {
        let url = self.url(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ActuatorError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ActuatorError::Rejected(format!("{} returned {}", url, status)))
        }
    }
}

#[async_trait]
impl Actuator for HttpPumpActuator {
    async fn send_command(&self, command: &ActuatorCommand) -> Result<(), ActuatorError> {
        match command.action {
            ActionKind::Water => {
                let duration = command.duration.as_secs().max(1);
                debug!("Watering {} for {}s", command.device, duration);
                self.post("setPumpDuration", &DurationBody { duration }).await?;
                self.post(
                    "waterPlant",
                    &CommandBody {
                        device: &command.device,
                    },
                )
                .await
            }
        }
    }
}
