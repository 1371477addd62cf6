//! Alert Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::AlertError;
use crate::LOW_MOISTURE_TYPE;

/// Provider-assigned alert identifier, unique per send
pub type AlertId = String;

/// Actuator endpoint identifier
pub type DeviceId = String;

const DEFAULT_LOW_MOISTURE_TITLE: &str = "Low moisture";
const DEFAULT_LOW_MOISTURE_BODY: &str = "Soil moisture is below the desired level";

/// Alert type as carried in the push payload's `type` field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlertKind {
    /// Soil moisture dropped below the desired level
    LowMoisture,
    /// Any other type, kept verbatim
    Other(String),
}

impl AlertKind {
    /// Wire representation
    pub fn as_str(&self) -> &str {
        match self {
            AlertKind::LowMoisture => LOW_MOISTURE_TYPE,
            AlertKind::Other(raw) => raw,
        }
    }
}

impl From<&str> for AlertKind {
    fn from(raw: &str) -> Self {
        if raw == LOW_MOISTURE_TYPE {
            AlertKind::LowMoisture
        } else {
            AlertKind::Other(raw.to_string())
        }
    }
}

impl From<String> for AlertKind {
    fn from(raw: String) -> Self {
        if raw == LOW_MOISTURE_TYPE {
            AlertKind::LowMoisture
        } else {
            AlertKind::Other(raw)
        }
    }
}

impl From<AlertKind> for String {
    fn from(kind: AlertKind) -> Self {
        match kind {
            AlertKind::LowMoisture => LOW_MOISTURE_TYPE.to_string(),
            AlertKind::Other(raw) => raw,
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    High,
}

/// Action a human can pick from a presented alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Run the pump once
    Water,
}

impl ActionKind {
    /// Button label shown next to the alert
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Water => "Water",
        }
    }

    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Water => "water",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification block of a push message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushNotification {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

/// Raw message as delivered by the push transport
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    /// Provider message id
    #[serde(default)]
    pub message_id: Option<String>,
    /// Key/value data payload (`type`, optional `device`)
    #[serde(default)]
    pub data: HashMap<String, String>,
    /// Display block, absent for data-only messages
    #[serde(default)]
    pub notification: Option<PushNotification>,
}

/// Inbound sensor alert.
///
/// Immutable once built; the coordinator owns it until the alert reaches
/// a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    id: AlertId,
    kind: AlertKind,
    title: String,
    body: String,
    device: Option<DeviceId>,
    received_at: DateTime<Utc>,
}

impl Alert {
    /// Create a new alert
    pub fn new(
        id: impl Into<AlertId>,
        kind: AlertKind,
        title: impl Into<String>,
        body: impl Into<String>,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            title: title.into(),
            body: body.into(),
            device: None,
            received_at,
        }
    }

    /// Target a specific actuator instead of the configured default
    pub fn with_device(mut self, device: impl Into<DeviceId>) -> Self {
        self.device = Some(device.into());
        self
    }

    /// Build an alert from a push message.
    ///
    /// `message_id` and `data.type` are required. A low-moisture message
    /// without a notification block gets a stock title and body.
    pub fn from_push(message: PushMessage, received_at: DateTime<Utc>) -> Result<Self, AlertError> {
        let PushMessage {
            message_id,
            mut data,
            notification,
        } = message;

        let id = message_id.ok_or(AlertError::MissingField("message_id"))?;
        if id.trim().is_empty() {
            return Err(AlertError::EmptyField("message_id"));
        }

        let kind = AlertKind::from(data.remove("type").ok_or(AlertError::MissingField("type"))?);
        let device = data.remove("device").filter(|d| !d.trim().is_empty());

        let notification = notification.unwrap_or_default();
        let (title, body) = match kind {
            AlertKind::LowMoisture => (
                notification
                    .title
                    .unwrap_or_else(|| DEFAULT_LOW_MOISTURE_TITLE.to_string()),
                notification
                    .body
                    .unwrap_or_else(|| DEFAULT_LOW_MOISTURE_BODY.to_string()),
            ),
            AlertKind::Other(_) => (
                notification.title.unwrap_or_default(),
                notification.body.unwrap_or_default(),
            ),
        };

        Ok(Self {
            id,
            kind,
            title,
            body,
            device,
            received_at,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &AlertKind {
        &self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Actuator named by the payload, if any
    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}
