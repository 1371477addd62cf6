//! Pending Action Records

use alerting::{ActionKind, AlertId, DeviceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle of an actuator command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Command sent, no answer yet
    Issued,
    /// Actuator confirmed the command
    Acknowledged,
    /// Actuator reported an error
    Failed,
    /// No answer within the actuator timeout
    TimedOut,
}

impl ActionStatus {
    /// Terminal statuses release the routing slot
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ActionStatus::Issued)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Issued => "issued",
            ActionStatus::Acknowledged => "acknowledged",
            ActionStatus::Failed => "failed",
            ActionStatus::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Slot key: one in-flight command per device and action
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub device: DeviceId,
    pub action: ActionKind,
}

impl RouteKey {
    pub fn new(device: impl Into<DeviceId>, action: ActionKind) -> Self {
        Self {
            device: device.into(),
            action,
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.device, self.action)
    }
}

/// A routed command and its outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: Uuid,
    /// Alert whose action triggered the command
    pub alert_id: AlertId,
    pub action: ActionKind,
    pub device: DeviceId,
    pub issued_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub status: ActionStatus,
    /// Actuator error text for failed commands
    pub failure: Option<String>,
}

impl PendingAction {
    /// New record in `Issued` status
    pub fn issued(alert_id: &str, key: &RouteKey, issued_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            alert_id: alert_id.to_string(),
            action: key.action,
            device: key.device.clone(),
            issued_at,
            resolved_at: None,
            status: ActionStatus::Issued,
            failure: None,
        }
    }

    /// Move to a terminal status
    pub(crate) fn resolve(&mut self, status: ActionStatus, failure: Option<String>, at: DateTime<Utc>) {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.failure = failure;
        self.resolved_at = Some(at);
    }

    pub fn key(&self) -> RouteKey {
        RouteKey::new(self.device.clone(), self.action)
    }
}
