//! Dispatch Error Types

use action_router::RouteError;
use alerting::{ActionKind, AlertId, DeviceId};
use thiserror::Error;
use uuid::Uuid;

use crate::state::AlertState;

/// Errors returned to the party reporting a user action
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Never presented, or already forgotten
    #[error("Unknown alert: {0}")]
    UnknownAlert(AlertId),

    /// Presentation TTL elapsed before the user acted
    #[error("Alert {0} expired and is no longer actionable")]
    Expired(AlertId),

    /// Action not among the alert's available actions
    #[error("Alert {alert_id} does not offer {action}")]
    ActionNotOffered { alert_id: AlertId, action: ActionKind },

    /// Alert is not waiting for a user action
    #[error("Alert {alert_id} is {state}, not awaiting a user action")]
    NotActionable { alert_id: AlertId, state: AlertState },

    /// Same device and action still has an unresolved command
    #[error("{action} already in flight on {device}")]
    AlreadyInFlight {
        device: DeviceId,
        action: ActionKind,
        pending_id: Uuid,
    },

    /// Routing failed for another reason
    #[error(transparent)]
    Route(RouteError),
}

impl From<RouteError> for DispatchError {
    fn from(err: RouteError) -> Self {
        match err {
            RouteError::AlreadyInFlight {
                device,
                action,
                pending_id,
            } => DispatchError::AlreadyInFlight {
                device,
                action,
                pending_id,
            },
            other => DispatchError::Route(other),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File or environment source could not be read or parsed
    #[error("Configuration load error: {0}")]
    Load(#[from] config::ConfigError),

    /// Loaded values fail validation
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
