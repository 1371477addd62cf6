//! Routing Error Types

use alerting::{ActionKind, DeviceId};
use thiserror::Error;
use uuid::Uuid;

/// Errors reported by an actuator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActuatorError {
    /// Device answered and refused the command
    #[error("Actuator rejected command: {0}")]
    Rejected(String),

    /// Device could not be reached
    #[error("Actuator unreachable: {0}")]
    Unreachable(String),
}

/// Errors returned by [`ActionRouter::route`](crate::ActionRouter::route)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// A command for the same device and action has not resolved yet
    #[error("{action} already in flight on {device} (pending {pending_id})")]
    AlreadyInFlight {
        device: DeviceId,
        action: ActionKind,
        pending_id: Uuid,
    },

    /// Worker task ended without reporting an outcome
    #[error("Actuator worker for {0} stopped before reporting an outcome")]
    WorkerLost(Uuid),
}
