//! Action Router
//!
//! Turns a human-selected action into an actuator command. At most one
//! command per (device, action) pair is in flight at any time; outcomes
//! are archived once terminal.

mod actuator;
mod error;
mod pending;
mod router;

pub use actuator::{Actuator, ActuatorCommand, MockActuator, MockResponse};
pub use error::{ActuatorError, RouteError};
pub use pending::{ActionStatus, PendingAction, RouteKey};
pub use router::{ActionRouter, RouteHandle, RouterConfig};
