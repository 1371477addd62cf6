//! Alert Dispatch
//!
//! Orchestrates the alert pipeline:
//! - Deduplication of redelivered alerts
//! - Classification into a notification policy
//! - Presentation to the notifier, with a time-to-live
//! - Routing of the user's chosen action to the actuator
//! - Outcome recording

mod coordinator;
mod error;
mod settings;
mod state;

pub use coordinator::{DispatchCoordinator, SweepReport};
pub use error::{ConfigError, DispatchError};
pub use settings::{load_layered, DispatchConfig, ENV_PREFIX};
pub use state::{ActionTicket, AlertDisposition, AlertState, PresentationEvent};
