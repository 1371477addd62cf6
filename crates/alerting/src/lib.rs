//! Alerting Model
//!
//! Inbound alert model, push payload parsing, alert deduplication and
//! policy classification.

mod alert;
mod classifier;
mod dedup;
mod error;

pub use alert::{ActionKind, Alert, AlertId, AlertKind, DeviceId, PushMessage, PushNotification, Severity};
pub use classifier::{AlertClassifier, Policy};
pub use dedup::{AlertDeduplicator, DedupRecord};
pub use error::AlertError;

/// Wire value of the only alert type that is surfaced to a human
pub const LOW_MOISTURE_TYPE: &str = "low_moisture";
