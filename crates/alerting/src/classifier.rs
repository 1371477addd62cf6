//! Alert Classification

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::alert::{ActionKind, Alert, AlertKind, Severity};

/// What to do with an admitted alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Whether a human sees the alert at all
    pub should_notify: bool,
    pub severity: Severity,
    /// Actions offered next to the alert, in display order
    pub available_actions: Vec<ActionKind>,
}

impl Policy {
    /// Non-notifying policy
    pub fn ignore() -> Self {
        Self {
            should_notify: false,
            severity: Severity::Low,
            available_actions: Vec::new(),
        }
    }

    /// Notifying policy offering `actions`
    pub fn notify(severity: Severity, actions: Vec<ActionKind>) -> Self {
        Self {
            should_notify: true,
            severity,
            available_actions: actions,
        }
    }

    pub fn offers(&self, action: ActionKind) -> bool {
        self.available_actions.contains(&action)
    }
}

/// Maps an alert type to a [`Policy`].
///
/// Total over [`AlertKind`]: unrecognised types are never surfaced.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertClassifier;

impl AlertClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify an alert
    pub fn classify(&self, alert: &Alert) -> Policy {
        let policy = match alert.kind() {
            AlertKind::LowMoisture => Policy::notify(Severity::High, vec![ActionKind::Water]),
            AlertKind::Other(_) => Policy::ignore(),
        };

        debug!(
            "Alert {} classified: type={} notify={} severity={:?}",
            alert.id(),
            alert.kind(),
            policy.should_notify,
            policy.severity
        );
        policy
    }
}
