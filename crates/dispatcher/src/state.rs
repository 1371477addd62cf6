//! Alert State Machine Types

use action_router::ActionStatus;
use alerting::{ActionKind, AlertId, DeviceId, Policy, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Position of an alert in the dispatch pipeline.
///
/// `Received -> Deduped | Classified -> Presented -> AwaitingAction ->
/// Routed -> Done`, with `Expired` reachable from `Presented` and
/// `AwaitingAction`, and `Done` reachable directly from `Classified` for
/// non-notifying alerts.
///
/// `Received`, `Deduped` and `Classified` name steps that ingestion runs
/// within a single call. They are never stored, so
/// [`DispatchCoordinator::state`](crate::DispatchCoordinator::state) only
/// reports the states after them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    Received,
    /// Dropped as a redelivery
    Deduped,
    Classified,
    /// Shown to the user, waiting for an action
    Presented,
    /// User action accepted, actuator command in flight
    AwaitingAction,
    /// Actuator acknowledged the command
    Routed,
    Done,
    /// TTL elapsed before the user acted
    Expired,
}

impl AlertState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AlertState::Deduped | AlertState::Done | AlertState::Expired)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertState::Received => "received",
            AlertState::Deduped => "deduped",
            AlertState::Classified => "classified",
            AlertState::Presented => "presented",
            AlertState::AwaitingAction => "awaiting_action",
            AlertState::Routed => "routed",
            AlertState::Done => "done",
            AlertState::Expired => "expired",
        }
    }
}

impl fmt::Display for AlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of ingesting an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertDisposition {
    /// Same id already seen within the dedup window
    Duplicate,
    /// Classified as non-notifying; done without presentation
    Ignored,
    /// Handed to the notifier
    Presented,
    /// Presentation channel full or closed; not recorded, redelivery is admitted
    Dropped,
}

impl AlertDisposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertDisposition::Duplicate => "duplicate",
            AlertDisposition::Ignored => "ignored",
            AlertDisposition::Presented => "presented",
            AlertDisposition::Dropped => "dropped",
        }
    }
}

/// Event for the notifier collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PresentationEvent {
    /// Show an alert with its action buttons
    Present {
        alert_id: AlertId,
        title: String,
        body: String,
        actions: Vec<ActionKind>,
        severity: Severity,
    },
    /// Alert expired; remove its affordances
    Withdrawn { alert_id: AlertId },
    /// Actuator outcome of a user action
    ActionOutcome {
        alert_id: AlertId,
        action_id: Uuid,
        action: ActionKind,
        device: DeviceId,
        status: ActionStatus,
        failure: Option<String>,
    },
}

impl PresentationEvent {
    pub fn alert_id(&self) -> &str {
        match self {
            PresentationEvent::Present { alert_id, .. }
            | PresentationEvent::Withdrawn { alert_id }
            | PresentationEvent::ActionOutcome { alert_id, .. } => alert_id,
        }
    }
}

/// Accepted user action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTicket {
    pub alert_id: AlertId,
    pub action_id: Uuid,
    pub action: ActionKind,
    pub device: DeviceId,
}

/// Per-alert bookkeeping held by the coordinator
#[derive(Debug, Clone)]
pub(crate) struct AlertEntry {
    pub state: AlertState,
    pub policy: Policy,
    pub device: DeviceId,
    pub received_at: DateTime<Utc>,
    /// Distinguishes presentations of a readmitted id
    pub presentation: u64,
    /// Command issued for the current user action
    pub pending_action: Option<Uuid>,
}
