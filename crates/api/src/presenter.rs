//! Presentation Log
//!
//! Stands in for the notifier UI: every presentation event is logged.

use action_router::ActionStatus;
use dispatcher::PresentationEvent;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Drain presentation events until the coordinator is dropped
pub async fn log_presentations(mut events: mpsc::Receiver<PresentationEvent>) {
    while let Some(event) = events.recv().await {
        match &event {
            PresentationEvent::Present {
                alert_id,
                title,
                body,
                actions,
                severity,
            } => {
                let labels: Vec<_> = actions.iter().map(|a| a.label()).collect();
                info!(
                    "[{:?}] {}: {} - {} (actions: {})",
                    severity,
                    alert_id,
                    title,
                    body,
                    labels.join(", ")
                );
            }
            PresentationEvent::Withdrawn { alert_id } => {
                info!("{}: no longer actionable", alert_id);
            }
            PresentationEvent::ActionOutcome {
                alert_id,
                action,
                device,
                status: ActionStatus::Acknowledged,
                ..
            } => {
                info!("{}: {} on {} confirmed", alert_id, action.label(), device);
            }
            PresentationEvent::ActionOutcome {
                alert_id,
                action,
                device,
                status,
                failure,
                ..
            } => {
                warn!(
                    "{}: {} on {} {} ({})",
                    alert_id,
                    action.label(),
                    device,
                    status,
                    failure.as_deref().unwrap_or("no detail")
                );
            }
        }
    }
    debug!("Presentation channel closed");
}
