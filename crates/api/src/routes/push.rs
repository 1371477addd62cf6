//! Push Ingestion Route

use alerting::{Alert, PushMessage};
use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use dispatcher::AlertDisposition;
use metrics::counter;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::error::ApiError;
use crate::AppState;

/// Response for push endpoint
#[derive(Debug, Serialize)]
pub struct PushResponse {
    pub alert_id: String,
    pub disposition: AlertDisposition,
}

/// Receive a push message from the transport.
///
/// A dropped alert answers 503 so the transport redelivers it.
pub async fn receive_push(
    State(state): State<Arc<AppState>>,
    Json(message): Json<PushMessage>,
) -> Result<(StatusCode, Json<PushResponse>), ApiError> {
    let alert = Alert::from_push(message, Utc::now()).map_err(|e| {
        warn!("Rejected push message: {}", e);
        counter!("plant_alert_push_rejected_total").increment(1);
        e
    })?;

    let alert_id = alert.id().to_string();
    let disposition = state.coordinator.on_alert_received(alert);

    let status = match disposition {
        AlertDisposition::Dropped => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };
    Ok((
        status,
        Json(PushResponse {
            alert_id,
            disposition,
        }),
    ))
}
