//! Alert Routes

use alerting::ActionKind;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use dispatcher::{ActionTicket, AlertState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ApiError;
use crate::AppState;

/// Body of a user action report
#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub action: ActionKind,
}

/// Alert status
#[derive(Debug, Serialize)]
pub struct AlertStatus {
    pub alert_id: String,
    pub state: AlertState,
}

/// Get the state of one alert
pub async fn get_alert(
    State(state): State<Arc<AppState>>,
    Path(alert_id): Path<String>,
) -> Result<Json<AlertStatus>, ApiError> {
    let current = state
        .coordinator
        .state(&alert_id)
        .ok_or_else(|| ApiError::NotFound(alert_id.clone()))?;

    Ok(Json(AlertStatus {
        alert_id,
        state: current,
    }))
}

/// Report the action a user picked
pub async fn post_action(
    State(state): State<Arc<AppState>>,
    Path(alert_id): Path<String>,
    Json(request): Json<ActionRequest>,
) -> Result<(StatusCode, Json<ActionTicket>), ApiError> {
    let ticket = state
        .coordinator
        .on_user_action(&alert_id, request.action)
        .await?;

    Ok((StatusCode::ACCEPTED, Json(ticket)))
}
