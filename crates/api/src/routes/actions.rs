//! Action Archive Routes

use action_router::PendingAction;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;

/// Query parameters for actions endpoint
#[derive(Debug, Deserialize)]
pub struct ActionQuery {
    /// Maximum number of records
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// Response for actions endpoint
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub data: Vec<PendingAction>,
    pub count: usize,
    pub in_flight: usize,
}

/// Get resolved actions, newest first
pub async fn get_actions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ActionQuery>,
) -> Json<ActionResponse> {
    let router = state.coordinator.router();
    let data = router.archived(params.limit.min(1000));

    Json(ActionResponse {
        count: data.len(),
        in_flight: router.in_flight_count(),
        data,
    })
}
