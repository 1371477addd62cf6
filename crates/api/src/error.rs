//! API Error Types

use alerting::AlertError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dispatcher::DispatchError;
use serde::Serialize;
use thiserror::Error;

/// Errors returned by HTTP handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Push payload could not be turned into an alert
    #[error("Invalid push message: {0}")]
    InvalidPush(#[from] AlertError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Unknown alert: {0}")]
    NotFound(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::InvalidPush(_) => (StatusCode::BAD_REQUEST, "invalid_push"),
            ApiError::NotFound(_) | ApiError::Dispatch(DispatchError::UnknownAlert(_)) => {
                (StatusCode::NOT_FOUND, "unknown_alert")
            }
            ApiError::Dispatch(DispatchError::Expired(_)) => (StatusCode::GONE, "expired"),
            ApiError::Dispatch(DispatchError::AlreadyInFlight { .. }) => (StatusCode::CONFLICT, "already_in_flight"),
            ApiError::Dispatch(DispatchError::NotActionable { .. }) => (StatusCode::CONFLICT, "not_actionable"),
            ApiError::Dispatch(DispatchError::ActionNotOffered { .. }) => (StatusCode::CONFLICT, "action_not_offered"),
            ApiError::Dispatch(DispatchError::Route(_)) => (StatusCode::INTERNAL_SERVER_ERROR, "routing_failed"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let body = ErrorBody {
            error: self.to_string(),
            code,
        };
        (status, Json(body)).into_response()
    }
}
