use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, info};

use crate::{filters::InvalidFilter, geometry::GeometryError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Filter(#[from] InvalidFilter),

    #[error("{0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("corrupt geometry in store: {0}")]
    Geometry(#[from] GeometryError),

    #[error("corrupt timestamp in store: {0}")]
    Time(#[from] jiff::Error),

    #[error("status {0}")]
    Status(StatusCode),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Filter(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "detail": err.to_string() })),
            )
                .into_response(),
            // Absence is an expected outcome, not a failure.
            AppError::NotFound(detail) => {
                info!(message = "not found", %detail);
                (StatusCode::NOT_FOUND, Json(json!({ "detail": detail }))).into_response()
            }
            AppError::Status(status) => status.into_response(),
            // Infrastructure failures: log the cause, never leak it.
            other => {
                error!(message = "internal error", error = %other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": "internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
