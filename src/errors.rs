use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::validation::FieldError;

pub const INTERNAL_SERVER_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid request")]
    Validation(Vec<FieldError>),

    #[error("no content")]
    NoContent,

    #[error("{0}")]
    Unprocessable(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Store(e) => AppError::Internal(e),
            other => {
                tracing::warn!("request rejected: {}", other);
                AppError::Unauthorized
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": "Unauthorized" }),
            ),
            AppError::InvalidCredentials => (
                StatusCode::FORBIDDEN,
                json!({ "message": "Invalid credentials" }),
            ),
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "message": "Invalid request",
                    "validationErrors": errors,
                }),
            ),
            AppError::NoContent => return StatusCode::NO_CONTENT.into_response(),
            AppError::Unprocessable(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "message": msg }),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                internal()
            }
        };

        (status, Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, serde_json::Value) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "message": INTERNAL_SERVER_ERROR_MESSAGE }),
    )
}
