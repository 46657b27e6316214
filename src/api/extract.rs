//! Turns extractor rejections into structured validation errors.
//!
//! Handlers take `Result<Json<T>, JsonRejection>` (and the query and path
//! equivalents) and pass it through here, so a malformed request gets the
//! same `{"message", "validationErrors"}` body as a failed `validator` rule.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::Json;

use crate::errors::AppError;
use crate::validation::{parse_id, FieldError};

pub fn json_body<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|e| AppError::Validation(vec![FieldError::new("body", e.body_text())]))
}

pub fn query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    result
        .map(|Query(v)| v)
        .map_err(|e| AppError::Validation(vec![FieldError::new("query", e.body_text())]))
}

/// The `:id` segment of the listing routes.
pub fn listing_id(result: Result<Path<String>, PathRejection>) -> Result<i32, AppError> {
    let Path(raw) =
        result.map_err(|e| AppError::Validation(vec![FieldError::new("id", e.body_text())]))?;
    parse_id(&raw).map_err(AppError::Validation)
}
