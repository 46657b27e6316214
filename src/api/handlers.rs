use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::api::extract;
use crate::auth::LoginRequest;
use crate::errors::AppError;
use crate::search::SearchParams;
use crate::validation::{check, CreateListingBody, UpdateListingBody};
use crate::AppState;

type ApiResult = Result<Response, AppError>;

fn message(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "message": msg }))).into_response()
}

// ── Auth ─────────────────────────────────────────────────────

/// POST /v1/auth/login: exchange client credentials for an access token
pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult {
    let request = extract::json_body(body)?;
    check(&request).map_err(AppError::Validation)?;
    match state.auth.login(&request).await? {
        Some(token) => Ok(Json(token).into_response()),
        None => Err(AppError::InvalidCredentials),
    }
}

/// POST /v1/auth/logout: denylist the presented token
pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> ApiResult {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if state.auth.logout(header).await? {
        Ok(message(StatusCode::OK, "Token invalidated successfully"))
    } else {
        Err(AppError::Unprocessable("Could not invalidate token".into()))
    }
}

// ── Listings ─────────────────────────────────────────────────

/// GET /v1/real-estate-listing: filtered, ordered, paginated search
pub async fn search_listings(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult {
    let query = extract::query(params)?
        .into_query(state.listings.limits())
        .map_err(AppError::Validation)?;
    let results = state.listings.search(&query).await?;
    Ok(Json(results).into_response())
}

/// GET /v1/real-estate-listing/:id
pub async fn get_listing(
    State(state): State<Arc<AppState>>,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult {
    let id = extract::listing_id(id)?;
    match state.listings.get(id).await? {
        Some(listing) => Ok(Json(listing).into_response()),
        None => Err(AppError::NoContent),
    }
}

/// GET /v1/real-estate-listing/:id/history: status and price changes
pub async fn get_listing_history(
    State(state): State<Arc<AppState>>,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult {
    let id = extract::listing_id(id)?;
    match state.listings.history(id).await? {
        Some(history) => Ok(Json(history).into_response()),
        None => Err(AppError::NoContent),
    }
}

/// POST /v1/real-estate-listing
pub async fn create_listing(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateListingBody>, JsonRejection>,
) -> ApiResult {
    let new = extract::json_body(body)?
        .into_listing()
        .map_err(AppError::Validation)?;
    match state.listings.create(&new).await? {
        Some(listing) => Ok((StatusCode::CREATED, Json(listing)).into_response()),
        None => Err(AppError::Unprocessable("Could not create listing".into())),
    }
}

/// PATCH /v1/real-estate-listing/:id
pub async fn update_listing(
    State(state): State<Arc<AppState>>,
    id: Result<Path<String>, PathRejection>,
    body: Result<Json<UpdateListingBody>, JsonRejection>,
) -> ApiResult {
    let id = extract::listing_id(id)?;
    let patch = extract::json_body(body)?
        .into_patch()
        .map_err(AppError::Validation)?;
    if state.listings.update(id, &patch).await? {
        Ok(message(StatusCode::OK, "Listing updated successfully"))
    } else {
        Err(AppError::Unprocessable("Could not update listing".into()))
    }
}

/// DELETE /v1/real-estate-listing/:id: soft delete
pub async fn delete_listing(
    State(state): State<Arc<AppState>>,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult {
    let id = extract::listing_id(id)?;
    if state.listings.soft_delete(id).await? {
        Ok(message(StatusCode::OK, "Listing deleted successfully"))
    } else {
        Err(AppError::Unprocessable("Could not delete listing".into()))
    }
}

// ── Health ───────────────────────────────────────────────────

pub async fn healthz() -> &'static str {
    "ok"
}

/// Ready once the datastore answers.
pub async fn readyz(State(state): State<Arc<AppState>>) -> Response {
    match state.listings.ping().await {
        Ok(()) => "ok".into_response(),
        Err(e) => {
            tracing::warn!("readiness check failed: {:#}", e);
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}
