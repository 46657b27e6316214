use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::AppState;

pub mod extract;
pub mod handlers;

/// Build the full application router.
pub fn router(state: Arc<AppState>) -> Router {
    let listings = Router::new()
        .route(
            "/v1/real-estate-listing",
            get(handlers::search_listings).post(handlers::create_listing),
        )
        .route(
            "/v1/real-estate-listing/",
            get(handlers::search_listings).post(handlers::create_listing),
        )
        .route(
            "/v1/real-estate-listing/:id",
            get(handlers::get_listing)
                .patch(handlers::update_listing)
                .delete(handlers::delete_listing),
        )
        .route(
            "/v1/real-estate-listing/:id/history",
            get(handlers::get_listing_history),
        )
        // route_layer: the guard only runs for matched routes, before extractors
        .route_layer(middleware::from_fn_with_state(state.clone(), require_scope));

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/v1/auth/login", axum::routing::post(handlers::login))
        .route("/v1/auth/logout", axum::routing::post(handlers::logout))
        .merge(listings)
        .fallback(fallback_404)
        .with_state(state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Middleware: bearer-token check plus scope lookup for the route.
/// On success the token's claims are available as a request extension.
async fn require_scope(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // No borrow of `req` may live across the await: the body is not Sync.
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let claims = state
        .auth
        .authorize(header.as_deref(), &method, &path)
        .await?;
    tracing::debug!(client_id = %claims.client_id, "request authorized");
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Middleware: injects a unique X-Request-Id into every response.
async fn request_id_middleware(req: Request, next: Next) -> Response {
    let req_id = uuid::Uuid::new_v4().to_string();
    let mut resp = next.run(req).await;
    if let Ok(val) = HeaderValue::from_str(&req_id) {
        resp.headers_mut().insert("x-request-id", val);
    }
    resp
}

/// Middleware: security headers on every response.
async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();

    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert("X-XSS-Protection", HeaderValue::from_static("0"));
    headers.insert("Cache-Control", HeaderValue::from_static("no-store"));
    headers.insert("Referrer-Policy", HeaderValue::from_static("no-referrer"));
    headers.insert(
        "Strict-Transport-Security",
        HeaderValue::from_static("max-age=15552000; includeSubDomains"),
    );
    headers.remove("Server");
    headers.remove("X-Powered-By");

    resp
}
