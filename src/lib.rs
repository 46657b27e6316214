//! Real-estate listings API: library crate shared by the binary and the
//! integration tests in `tests/`.

use std::sync::Arc;

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod errors;
pub mod models;
pub mod search;
pub mod service;
pub mod store;
pub mod validation;

use auth::Authenticator;
use service::ListingService;

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    pub listings: ListingService,
    pub auth: Authenticator,
}

impl AppState {
    pub fn new(listings: ListingService, auth: Authenticator) -> Arc<Self> {
        Arc::new(Self { listings, auth })
    }
}

pub fn app(state: Arc<AppState>) -> axum::Router {
    api::router(state)
}
