use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::server::endpoints::{records, status, sync};
use crate::types::AppState;

mod endpoints;
mod types;

/// Creates the `axum` router for the scraping API.
///
/// Only `/sync` carries the wide-open CORS layer; the portal-driving
/// endpoints are same-origin like any other API route.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let sync_router = Router::new().route("/sync", post(sync::post_sync)).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    );

    Router::new()
        .route("/health", get(status::get_health))
        .route("/captcha", get(records::get_captcha))
        .route("/attendance", post(records::post_attendance))
        .route("/internalmarks", post(records::post_internalmarks))
        .merge(sync_router)
        .with_state(app_state)
}
