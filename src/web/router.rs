//! Router configuration for the trigger API.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{health_check, scrape_feed, AppState};

/// Create the API router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let feed_routes = Router::new().route("/:id/scrape", post(scrape_feed));

    Router::new()
        .nest("/v1/feeds", feed_routes)
        .route("/health", get(health_check))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(app_state)
}
