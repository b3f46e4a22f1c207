//! Request handlers for the trigger API.

use std::sync::Arc;

use axum::{extract::State, Json};

use super::dto::{ApiResponse, ScrapeResponse};
use super::error::ApiError;
use super::extract::FeedId;
use crate::SqliteIngestor;

/// Application state shared with handlers.
pub struct AppState {
    /// Ingestion engine shared with the scheduler.
    pub ingestor: Arc<SqliteIngestor>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(ingestor: Arc<SqliteIngestor>) -> Self {
        Self { ingestor }
    }
}

/// POST /v1/feeds/:id/scrape - Ingest one feed now.
///
/// Waits for the run to finish; digests to followers are sent in the
/// background.
pub async fn scrape_feed(
    State(state): State<Arc<AppState>>,
    FeedId(feed_id): FeedId,
) -> Result<Json<ApiResponse<ScrapeResponse>>, ApiError> {
    let outcome = state.ingestor.ingest(feed_id).await?;
    Ok(Json(ApiResponse::new(outcome.into())))
}

/// GET /health - Liveness probe.
pub async fn health_check() -> &'static str {
    "OK"
}
