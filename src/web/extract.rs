//! Request extractors for the trigger API.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};

use crate::web::error::ApiError;

/// A positive feed ID taken from the `:id` path segment.
///
/// Malformed or non-positive IDs are rejected with the API's JSON error body
/// instead of axum's plain-text rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for FeedId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid feed id: {}", e.body_text())))?;

        if id <= 0 {
            return Err(ApiError::bad_request("feed id must be positive"));
        }
        Ok(FeedId(id))
    }
}
