// Feed HTTP route (keyset paginated)

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use ripple_core::Event;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common::require_user_id;
use super::{ApiError, ErrorResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct FeedQuery {
    /// Whose feed to read
    pub user_id: Option<String>,
    /// `next_cursor` from the previous page (RFC 3339 timestamp)
    pub cursor: Option<DateTime<Utc>>,
    /// Page size, 1..=100 (default 20)
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FeedResponse {
    pub events: Vec<Event>,
    /// Cursor for the next page; null on the last page
    pub next_cursor: Option<DateTime<Utc>>,
    pub has_more: bool,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/feed", get(list_feed))
        .with_state(state)
}

/// GET /v1/feed - Events where the user is actor or target, newest first
#[utoipa::path(
    get,
    path = "/v1/feed",
    params(FeedQuery),
    responses(
        (status = 200, description = "Feed page", body = FeedResponse),
        (status = 400, description = "Missing user_id or malformed cursor", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "feed"
)]
pub async fn list_feed(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<FeedQuery>, ApiError>,
) -> Result<Json<FeedResponse>, ApiError> {
    let user_id = require_user_id(query.user_id)?;
    let page = state.feed.page(&user_id, query.cursor, query.limit).await?;

    Ok(Json(FeedResponse {
        events: page.events,
        next_cursor: page.next_cursor,
        has_more: page.has_more,
    }))
}
