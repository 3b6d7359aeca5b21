// Top analytics HTTP route

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use ripple_core::{AnalyticsSnapshot, Window};
use serde::Deserialize;
use utoipa::IntoParams;

use super::{ApiError, ErrorResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct TopQuery {
    /// One of 1m, 5m, 1h (default 1h)
    pub window: Option<String>,
    /// Entries per list, capped at 100
    pub k: Option<usize>,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/analytics/top", get(top))
        .with_state(state)
}

/// GET /v1/analytics/top - Most frequent verbs and objects in a trailing window
#[utoipa::path(
    get,
    path = "/v1/analytics/top",
    params(TopQuery),
    responses(
        (status = 200, description = "Snapshot", body = AnalyticsSnapshot),
        (status = 400, description = "Invalid window", body = ErrorResponse)
    ),
    tag = "analytics"
)]
pub async fn top(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<TopQuery>, ApiError>,
) -> Result<Json<AnalyticsSnapshot>, ApiError> {
    let window = match query.window.as_deref().map(str::trim) {
        None | Some("") => Window::default(),
        Some(raw) => raw.parse::<Window>()?,
    };

    let mut snapshot = state.aggregator.snapshot(window);
    if let Some(k) = query.k {
        snapshot.top_verbs.truncate(k);
        snapshot.top_objects.truncate(k);
    }

    Ok(Json(snapshot))
}
