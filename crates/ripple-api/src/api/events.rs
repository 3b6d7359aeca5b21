// Event ingestion HTTP route

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::WithRejection;
use ripple_core::NewEvent;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{ApiError, ErrorResponse};
use crate::auth::CallerIdentity;
use crate::state::AppState;

/// Response for an accepted event
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IngestResponse {
    pub event_id: Uuid,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/events", post(ingest_event))
        .with_state(state)
}

/// POST /v1/events - Ingest an event
#[utoipa::path(
    post,
    path = "/v1/events",
    request_body = NewEvent,
    params(
        ("x-user-id" = String, Header, description = "Caller identity")
    ),
    responses(
        (status = 201, description = "Event persisted", body = IngestResponse),
        (status = 400, description = "Missing fields or malformed body", body = ErrorResponse),
        (status = 401, description = "Missing caller identity", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn ingest_event(
    State(state): State<AppState>,
    caller: CallerIdentity,
    WithRejection(Json(input), _): WithRejection<Json<NewEvent>, ApiError>,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    tracing::debug!(caller = %caller.user_id, verb = %input.verb, "Ingest request");

    let outcome = state.ingestion.ingest(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            event_id: outcome.event.id,
        }),
    ))
}
