// Notification HTTP routes: list, mark read, live stream (SSE)
//
// The stream carries only what is published while the client is connected.
// Clients close gaps by re-reading the list with `since` after reconnecting.

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event as SseEvent, Sse},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use ripple_core::{LiveFrame, Notification, NotificationWithEvent};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::common::require_user_id;
use super::{ApiError, ErrorResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct NotificationsQuery {
    pub user_id: Option<String>,
    /// Only notifications strictly newer than this timestamp
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct StreamQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationsResponse {
    /// Newest first, at most 50
    pub notifications: Vec<NotificationWithEvent>,
    pub unread_count: u64,
}

/// JSON payload of a live stream `data:` line
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamMessage<'a> {
    Connected { user_id: &'a str },
    Notification { data: &'a NotificationWithEvent },
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/notifications", get(list_notifications))
        .route("/v1/notifications/stream", get(stream_notifications))
        .route("/v1/notifications/:id/read", post(mark_read))
        .with_state(state)
}

/// GET /v1/notifications - Recent notifications with unread count
#[utoipa::path(
    get,
    path = "/v1/notifications",
    params(NotificationsQuery),
    responses(
        (status = 200, description = "Notifications", body = NotificationsResponse),
        (status = 400, description = "Missing user_id", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "notifications"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<NotificationsQuery>, ApiError>,
) -> Result<Json<NotificationsResponse>, ApiError> {
    let user_id = require_user_id(query.user_id)?;
    let list = state.notifications.list(&user_id, query.since).await?;

    Ok(Json(NotificationsResponse {
        notifications: list.notifications,
        unread_count: list.unread_count,
    }))
}

/// POST /v1/notifications/{id}/read - Mark a notification read (idempotent)
#[utoipa::path(
    post,
    path = "/v1/notifications/{id}/read",
    params(
        ("id" = Uuid, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Notification marked read", body = Notification),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Notification not found", body = ErrorResponse)
    ),
    tag = "notifications"
)]
pub async fn mark_read(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<Notification>, ApiError> {
    let notification = state.notifications.mark_read(id).await?;
    Ok(Json(notification))
}

/// GET /v1/notifications/stream - Live notifications (SSE)
#[utoipa::path(
    get,
    path = "/v1/notifications/stream",
    params(StreamQuery),
    responses(
        (status = 200, description = "Notification stream", content_type = "text/event-stream"),
        (status = 400, description = "Missing user_id", body = ErrorResponse)
    ),
    tag = "notifications"
)]
pub async fn stream_notifications(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<StreamQuery>, ApiError>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    let user_id = require_user_id(query.user_id)?;
    tracing::info!(user_id = %user_id, "Starting notification stream");

    // Dropping the response body drops the connection, which deregisters it.
    let stream = state
        .hub
        .connect(user_id)
        .into_stream()
        .map(|frame| Ok(frame_to_sse(frame)));

    Ok(Sse::new(stream))
}

fn frame_to_sse(frame: LiveFrame) -> SseEvent {
    let message = match &frame {
        LiveFrame::Connected { user_id } => StreamMessage::Connected { user_id },
        LiveFrame::Notification(notification) => StreamMessage::Notification {
            data: notification.as_ref(),
        },
        LiveFrame::Heartbeat => return SseEvent::default().comment("heartbeat"),
    };

    SseEvent::default().json_data(&message).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to serialize stream message");
        SseEvent::default().comment("serialization error")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use http_body_util::BodyExt;

    async fn render(frame: LiveFrame) -> String {
        let events = futures::stream::iter(vec![Ok::<_, Infallible>(frame_to_sse(frame))]);
        let body = Sse::new(events)
            .into_response()
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_heartbeat_renders_as_comment_only() {
        let text = render(LiveFrame::Heartbeat).await;
        assert_eq!(text.trim_end(), ": heartbeat");
        assert!(!text.contains("data:"));
    }

    #[tokio::test]
    async fn test_connected_renders_as_data_line() {
        let text = render(LiveFrame::Connected {
            user_id: "bob".to_string(),
        })
        .await;
        let data = text
            .lines()
            .find_map(|line| line.strip_prefix("data:"))
            .unwrap();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(data.trim()).unwrap(),
            serde_json::json!({ "type": "connected", "user_id": "bob" })
        );
    }

    #[test]
    fn test_connected_message_shape() {
        let json = serde_json::to_value(StreamMessage::Connected { user_id: "bob" }).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "connected", "user_id": "bob" }));
    }
}
