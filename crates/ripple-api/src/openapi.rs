// OpenAPI documentation

use ripple_core::{
    AnalyticsSnapshot, Event, KeyCount, NewEvent, Notification, NotificationWithEvent,
    Window,
};
use utoipa::OpenApi;

use crate::api::{self, ErrorResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        api::events::ingest_event,
        api::feed::list_feed,
        api::notifications::list_notifications,
        api::notifications::mark_read,
        api::notifications::stream_notifications,
        api::analytics::top,
    ),
    components(
        schemas(
            Event, NewEvent, Notification, NotificationWithEvent,
            AnalyticsSnapshot, KeyCount, Window,
            ErrorResponse,
            api::events::IngestResponse,
            api::feed::FeedResponse,
            api::notifications::NotificationsResponse,
        )
    ),
    tags(
        (name = "events", description = "Event ingestion"),
        (name = "feed", description = "Personalized activity feed"),
        (name = "notifications", description = "Notifications and live stream (SSE)"),
        (name = "analytics", description = "Sliding-window top verbs and objects")
    ),
    info(
        title = "Ripple API",
        version = "0.1.0",
        description = "Activity feed, notifications and live analytics",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
pub struct ApiDoc;
