// Database models (rows)

use chrono::{DateTime, Utc};
use ripple_core::{Event, Notification, NotificationWithEvent};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================
// Events
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: Uuid,
    pub actor_id: String,
    pub verb: String,
    pub object_type: String,
    pub object_id: String,
    pub target_user_ids: Vec<String>,
    pub metadata: sqlx::types::JsonValue,
    pub created_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            actor_id: row.actor_id,
            verb: row.verb,
            object_type: row.object_type,
            object_id: row.object_id,
            target_user_ids: row.target_user_ids,
            metadata: row.metadata,
            created_at: row.created_at,
        }
    }
}

// ============================================
// Notifications
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    pub user_id: String,
    pub event_id: Uuid,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id: row.id,
            user_id: row.user_id,
            event_id: row.event_id,
            is_read: row.is_read,
            created_at: row.created_at,
        }
    }
}

/// Notification LEFT JOINed with its event; event columns are null when the row is absent
#[derive(Debug, Clone, FromRow)]
pub struct NotificationWithEventRow {
    pub id: Uuid,
    pub user_id: String,
    pub event_id: Uuid,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub event_actor_id: Option<String>,
    pub event_verb: Option<String>,
    pub event_object_type: Option<String>,
    pub event_object_id: Option<String>,
    pub event_target_user_ids: Option<Vec<String>>,
    pub event_metadata: Option<sqlx::types::JsonValue>,
    pub event_created_at: Option<DateTime<Utc>>,
}

impl From<NotificationWithEventRow> for NotificationWithEvent {
    fn from(row: NotificationWithEventRow) -> Self {
        let event = match (
            row.event_actor_id,
            row.event_verb,
            row.event_object_type,
            row.event_object_id,
            row.event_created_at,
        ) {
            (Some(actor_id), Some(verb), Some(object_type), Some(object_id), Some(created_at)) => {
                Some(Event {
                    id: row.event_id,
                    actor_id,
                    verb,
                    object_type,
                    object_id,
                    target_user_ids: row.event_target_user_ids.unwrap_or_default(),
                    metadata: row
                        .event_metadata
                        .unwrap_or_else(|| serde_json::Value::Object(Default::default())),
                    created_at,
                })
            }
            _ => None,
        };

        NotificationWithEvent::new(
            Notification {
                id: row.id,
                user_id: row.user_id,
                event_id: row.event_id,
                is_read: row.is_read,
                created_at: row.created_at,
            },
            event,
        )
    }
}
