// Event and notification entity types
//
// These are DB-agnostic entity types shared by the API, storage and the core.
// Verbs, object types and object ids are open vocabularies: plain strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Event - an immutable record of an actor doing something to an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Event {
    /// Unique, time-ordered event ID (UUID v7).
    pub id: Uuid,
    /// The user who performed the action.
    #[cfg_attr(feature = "openapi", schema(example = "alice"))]
    pub actor_id: String,
    /// What the actor did (open vocabulary).
    #[cfg_attr(feature = "openapi", schema(example = "starred"))]
    pub verb: String,
    /// Kind of the object acted on.
    #[cfg_attr(feature = "openapi", schema(example = "repository"))]
    pub object_type: String,
    /// Identifier of the object acted on.
    #[cfg_attr(feature = "openapi", schema(example = "acme/x"))]
    pub object_id: String,
    /// Users notified about this event.
    pub target_user_ids: Vec<String>,
    /// Opaque key/value metadata.
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub metadata: serde_json::Value,
    /// Sort and pagination key.
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Whether this event belongs in the given user's feed
    pub fn is_visible_to(&self, user_id: &str) -> bool {
        self.actor_id == user_id || self.target_user_ids.iter().any(|t| t == user_id)
    }

    /// Target users with duplicates removed, first occurrence wins
    pub fn distinct_targets(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.target_user_ids
            .iter()
            .map(String::as_str)
            .filter(|t| seen.insert(*t))
            .collect()
    }
}

/// Incoming event payload, before validation
///
/// Required string fields default to empty so that a missing field and an
/// empty one are rejected by the same validation path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct NewEvent {
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(example = "alice"))]
    pub actor_id: String,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(example = "starred"))]
    pub verb: String,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(example = "repository"))]
    pub object_type: String,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(example = "acme/x"))]
    pub object_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_user_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub metadata: Option<serde_json::Value>,
    /// Explicit timestamp for backfill/replay; defaults to ingestion time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewEvent {
    pub fn new(
        actor_id: impl Into<String>,
        verb: impl Into<String>,
        object_type: impl Into<String>,
        object_id: impl Into<String>,
    ) -> Self {
        Self {
            actor_id: actor_id.into(),
            verb: verb.into(),
            object_type: object_type.into(),
            object_id: object_id.into(),
            ..Default::default()
        }
    }

    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_user_ids = Some(targets.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// Validated event ready to be persisted; the store assigns the id
#[derive(Debug, Clone)]
pub struct CreateEvent {
    pub actor_id: String,
    pub verb: String,
    pub object_type: String,
    pub object_id: String,
    pub target_user_ids: Vec<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Notification - one per (event, target user)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Notification {
    pub id: Uuid,
    /// Recipient.
    pub user_id: String,
    /// Event this notification refers to.
    pub event_id: Uuid,
    /// Starts false, only ever flips to true.
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Notification with its event embedded, as returned to readers and pushed live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct NotificationWithEvent {
    #[serde(flatten)]
    pub notification: Notification,
    /// The referenced event; null if the event row is absent.
    pub event: Option<Event>,
}

impl NotificationWithEvent {
    pub fn new(notification: Notification, event: Option<Event>) -> Self {
        Self {
            notification,
            event,
        }
    }

    pub fn id(&self) -> Uuid {
        self.notification.id
    }

    pub fn user_id(&self) -> &str {
        &self.notification.user_id
    }
}
