// CLI subcommands and the API payloads they share

pub mod feed;
pub mod ingest;
pub mod notifications;
pub mod read;
pub mod top;
pub mod watch;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub actor_id: String,
    pub verb: String,
    pub object_type: String,
    pub object_id: String,
    #[serde(default)]
    pub target_user_ids: Vec<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// One-line description, e.g. "alice starred repository acme/x"
    pub fn summary(&self) -> String {
        format!(
            "{} {} {} {}",
            self.actor_id, self.verb, self.object_type, self.object_id
        )
    }
}

/// Notification with its embedded event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: String,
    pub event_id: Uuid,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub event: Option<Event>,
}

impl Notification {
    pub fn summary(&self) -> String {
        match &self.event {
            Some(event) => event.summary(),
            None => format!("event {} (unavailable)", self.event_id),
        }
    }
}

/// Timestamp column for tables
pub fn format_time(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}
