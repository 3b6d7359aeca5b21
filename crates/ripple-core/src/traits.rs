// Core traits for pluggable backends
//
// The EventStore is the durable, ordered system of record for events and
// notifications. Implementations:
// - PostgreSQL (ripple-storage::Database) for production
// - In-memory (ripple-storage::InMemoryDatabase) for dev mode and tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::event::{CreateEvent, Event, Notification, NotificationWithEvent};

/// Input for creating a notification row
#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub user_id: String,
    pub event_id: Uuid,
}

/// Durable storage of events and per-user notification rows
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persist an event and assign its id. Returns only once the write is durable.
    async fn insert_event(&self, input: CreateEvent) -> Result<Event>;

    /// Events where the user is the actor or a target, newest first
    /// (`created_at` desc, then `id` desc), strictly older than `before`.
    async fn list_feed(
        &self,
        user_id: &str,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Event>>;

    /// All events with `created_at >= since`, oldest first
    async fn list_events_since(&self, since: DateTime<Utc>) -> Result<Vec<Event>>;

    /// Create one unread notification row
    async fn create_notification(&self, input: CreateNotification) -> Result<Notification>;

    /// A user's notifications with embedded events, newest first,
    /// strictly newer than `since` when given.
    async fn list_notifications(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<NotificationWithEvent>>;

    /// Number of the user's notifications with `is_read = false`
    async fn count_unread(&self, user_id: &str) -> Result<u64>;

    /// Set `is_read = true`. Idempotent; `None` if the notification does not exist.
    async fn mark_notification_read(&self, id: Uuid) -> Result<Option<Notification>>;
}
