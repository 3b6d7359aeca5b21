// Storage backend abstraction
// Decision: Use enum dispatch for simplicity over trait objects
//
// This module provides a unified StorageBackend enum that can work with
// either PostgreSQL (production) or in-memory (dev mode) storage, and
// implements the core EventStore trait on top of it.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ripple_core::{
    CreateEvent, CreateNotification, Event, EventStore, Notification, NotificationWithEvent,
    RippleError,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::memory::InMemoryDatabase;
use crate::models::*;
use crate::repositories::Database;

/// Storage backend that can be either PostgreSQL or in-memory
#[derive(Clone)]
pub enum StorageBackend {
    /// PostgreSQL database (production)
    Postgres(Database),
    /// In-memory database (dev mode)
    InMemory(Arc<InMemoryDatabase>),
}

impl StorageBackend {
    /// Create a PostgreSQL storage backend from a database URL
    pub async fn postgres(database_url: &str) -> Result<Self> {
        let db = Database::from_url(database_url).await?;
        Ok(Self::Postgres(db))
    }

    /// Create an in-memory storage backend
    pub fn in_memory() -> Self {
        Self::InMemory(Arc::new(InMemoryDatabase::new()))
    }

    /// Short name reported by the health endpoint
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::InMemory(_) => "memory",
        }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        match self {
            Self::Postgres(db) => db.run_migrations().await,
            Self::InMemory(_) => Ok(()),
        }
    }

    pub async fn health_check(&self) -> Result<()> {
        match self {
            Self::Postgres(db) => db.health_check().await,
            Self::InMemory(_) => Ok(()),
        }
    }

    // ============================================
    // Events
    // ============================================

    pub async fn insert_event(&self, input: CreateEvent) -> Result<EventRow> {
        match self {
            Self::Postgres(db) => db.insert_event(input).await,
            Self::InMemory(db) => db.insert_event(input).await,
        }
    }

    pub async fn list_feed(
        &self,
        user_id: &str,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<EventRow>> {
        match self {
            Self::Postgres(db) => db.list_feed(user_id, before, limit).await,
            Self::InMemory(db) => db.list_feed(user_id, before, limit).await,
        }
    }

    pub async fn list_events_since(&self, since: DateTime<Utc>) -> Result<Vec<EventRow>> {
        match self {
            Self::Postgres(db) => db.list_events_since(since).await,
            Self::InMemory(db) => db.list_events_since(since).await,
        }
    }

    // ============================================
    // Notifications
    // ============================================

    pub async fn create_notification(&self, input: CreateNotification) -> Result<NotificationRow> {
        match self {
            Self::Postgres(db) => db.create_notification(input).await,
            Self::InMemory(db) => db.create_notification(input).await,
        }
    }

    pub async fn list_notifications(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<NotificationWithEventRow>> {
        match self {
            Self::Postgres(db) => db.list_notifications(user_id, since, limit).await,
            Self::InMemory(db) => db.list_notifications(user_id, since, limit).await,
        }
    }

    pub async fn count_unread(&self, user_id: &str) -> Result<i64> {
        match self {
            Self::Postgres(db) => db.count_unread(user_id).await,
            Self::InMemory(db) => db.count_unread(user_id).await,
        }
    }

    pub async fn mark_notification_read(&self, id: Uuid) -> Result<Option<NotificationRow>> {
        match self {
            Self::Postgres(db) => db.mark_notification_read(id).await,
            Self::InMemory(db) => db.mark_notification_read(id).await,
        }
    }
}

fn store_error(e: anyhow::Error) -> RippleError {
    let message = format!("{:#}", e);
    tracing::error!(error = %message, "Storage operation failed");
    RippleError::storage(message)
}

fn clamp_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl EventStore for StorageBackend {
    async fn insert_event(&self, input: CreateEvent) -> ripple_core::Result<Event> {
        StorageBackend::insert_event(self, input)
            .await
            .map(Event::from)
            .map_err(store_error)
    }

    async fn list_feed(
        &self,
        user_id: &str,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> ripple_core::Result<Vec<Event>> {
        StorageBackend::list_feed(self, user_id, before, clamp_limit(limit))
            .await
            .map(|rows| rows.into_iter().map(Event::from).collect())
            .map_err(store_error)
    }

    async fn list_events_since(&self, since: DateTime<Utc>) -> ripple_core::Result<Vec<Event>> {
        StorageBackend::list_events_since(self, since)
            .await
            .map(|rows| rows.into_iter().map(Event::from).collect())
            .map_err(store_error)
    }

    async fn create_notification(
        &self,
        input: CreateNotification,
    ) -> ripple_core::Result<Notification> {
        StorageBackend::create_notification(self, input)
            .await
            .map(Notification::from)
            .map_err(store_error)
    }

    async fn list_notifications(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> ripple_core::Result<Vec<NotificationWithEvent>> {
        StorageBackend::list_notifications(self, user_id, since, clamp_limit(limit))
            .await
            .map(|rows| rows.into_iter().map(NotificationWithEvent::from).collect())
            .map_err(store_error)
    }

    async fn count_unread(&self, user_id: &str) -> ripple_core::Result<u64> {
        StorageBackend::count_unread(self, user_id)
            .await
            .map(|count| count.max(0) as u64)
            .map_err(store_error)
    }

    async fn mark_notification_read(&self, id: Uuid) -> ripple_core::Result<Option<Notification>> {
        StorageBackend::mark_notification_read(self, id)
            .await
            .map(|row| row.map(Notification::from))
            .map_err(store_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_event_store_over_in_memory_backend() {
        let backend = StorageBackend::in_memory();
        assert_eq!(backend.kind(), "memory");

        let store: Arc<dyn EventStore> = Arc::new(backend);
        let event = store
            .insert_event(CreateEvent {
                actor_id: "alice".to_string(),
                verb: "starred".to_string(),
                object_type: "repository".to_string(),
                object_id: "acme/x".to_string(),
                target_user_ids: vec!["bob".to_string()],
                metadata: json!({ "source": "web" }),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let feed = store.list_feed("bob", None, 10).await.unwrap();
        assert_eq!(feed, vec![event.clone()]);

        let notification = store
            .create_notification(CreateNotification {
                user_id: "bob".to_string(),
                event_id: event.id,
            })
            .await
            .unwrap();

        let listed = store.list_notifications("bob", None, 50).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].event.as_ref(), Some(&event));
        assert_eq!(store.count_unread("bob").await.unwrap(), 1);

        store.mark_notification_read(notification.id).await.unwrap();
        assert_eq!(store.count_unread("bob").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_storage_errors_map_to_storage_variant() {
        let store: Arc<dyn EventStore> = Arc::new(StorageBackend::in_memory());
        let err = store
            .create_notification(CreateNotification {
                user_id: "bob".to_string(),
                event_id: Uuid::now_v7(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RippleError::Storage(_)));
    }
}
