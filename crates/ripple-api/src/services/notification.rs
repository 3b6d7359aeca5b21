// Notification service
//
// Reads a user's recent notifications with the unread total, and flips
// single notifications to read.

use chrono::{DateTime, Utc};
use ripple_core::{EventStore, Notification, NotificationWithEvent, Result, RippleError};
use std::sync::Arc;
use uuid::Uuid;

/// Notifications returned per list call
pub const NOTIFICATION_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone)]
pub struct NotificationList {
    pub notifications: Vec<NotificationWithEvent>,
    /// All of the user's unread notifications, not only this page
    pub unread_count: u64,
}

pub struct NotificationService {
    store: Arc<dyn EventStore>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    pub async fn list(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<NotificationList> {
        let (notifications, unread_count) = tokio::try_join!(
            self.store
                .list_notifications(user_id, since, NOTIFICATION_PAGE_SIZE),
            self.store.count_unread(user_id),
        )?;

        Ok(NotificationList {
            notifications,
            unread_count,
        })
    }

    /// Idempotent; NotFound for an unknown id
    pub async fn mark_read(&self, id: Uuid) -> Result<Notification> {
        let notification = self
            .store
            .mark_notification_read(id)
            .await?
            .ok_or_else(|| RippleError::not_found("Notification"))?;

        tracing::debug!(notification_id = %id, user_id = %notification.user_id, "Notification marked read");
        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_core::{CreateEvent, CreateNotification};
    use ripple_storage::StorageBackend;
    use serde_json::json;

    async fn seed(store: &Arc<dyn EventStore>, user: &str, count: usize) -> Vec<Uuid> {
        let mut ids = Vec::new();
        for i in 0..count {
            let event = store
                .insert_event(CreateEvent {
                    actor_id: "alice".to_string(),
                    verb: "commented".to_string(),
                    object_type: "issue".to_string(),
                    object_id: format!("issue-{}", i),
                    target_user_ids: vec![user.to_string()],
                    metadata: json!({}),
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
            let notification = store
                .create_notification(CreateNotification {
                    user_id: user.to_string(),
                    event_id: event.id,
                })
                .await
                .unwrap();
            ids.push(notification.id);
        }
        ids
    }

    #[tokio::test]
    async fn test_list_caps_page_but_counts_all_unread() {
        let store: Arc<dyn EventStore> = Arc::new(StorageBackend::in_memory());
        seed(&store, "bob", 55).await;

        let list = NotificationService::new(store)
            .list("bob", None)
            .await
            .unwrap();
        assert_eq!(list.notifications.len(), NOTIFICATION_PAGE_SIZE);
        assert_eq!(list.unread_count, 55);
        assert!(list.notifications.iter().all(|n| n.event.is_some()));
    }

    #[tokio::test]
    async fn test_mark_read_is_idempotent() {
        let store: Arc<dyn EventStore> = Arc::new(StorageBackend::in_memory());
        let ids = seed(&store, "bob", 2).await;
        let service = NotificationService::new(store);

        assert!(service.mark_read(ids[0]).await.unwrap().is_read);
        assert_eq!(service.list("bob", None).await.unwrap().unread_count, 1);

        service.mark_read(ids[0]).await.unwrap();
        assert_eq!(service.list("bob", None).await.unwrap().unread_count, 1);
    }

    #[tokio::test]
    async fn test_mark_read_unknown_id() {
        let store: Arc<dyn EventStore> = Arc::new(StorageBackend::in_memory());
        let err = NotificationService::new(store)
            .mark_read(Uuid::now_v7())
            .await
            .unwrap_err();
        assert!(matches!(err, RippleError::NotFound(_)));
    }
}
