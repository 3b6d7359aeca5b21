// In-crate EventStore used by fan-out and ingestion tests

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{Result, RippleError};
use crate::event::{CreateEvent, Event, Notification, NotificationWithEvent};
use crate::traits::{CreateNotification, EventStore};

#[derive(Default)]
pub struct RecordingStore {
    pub events: RwLock<Vec<Event>>,
    pub notifications: RwLock<Vec<Notification>>,
    pub fail_inserts: AtomicBool,
    pub failing_users: RwLock<HashSet<String>>,
}

impl RecordingStore {
    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }

    pub fn fail_notifications_for(&self, user_id: &str) {
        self.failing_users.write().insert(user_id.to_string());
    }
}

#[async_trait]
impl EventStore for RecordingStore {
    async fn insert_event(&self, input: CreateEvent) -> Result<Event> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(RippleError::storage("insert rejected"));
        }
        let event = Event {
            id: Uuid::now_v7(),
            actor_id: input.actor_id,
            verb: input.verb,
            object_type: input.object_type,
            object_id: input.object_id,
            target_user_ids: input.target_user_ids,
            metadata: input.metadata,
            created_at: input.created_at,
        };
        self.events.write().push(event.clone());
        Ok(event)
    }

    async fn list_feed(
        &self,
        user_id: &str,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Event>> {
        let mut events: Vec<Event> = self
            .events
            .read()
            .iter()
            .filter(|e| e.is_visible_to(user_id))
            .filter(|e| before.map_or(true, |b| e.created_at < b))
            .cloned()
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        events.truncate(limit);
        Ok(events)
    }

    async fn list_events_since(&self, since: DateTime<Utc>) -> Result<Vec<Event>> {
        Ok(self
            .events
            .read()
            .iter()
            .filter(|e| e.created_at >= since)
            .cloned()
            .collect())
    }

    async fn create_notification(&self, input: CreateNotification) -> Result<Notification> {
        if self.failing_users.read().contains(&input.user_id) {
            return Err(RippleError::storage(format!(
                "notification insert rejected for {}",
                input.user_id
            )));
        }
        let notification = Notification {
            id: Uuid::now_v7(),
            user_id: input.user_id,
            event_id: input.event_id,
            is_read: false,
            created_at: Utc::now(),
        };
        self.notifications.write().push(notification.clone());
        Ok(notification)
    }

    async fn list_notifications(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<NotificationWithEvent>> {
        let events = self.events.read();
        Ok(self
            .notifications
            .read()
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id)
            .filter(|n| since.map_or(true, |s| n.created_at > s))
            .take(limit)
            .map(|n| {
                let event = events.iter().find(|e| e.id == n.event_id).cloned();
                NotificationWithEvent::new(n.clone(), event)
            })
            .collect())
    }

    async fn count_unread(&self, user_id: &str) -> Result<u64> {
        Ok(self
            .notifications
            .read()
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count() as u64)
    }

    async fn mark_notification_read(&self, id: Uuid) -> Result<Option<Notification>> {
        let mut notifications = self.notifications.write();
        Ok(notifications.iter_mut().find(|n| n.id == id).map(|n| {
            n.is_read = true;
            n.clone()
        }))
    }
}
