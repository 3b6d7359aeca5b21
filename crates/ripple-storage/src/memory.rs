// In-memory storage implementation for dev mode
// Decision: Use parking_lot for thread-safe access
// Decision: UUIDs generated via uuid v7 (time-ordered)
//
// This implementation mirrors the PostgreSQL repositories (ordering, filters,
// limits, idempotent mark-read) so the server runs without a database.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use ripple_core::{CreateEvent, CreateNotification};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::*;

/// In-memory database for dev mode
/// All data is stored in memory and lost on restart
#[derive(Default)]
pub struct InMemoryDatabase {
    events: RwLock<HashMap<Uuid, EventRow>>,
    notifications: RwLock<HashMap<Uuid, NotificationRow>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    // ============================================
    // Events
    // ============================================

    pub async fn insert_event(&self, input: CreateEvent) -> Result<EventRow> {
        let row = EventRow {
            id: Uuid::now_v7(),
            actor_id: input.actor_id,
            verb: input.verb,
            object_type: input.object_type,
            object_id: input.object_id,
            target_user_ids: input.target_user_ids,
            metadata: input.metadata,
            created_at: input.created_at,
        };
        self.events.write().insert(row.id, row.clone());
        Ok(row)
    }

    pub async fn list_feed(
        &self,
        user_id: &str,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<EventRow>> {
        let events = self.events.read();
        let mut rows: Vec<EventRow> = events
            .values()
            .filter(|e| e.actor_id == user_id || e.target_user_ids.iter().any(|t| t == user_id))
            .filter(|e| before.map_or(true, |b| e.created_at < b))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    pub async fn list_events_since(&self, since: DateTime<Utc>) -> Result<Vec<EventRow>> {
        let events = self.events.read();
        let mut rows: Vec<EventRow> = events
            .values()
            .filter(|e| e.created_at >= since)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    // ============================================
    // Notifications
    // ============================================

    pub async fn create_notification(&self, input: CreateNotification) -> Result<NotificationRow> {
        if !self.events.read().contains_key(&input.event_id) {
            return Err(anyhow!("Event not found: {}", input.event_id));
        }

        let mut notifications = self.notifications.write();
        if notifications
            .values()
            .any(|n| n.event_id == input.event_id && n.user_id == input.user_id)
        {
            return Err(anyhow!(
                "Notification already exists for event {} and user {}",
                input.event_id,
                input.user_id
            ));
        }

        let row = NotificationRow {
            id: Uuid::now_v7(),
            user_id: input.user_id,
            event_id: input.event_id,
            is_read: false,
            created_at: Self::now(),
        };
        notifications.insert(row.id, row.clone());
        Ok(row)
    }

    pub async fn list_notifications(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<NotificationWithEventRow>> {
        let notifications = self.notifications.read();
        let events = self.events.read();

        let mut rows: Vec<&NotificationRow> = notifications
            .values()
            .filter(|n| n.user_id == user_id)
            .filter(|n| since.map_or(true, |s| n.created_at > s))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows.truncate(limit.max(0) as usize);

        Ok(rows
            .into_iter()
            .map(|n| {
                let event = events.get(&n.event_id);
                NotificationWithEventRow {
                    id: n.id,
                    user_id: n.user_id.clone(),
                    event_id: n.event_id,
                    is_read: n.is_read,
                    created_at: n.created_at,
                    event_actor_id: event.map(|e| e.actor_id.clone()),
                    event_verb: event.map(|e| e.verb.clone()),
                    event_object_type: event.map(|e| e.object_type.clone()),
                    event_object_id: event.map(|e| e.object_id.clone()),
                    event_target_user_ids: event.map(|e| e.target_user_ids.clone()),
                    event_metadata: event.map(|e| e.metadata.clone()),
                    event_created_at: event.map(|e| e.created_at),
                }
            })
            .collect())
    }

    pub async fn count_unread(&self, user_id: &str) -> Result<i64> {
        Ok(self
            .notifications
            .read()
            .values()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count() as i64)
    }

    pub async fn mark_notification_read(&self, id: Uuid) -> Result<Option<NotificationRow>> {
        let mut notifications = self.notifications.write();
        Ok(notifications.get_mut(&id).map(|n| {
            n.is_read = true;
            n.clone()
        }))
    }
}
