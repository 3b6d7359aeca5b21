// Notification fan-out
//
// One notification row per distinct target user, created concurrently. Each
// created row is pushed to the user's live connections right away. A failed
// target is logged and reported; it neither blocks nor rolls back the others.

use std::sync::Arc;

use futures::future::join_all;
use uuid::Uuid;

use crate::event::{Event, NotificationWithEvent};
use crate::live::LiveHub;
use crate::traits::{CreateNotification, EventStore};

/// A target whose notification could not be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanoutFailure {
    pub user_id: String,
    pub error: String,
}

/// Outcome of fanning out one event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Notification rows created
    pub notified: Vec<Uuid>,
    /// Live connections the notifications were queued for
    pub live_deliveries: usize,
    pub failures: Vec<FanoutFailure>,
}

impl FanoutReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Clone)]
pub struct NotificationFanout {
    store: Arc<dyn EventStore>,
    hub: LiveHub,
}

impl NotificationFanout {
    pub fn new(store: Arc<dyn EventStore>, hub: LiveHub) -> Self {
        Self { store, hub }
    }

    /// Create and push notifications for every distinct target of the event
    pub async fn dispatch(&self, event: &Event) -> FanoutReport {
        let targets = event.distinct_targets();
        if targets.is_empty() {
            return FanoutReport::default();
        }

        let results = join_all(targets.into_iter().map(|user_id| async move {
            let created = self
                .store
                .create_notification(CreateNotification {
                    user_id: user_id.to_string(),
                    event_id: event.id,
                })
                .await;

            match created {
                Ok(notification) => {
                    let id = notification.id;
                    let payload = Arc::new(NotificationWithEvent::new(
                        notification,
                        Some(event.clone()),
                    ));
                    let delivered = self.hub.publish(user_id, payload);
                    Ok((id, delivered))
                }
                Err(e) => Err(FanoutFailure {
                    user_id: user_id.to_string(),
                    error: e.to_string(),
                }),
            }
        }))
        .await;

        let mut report = FanoutReport::default();
        for result in results {
            match result {
                Ok((id, delivered)) => {
                    report.notified.push(id);
                    report.live_deliveries += delivered;
                }
                Err(failure) => {
                    tracing::warn!(
                        event_id = %event.id,
                        user_id = %failure.user_id,
                        error = %failure.error,
                        "Failed to create notification"
                    );
                    report.failures.push(failure);
                }
            }
        }

        tracing::debug!(
            event_id = %event.id,
            notified = report.notified.len(),
            live_deliveries = report.live_deliveries,
            failed = report.failures.len(),
            "Fan-out complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::LiveFrame;
    use crate::test_support::RecordingStore;
    use chrono::Utc;
    use serde_json::json;

    fn event_with_targets(targets: &[&str]) -> Event {
        Event {
            id: Uuid::now_v7(),
            actor_id: "alice".to_string(),
            verb: "starred".to_string(),
            object_type: "repository".to_string(),
            object_id: "acme/x".to_string(),
            target_user_ids: targets.iter().map(|t| t.to_string()).collect(),
            metadata: json!({}),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_one_notification_per_distinct_target() {
        let store = Arc::new(RecordingStore::default());
        let fanout = NotificationFanout::new(store.clone(), LiveHub::default());

        let report = fanout
            .dispatch(&event_with_targets(&["bob", "carol", "bob", "alice"]))
            .await;

        assert!(report.is_complete());
        assert_eq!(report.notified.len(), 3);
        let mut users: Vec<_> = store
            .notifications
            .read()
            .iter()
            .map(|n| n.user_id.clone())
            .collect();
        users.sort();
        assert_eq!(users, vec!["alice", "bob", "carol"]);
        assert!(store.notifications.read().iter().all(|n| !n.is_read));
    }

    #[tokio::test]
    async fn test_no_targets_creates_nothing() {
        let store = Arc::new(RecordingStore::default());
        let fanout = NotificationFanout::new(store.clone(), LiveHub::default());

        let report = fanout.dispatch(&event_with_targets(&[])).await;
        assert_eq!(report, FanoutReport::default());
        assert!(store.notifications.read().is_empty());
    }

    #[tokio::test]
    async fn test_failure_for_one_target_does_not_block_others() {
        let store = Arc::new(RecordingStore::default());
        store.fail_notifications_for("carol");
        let fanout = NotificationFanout::new(store.clone(), LiveHub::default());

        let report = fanout
            .dispatch(&event_with_targets(&["bob", "carol", "dave"]))
            .await;

        assert!(!report.is_complete());
        assert_eq!(report.notified.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].user_id, "carol");
    }

    #[tokio::test]
    async fn test_created_notifications_are_pushed_live() {
        let store = Arc::new(RecordingStore::default());
        let hub = LiveHub::default();
        let fanout = NotificationFanout::new(store, hub.clone());

        let mut bob = hub.connect("bob");
        bob.next_frame().await;

        let event = event_with_targets(&["bob", "carol"]);
        let report = fanout.dispatch(&event).await;
        assert_eq!(report.live_deliveries, 1);

        match bob.next_frame().await {
            Some(LiveFrame::Notification(n)) => {
                assert_eq!(n.user_id(), "bob");
                assert_eq!(n.event.as_ref().map(|e| e.id), Some(event.id));
            }
            other => panic!("expected notification, got {:?}", other),
        }
    }
}
