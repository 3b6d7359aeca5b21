// Live notification multiplexer
//
// Decision: One tokio broadcast channel per connected user, held in a sharded
// map. Every open connection of that user is a receiver. publish() is a
// non-blocking send; a receiver that falls behind the bounded buffer loses the
// oldest messages and takes a lag strike. Enough strikes in a row closes it.
//
// A connection registers on creation and deregisters in Drop, so every exit
// path (client close, transport error, forced close) releases the channel.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::error::RippleError;
use crate::event::NotificationWithEvent;

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;
pub const DEFAULT_MAX_LAG_STRIKES: u32 = 3;

/// Tunables for live delivery
#[derive(Debug, Clone)]
pub struct LiveConfig {
    pub heartbeat_interval: Duration,
    /// Per-user buffer; tokio rounds it up to a power of two.
    pub channel_capacity: usize,
    pub max_lag_strikes: u32,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_lag_strikes: DEFAULT_MAX_LAG_STRIKES,
        }
    }
}

impl LiveConfig {
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn with_max_lag_strikes(mut self, strikes: u32) -> Self {
        self.max_lag_strikes = strikes.max(1);
        self
    }
}

/// One message on a live connection
#[derive(Debug, Clone)]
pub enum LiveFrame {
    /// First frame after connecting
    Connected { user_id: String },
    Notification(Arc<NotificationWithEvent>),
    Heartbeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

type Sender = broadcast::Sender<Arc<NotificationWithEvent>>;
type Receiver = broadcast::Receiver<Arc<NotificationWithEvent>>;

struct HubInner {
    channels: DashMap<String, Sender>,
    config: LiveConfig,
}

/// Registry of live connections keyed by user id
#[derive(Clone)]
pub struct LiveHub {
    inner: Arc<HubInner>,
}

impl Default for LiveHub {
    fn default() -> Self {
        Self::new(LiveConfig::default())
    }
}

impl LiveHub {
    pub fn new(config: LiveConfig) -> Self {
        Self {
            inner: Arc::new(HubInner {
                channels: DashMap::new(),
                config,
            }),
        }
    }

    pub fn config(&self) -> &LiveConfig {
        &self.inner.config
    }

    /// Register a new connection for the user
    pub fn connect(&self, user_id: impl Into<String>) -> LiveConnection {
        let user_id = user_id.into();
        let capacity = self.inner.config.channel_capacity;

        // Subscribing under the entry lock keeps a concurrent release from
        // removing the channel between lookup and subscribe.
        let receiver = self
            .inner
            .channels
            .entry(user_id.clone())
            .or_insert_with(|| broadcast::channel(capacity).0)
            .subscribe();

        tracing::info!(user_id = %user_id, "Live connection registered");

        LiveConnection {
            user_id,
            hub: self.clone(),
            receiver: Some(receiver),
            state: ConnectionState::Connecting,
            heartbeat: None,
            lag_strikes: 0,
            close_reason: None,
        }
    }

    /// Deliver to every open connection of the user. Never blocks.
    /// Returns how many connections the notification was queued for.
    pub fn publish(&self, user_id: &str, notification: Arc<NotificationWithEvent>) -> usize {
        let Some(sender) = self.inner.channels.get(user_id) else {
            return 0;
        };
        match sender.send(notification) {
            Ok(receivers) => {
                tracing::debug!(user_id = %user_id, receivers, "Published live notification");
                receivers
            }
            Err(_) => 0,
        }
    }

    /// Open connections for a user
    pub fn connection_count(&self, user_id: &str) -> usize {
        self.inner
            .channels
            .get(user_id)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }

    /// Users with at least one registered channel
    pub fn active_users(&self) -> usize {
        self.inner.channels.len()
    }

    fn release(&self, user_id: &str) {
        let removed = self
            .inner
            .channels
            .remove_if(user_id, |_, sender| sender.receiver_count() == 0);
        if removed.is_some() {
            tracing::debug!(user_id = %user_id, "Removed idle live channel");
        }
    }
}

/// A single reader's live connection
///
/// Frames are pulled with [`LiveConnection::next_frame`] or through
/// [`LiveConnection::into_stream`]. Dropping the connection deregisters it.
pub struct LiveConnection {
    user_id: String,
    hub: LiveHub,
    receiver: Option<Receiver>,
    state: ConnectionState,
    heartbeat: Option<Interval>,
    lag_strikes: u32,
    close_reason: Option<RippleError>,
}

impl LiveConnection {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Why the server closed this connection, if it did
    pub fn close_reason(&self) -> Option<&RippleError> {
        self.close_reason.as_ref()
    }

    /// Next frame, or None once the connection is closed
    pub async fn next_frame(&mut self) -> Option<LiveFrame> {
        loop {
            match self.state {
                ConnectionState::Connecting => {
                    let period = self.hub.config().heartbeat_interval;
                    let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
                    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    self.heartbeat = Some(heartbeat);
                    self.state = ConnectionState::Open;
                    return Some(LiveFrame::Connected {
                        user_id: self.user_id.clone(),
                    });
                }
                ConnectionState::Open => {
                    let (Some(receiver), Some(heartbeat)) =
                        (self.receiver.as_mut(), self.heartbeat.as_mut())
                    else {
                        self.state = ConnectionState::Closing;
                        continue;
                    };

                    match receiver.try_recv() {
                        Ok(notification) => return Some(LiveFrame::Notification(notification)),
                        Err(TryRecvError::Lagged(missed)) => {
                            self.strike(missed);
                            continue;
                        }
                        Err(TryRecvError::Closed) => {
                            self.state = ConnectionState::Closing;
                            continue;
                        }
                        // Queue fully drained
                        Err(TryRecvError::Empty) => self.lag_strikes = 0,
                    }

                    let received = tokio::select! {
                        received = receiver.recv() => received,
                        _ = heartbeat.tick() => return Some(LiveFrame::Heartbeat),
                    };

                    match received {
                        Ok(notification) => return Some(LiveFrame::Notification(notification)),
                        Err(RecvError::Lagged(missed)) => self.strike(missed),
                        Err(RecvError::Closed) => self.state = ConnectionState::Closing,
                    }
                }
                ConnectionState::Closing => {
                    self.close();
                    return None;
                }
                ConnectionState::Closed => return None,
            }
        }
    }

    /// Adapt into a stream of frames that ends when the connection closes
    pub fn into_stream(self) -> impl futures::Stream<Item = LiveFrame> + Send {
        futures::stream::unfold(self, |mut connection| async move {
            connection
                .next_frame()
                .await
                .map(|frame| (frame, connection))
        })
    }

    fn strike(&mut self, missed: u64) {
        self.lag_strikes += 1;
        tracing::warn!(
            user_id = %self.user_id,
            missed,
            strikes = self.lag_strikes,
            "Live connection lagged, oldest notifications dropped"
        );

        if self.lag_strikes >= self.hub.config().max_lag_strikes {
            let err = RippleError::delivery(format!(
                "connection for {} lagged {} times",
                self.user_id, self.lag_strikes
            ));
            tracing::error!(user_id = %self.user_id, error = %err, "Closing slow live connection");
            self.close_reason = Some(err);
            self.state = ConnectionState::Closing;
        }
    }

    fn close(&mut self) {
        if let Some(receiver) = self.receiver.take() {
            drop(receiver);
            self.hub.release(&self.user_id);
            tracing::info!(user_id = %self.user_id, "Live connection closed");
        }
        self.heartbeat = None;
        self.state = ConnectionState::Closed;
    }
}

impl Drop for LiveConnection {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, Notification};
    use chrono::Utc;
    use futures::StreamExt;
    use serde_json::json;
    use uuid::Uuid;

    fn notification_for(user_id: &str) -> Arc<NotificationWithEvent> {
        let event = Event {
            id: Uuid::now_v7(),
            actor_id: "alice".to_string(),
            verb: "starred".to_string(),
            object_type: "repository".to_string(),
            object_id: "acme/x".to_string(),
            target_user_ids: vec![user_id.to_string()],
            metadata: json!({}),
            created_at: Utc::now(),
        };
        let notification = Notification {
            id: Uuid::now_v7(),
            user_id: user_id.to_string(),
            event_id: event.id,
            is_read: false,
            created_at: Utc::now(),
        };
        Arc::new(NotificationWithEvent::new(notification, Some(event)))
    }

    fn expect_notification(frame: Option<LiveFrame>) -> Arc<NotificationWithEvent> {
        match frame {
            Some(LiveFrame::Notification(n)) => n,
            other => panic!("expected notification, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connected_frame_then_notifications() {
        let hub = LiveHub::default();
        let mut conn = hub.connect("bob");
        assert_eq!(conn.state(), ConnectionState::Connecting);

        match conn.next_frame().await {
            Some(LiveFrame::Connected { user_id }) => assert_eq!(user_id, "bob"),
            other => panic!("expected connected frame, got {:?}", other),
        }
        assert_eq!(conn.state(), ConnectionState::Open);

        let sent = notification_for("bob");
        assert_eq!(hub.publish("bob", sent.clone()), 1);
        assert_eq!(expect_notification(conn.next_frame().await).id(), sent.id());
    }

    #[tokio::test]
    async fn test_publish_reaches_every_connection_of_user() {
        let hub = LiveHub::default();
        let mut first = hub.connect("bob");
        let mut second = hub.connect("bob");
        let mut other = hub.connect("carol");
        assert_eq!(hub.connection_count("bob"), 2);

        assert_eq!(hub.publish("bob", notification_for("bob")), 2);

        for conn in [&mut first, &mut second] {
            conn.next_frame().await;
            expect_notification(conn.next_frame().await);
        }

        other.next_frame().await;
        assert!(matches!(
            other.receiver.as_mut().map(|r| r.try_recv()),
            Some(Err(TryRecvError::Empty))
        ));
    }

    #[tokio::test]
    async fn test_publish_without_readers_is_noop() {
        let hub = LiveHub::default();
        assert_eq!(hub.publish("nobody", notification_for("nobody")), 0);
        assert_eq!(hub.active_users(), 0);
    }

    #[tokio::test]
    async fn test_drop_releases_channel_when_last_reader_leaves() {
        let hub = LiveHub::default();
        let first = hub.connect("bob");
        let second = hub.connect("bob");
        assert_eq!(hub.active_users(), 1);

        drop(first);
        assert_eq!(hub.active_users(), 1);
        assert_eq!(hub.connection_count("bob"), 1);

        drop(second);
        assert_eq!(hub.active_users(), 0);
        assert_eq!(hub.connection_count("bob"), 0);
    }

    #[tokio::test]
    async fn test_reconnect_does_not_replay_missed_notifications() {
        let hub = LiveHub::default();
        drop(hub.connect("bob"));

        assert_eq!(hub.publish("bob", notification_for("bob")), 0);

        let mut conn = hub.connect("bob");
        conn.next_frame().await;
        let fresh = notification_for("bob");
        hub.publish("bob", fresh.clone());
        assert_eq!(expect_notification(conn.next_frame().await).id(), fresh.id());
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_when_idle() {
        let hub = LiveHub::new(LiveConfig::default().with_heartbeat_interval(Duration::from_secs(30)));
        let mut conn = hub.connect("bob");
        conn.next_frame().await;

        let started = Instant::now();
        assert!(matches!(conn.next_frame().await, Some(LiveFrame::Heartbeat)));
        assert!(started.elapsed() >= Duration::from_secs(30));

        assert!(matches!(conn.next_frame().await, Some(LiveFrame::Heartbeat)));
        assert!(started.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_slow_reader_is_closed_without_affecting_others() {
        let hub = LiveHub::new(
            LiveConfig::default()
                .with_channel_capacity(2)
                .with_max_lag_strikes(3),
        );
        let mut slow = hub.connect("bob");
        let mut fast = hub.connect("bob");
        slow.next_frame().await;
        fast.next_frame().await;

        for round in 0..3 {
            for _ in 0..3 {
                hub.publish("bob", notification_for("bob"));
                expect_notification(fast.next_frame().await);
            }
            let frame = slow.next_frame().await;
            if round < 2 {
                expect_notification(frame);
            } else {
                assert!(frame.is_none());
            }
        }

        assert_eq!(slow.state(), ConnectionState::Closed);
        assert!(matches!(slow.close_reason(), Some(RippleError::Delivery(_))));
        assert!(slow.next_frame().await.is_none());

        assert_eq!(hub.connection_count("bob"), 1);
        let sent = notification_for("bob");
        assert_eq!(hub.publish("bob", sent.clone()), 1);
        assert_eq!(expect_notification(fast.next_frame().await).id(), sent.id());
    }

    #[tokio::test(start_paused = true)]
    async fn test_draining_resets_lag_strikes() {
        let hub = LiveHub::new(
            LiveConfig::default()
                .with_channel_capacity(2)
                .with_max_lag_strikes(2),
        );
        let mut conn = hub.connect("bob");
        conn.next_frame().await;

        for _ in 0..3 {
            for _ in 0..3 {
                hub.publish("bob", notification_for("bob"));
            }
            // lag once, then drain the two retained messages
            expect_notification(conn.next_frame().await);
            expect_notification(conn.next_frame().await);
            // queue empty: strikes reset while waiting for the heartbeat
            assert!(matches!(conn.next_frame().await, Some(LiveFrame::Heartbeat)));
        }

        assert_eq!(conn.state(), ConnectionState::Open);
    }

    #[tokio::test]
    async fn test_stream_ends_and_releases_on_drop() {
        let hub = LiveHub::default();
        let mut stream = Box::pin(hub.connect("bob").into_stream());

        assert!(matches!(stream.next().await, Some(LiveFrame::Connected { .. })));
        hub.publish("bob", notification_for("bob"));
        assert!(matches!(stream.next().await, Some(LiveFrame::Notification(_))));

        drop(stream);
        assert_eq!(hub.active_users(), 0);
    }
}
