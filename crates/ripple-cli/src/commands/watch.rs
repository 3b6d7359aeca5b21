// Watch command - follow live notifications over SSE
//
// The stream only delivers what is published while connected, so after every
// reconnect the recent list is re-read with `since` to fill the gap.

use super::notifications::{fetch, print_notification};
use super::Notification;
use crate::client::Client;
use crate::output::{print_table_header, OutputFormat};
use anyhow::Result;
use chrono::{DateTime, Utc};
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::Deserialize;
use std::collections::VecDeque;
use std::time::Duration;
use uuid::Uuid;

pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// How many shown notification ids are remembered for de-duplication
const SEEN_CAPACITY: usize = 256;

/// Slack for client/server clock difference when nothing has been seen yet
const CLOCK_SKEW_SECS: i64 = 5;

/// JSON payload of a stream `data:` line
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamMessage {
    Connected { user_id: String },
    Notification { data: Notification },
}

fn parse_message(data: &str) -> Option<StreamMessage> {
    serde_json::from_str(data).ok()
}

struct Watcher<'a> {
    client: &'a Client,
    output: OutputFormat,
    quiet: bool,
    user_id: &'a str,
    /// created_at of the newest notification shown so far
    newest: Option<DateTime<Utc>>,
    /// When the first connection was acknowledged
    first_connected_at: Option<DateTime<Utc>>,
    /// Catch-up and a live push can both carry the same notification
    seen: VecDeque<Uuid>,
    header_printed: bool,
}

impl<'a> Watcher<'a> {
    fn show(&mut self, notification: &Notification) {
        if self.seen.contains(&notification.id) {
            return;
        }
        if self.seen.len() == SEEN_CAPACITY {
            self.seen.pop_front();
        }
        self.seen.push_back(notification.id);

        if self.newest.map_or(true, |t| notification.created_at > t) {
            self.newest = Some(notification.created_at);
        }

        if self.output.is_text() {
            if !self.header_printed {
                print_table_header(&[(" ", 1), ("ID", 36), ("TIME", 19), ("ACTIVITY", 50)]);
                self.header_printed = true;
            }
            print_notification(notification);
        } else {
            self.output.print_value(notification);
        }
    }

    /// Lower bound for the catch-up read after a (re)connect.
    /// None on the first connection, which has nothing to catch up on.
    fn on_connected(&mut self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let Some(first) = self.first_connected_at else {
            self.first_connected_at = Some(now);
            return None;
        };
        Some(
            self.newest
                .unwrap_or(first - chrono::Duration::seconds(CLOCK_SKEW_SECS)),
        )
    }

    /// Show anything published while disconnected, oldest first
    async fn catch_up(&mut self, since: DateTime<Utc>) -> Result<()> {
        let list = fetch(self.client, self.user_id, Some(since)).await?;
        for notification in list.notifications.iter().rev() {
            self.show(notification);
        }
        Ok(())
    }

    /// One connection; returns when the stream ends or fails
    async fn follow(&mut self) -> Result<()> {
        let response = self
            .client
            .stream("/v1/notifications/stream", &[("user_id", self.user_id)])
            .await?;
        let mut events = response.bytes_stream().eventsource();

        while let Some(event) = events.next().await {
            let event = event.map_err(|e| anyhow::anyhow!("stream error: {}", e))?;
            match parse_message(&event.data) {
                Some(StreamMessage::Connected { user_id }) => {
                    if !self.quiet && self.output.is_text() {
                        eprintln!("Connected as {}", user_id);
                    }
                    // the subscription is live now, so nothing newer can be missed
                    if let Some(since) = self.on_connected(Utc::now()) {
                        if let Err(e) = self.catch_up(since).await {
                            eprintln!("Catch-up failed: {}", e);
                        }
                    }
                }
                Some(StreamMessage::Notification { data }) => self.show(&data),
                None => {}
            }
        }

        Ok(())
    }
}

pub async fn run(client: &Client, output: OutputFormat, quiet: bool, user_id: &str) -> Result<()> {
    let mut watcher = Watcher {
        client,
        output,
        quiet,
        user_id,
        newest: None,
        first_connected_at: None,
        seen: VecDeque::with_capacity(SEEN_CAPACITY),
        header_printed: false,
    };

    loop {
        tokio::select! {
            result = watcher.follow() => {
                if let Err(e) = result {
                    eprintln!("Stream error: {}", e);
                } else if !quiet {
                    eprintln!("Stream closed");
                }
            }
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }

        if !quiet {
            eprintln!("Reconnecting in {}s...", RECONNECT_DELAY.as_secs());
        }
        tokio::select! {
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watcher(client: &Client) -> Watcher<'_> {
        Watcher {
            client,
            output: OutputFormat::Json,
            quiet: true,
            user_id: "bob",
            newest: None,
            first_connected_at: None,
            seen: VecDeque::new(),
            header_printed: false,
        }
    }

    fn notification_at(created_at: DateTime<Utc>) -> Notification {
        Notification {
            id: Uuid::now_v7(),
            user_id: "bob".to_string(),
            event_id: Uuid::now_v7(),
            is_read: false,
            created_at,
            event: None,
        }
    }

    #[test]
    fn test_reconnect_without_seen_notifications_catches_up_from_first_connect() {
        let client = Client::new("http://localhost:9000", Some("bob".to_string()));
        let mut watcher = watcher(&client);
        let first = Utc::now();

        assert_eq!(watcher.on_connected(first), None);

        let since = watcher.on_connected(first + chrono::Duration::seconds(30));
        assert_eq!(
            since,
            Some(first - chrono::Duration::seconds(CLOCK_SKEW_SECS))
        );
    }

    #[test]
    fn test_reconnect_catches_up_from_newest_seen() {
        let client = Client::new("http://localhost:9000", Some("bob".to_string()));
        let mut watcher = watcher(&client);
        let first = Utc::now();
        watcher.on_connected(first);

        let newest = first + chrono::Duration::seconds(10);
        watcher.show(&notification_at(newest));
        watcher.show(&notification_at(first + chrono::Duration::seconds(2)));

        assert_eq!(
            watcher.on_connected(first + chrono::Duration::seconds(60)),
            Some(newest)
        );
    }

    #[test]
    fn test_same_notification_is_shown_once() {
        let client = Client::new("http://localhost:9000", Some("bob".to_string()));
        let mut watcher = watcher(&client);
        let notification = notification_at(Utc::now());

        watcher.show(&notification);
        watcher.show(&notification);
        assert_eq!(watcher.seen.len(), 1);
    }

    #[test]
    fn test_parse_connected() {
        let message = parse_message(r#"{"type":"connected","user_id":"bob"}"#);
        assert!(matches!(message, Some(StreamMessage::Connected { user_id }) if user_id == "bob"));
    }

    #[test]
    fn test_parse_notification() {
        let data = r#"{
            "type": "notification",
            "data": {
                "id": "0192f0c4-7c1e-7a3b-9d2e-3f4a5b6c7d8e",
                "user_id": "bob",
                "event_id": "0192f0c4-7c1e-7a3b-9d2e-3f4a5b6c7d8f",
                "is_read": false,
                "created_at": "2026-10-19T12:00:00Z",
                "event": {
                    "id": "0192f0c4-7c1e-7a3b-9d2e-3f4a5b6c7d8f",
                    "actor_id": "alice",
                    "verb": "starred",
                    "object_type": "repository",
                    "object_id": "acme/x",
                    "target_user_ids": ["bob"],
                    "metadata": {},
                    "created_at": "2026-10-19T12:00:00Z"
                }
            }
        }"#;
        match parse_message(data) {
            Some(StreamMessage::Notification { data }) => {
                assert_eq!(data.user_id, "bob");
                assert_eq!(data.summary(), "alice starred repository acme/x");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_payload_is_ignored() {
        assert!(parse_message("heartbeat").is_none());
        assert!(parse_message(r#"{"type":"something_else"}"#).is_none());
    }
}
