// Feed service
//
// Keyset pagination over the user's events: fetch limit+1 rows to learn
// whether another page exists, and hand back the last row's created_at as
// the cursor for the next one.

use chrono::{DateTime, Utc};
use ripple_core::{Event, EventStore, Result};
use std::sync::Arc;

pub const DEFAULT_FEED_LIMIT: usize = 20;
pub const MAX_FEED_LIMIT: usize = 100;

/// Requested page size clamped to [1, MAX_FEED_LIMIT]
pub fn clamp_limit(limit: Option<i64>) -> usize {
    match limit {
        None => DEFAULT_FEED_LIMIT,
        Some(n) => n.clamp(1, MAX_FEED_LIMIT as i64) as usize,
    }
}

#[derive(Debug, Clone)]
pub struct FeedPage {
    pub events: Vec<Event>,
    pub next_cursor: Option<DateTime<Utc>>,
    pub has_more: bool,
}

pub struct FeedService {
    store: Arc<dyn EventStore>,
}

impl FeedService {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    pub async fn page(
        &self,
        user_id: &str,
        cursor: Option<DateTime<Utc>>,
        limit: Option<i64>,
    ) -> Result<FeedPage> {
        let limit = clamp_limit(limit);
        let mut events = self.store.list_feed(user_id, cursor, limit + 1).await?;

        let has_more = events.len() > limit;
        events.truncate(limit);
        let next_cursor = if has_more {
            events.last().map(|e| e.created_at)
        } else {
            None
        };

        tracing::debug!(
            user_id = %user_id,
            count = events.len(),
            has_more,
            "Feed page served"
        );

        Ok(FeedPage {
            events,
            next_cursor,
            has_more,
        })
    }
}
