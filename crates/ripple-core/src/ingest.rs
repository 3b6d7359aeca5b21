// Event ingestion
//
// Validate, persist, then count and fan out. Persistence is the only fatal
// step: once the event is durable the caller gets its id, whatever happens
// to aggregation or notifications afterwards.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::aggregator::{SlidingWindowAggregator, Window};
use crate::clock::Clock;
use crate::error::{Result, RippleError};
use crate::event::{CreateEvent, Event, NewEvent};
use crate::fanout::{FanoutReport, NotificationFanout};
use crate::live::LiveHub;
use crate::traits::EventStore;

// =============================================================================
// Input Size Limits
// =============================================================================

/// Maximum size of actor_id, verb, object_type, object_id and each target id.
pub const MAX_FIELD_BYTES: usize = 512;

/// Maximum number of target users per event.
pub const MAX_TARGET_USERS: usize = 1000;

/// Maximum size of serialized metadata.
pub const MAX_METADATA_BYTES: usize = 64 * 1024; // 64 KB

fn required_field(name: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(RippleError::validation(format!("{} is required", name)));
    }
    if value.len() > MAX_FIELD_BYTES {
        tracing::warn!(
            "{} exceeds limit: {} bytes (max: {})",
            name,
            value.len(),
            MAX_FIELD_BYTES
        );
        return Err(RippleError::validation(format!(
            "{} exceeds {} bytes",
            name, MAX_FIELD_BYTES
        )));
    }
    Ok(value.to_string())
}

/// Check an incoming payload and turn it into a persistable event
pub fn validate_new_event(input: NewEvent, now: DateTime<Utc>) -> Result<CreateEvent> {
    let actor_id = required_field("actor_id", &input.actor_id)?;
    let verb = required_field("verb", &input.verb)?;
    let object_type = required_field("object_type", &input.object_type)?;
    let object_id = required_field("object_id", &input.object_id)?;

    let targets = input.target_user_ids.unwrap_or_default();
    if targets.len() > MAX_TARGET_USERS {
        tracing::warn!(
            "target_user_ids exceeds limit: {} (max: {})",
            targets.len(),
            MAX_TARGET_USERS
        );
        return Err(RippleError::validation(format!(
            "target_user_ids exceeds {} entries",
            MAX_TARGET_USERS
        )));
    }
    let target_user_ids = targets
        .iter()
        .map(|t| required_field("target_user_ids entry", t))
        .collect::<Result<Vec<_>>>()?;

    let metadata = input
        .metadata
        .unwrap_or_else(|| serde_json::Value::Object(Default::default()));
    if !metadata.is_object() {
        return Err(RippleError::validation("metadata must be a JSON object"));
    }
    let metadata_len = serde_json::to_vec(&metadata)
        .map_err(|e| RippleError::validation(format!("invalid metadata: {}", e)))?
        .len();
    if metadata_len > MAX_METADATA_BYTES {
        tracing::warn!(
            "metadata exceeds limit: {} bytes (max: {})",
            metadata_len,
            MAX_METADATA_BYTES
        );
        return Err(RippleError::validation(format!(
            "metadata exceeds {} bytes",
            MAX_METADATA_BYTES
        )));
    }

    Ok(CreateEvent {
        actor_id,
        verb,
        object_type,
        object_id,
        target_user_ids,
        metadata,
        created_at: input.created_at.unwrap_or(now),
    })
}

/// What happened to an accepted event
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub event: Event,
    /// Whether the aggregator counted it
    pub counted: bool,
    pub fanout: FanoutReport,
}

/// Entry point for new events
#[derive(Clone)]
pub struct IngestionService {
    store: Arc<dyn EventStore>,
    aggregator: Arc<SlidingWindowAggregator>,
    fanout: NotificationFanout,
    clock: Arc<dyn Clock>,
}

impl IngestionService {
    pub fn new(
        store: Arc<dyn EventStore>,
        aggregator: Arc<SlidingWindowAggregator>,
        hub: LiveHub,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let fanout = NotificationFanout::new(store.clone(), hub);
        Self {
            store,
            aggregator,
            fanout,
            clock,
        }
    }

    pub fn aggregator(&self) -> &Arc<SlidingWindowAggregator> {
        &self.aggregator
    }

    /// Validate and persist an event, then count it and notify its targets
    pub async fn ingest(&self, input: NewEvent) -> Result<IngestOutcome> {
        let create = validate_new_event(input, self.clock.now())?;

        let event = self.store.insert_event(create).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to persist event");
            e
        })?;

        tracing::info!(
            event_id = %event.id,
            actor_id = %event.actor_id,
            verb = %event.verb,
            targets = event.target_user_ids.len(),
            "Event ingested"
        );

        let counted = self.aggregator.record(&event);
        let fanout = self.fanout.dispatch(&event).await;
        if !fanout.is_complete() {
            tracing::warn!(
                event_id = %event.id,
                failed = fanout.failures.len(),
                "Fan-out incomplete"
            );
        }

        Ok(IngestOutcome {
            event,
            counted,
            fanout,
        })
    }

    /// Replay events inside the largest window into the aggregator.
    /// Returns the number of events counted.
    pub async fn warm_up(&self) -> Result<usize> {
        let since = self.clock.now() - Window::largest().duration();
        let events = self.store.list_events_since(since).await?;
        let counted = self.aggregator.replay(&events);
        tracing::info!(counted, scanned = events.len(), "Analytics warmed up");
        Ok(counted)
    }
}
