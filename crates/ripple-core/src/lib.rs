// Event Distribution and Analytics Core
//
// This crate provides a DB-agnostic implementation of the Ripple write path
// (ingest → persist → count → fan out) and the live delivery fabric.
//
// Key design decisions:
// - Uses the EventStore trait for pluggable persistence (Postgres or in-memory)
// - Sliding-window analytics are exact, from 1-second bucket rings per dimension
// - Live delivery is one bounded broadcast channel per connected user (LiveHub)
// - The LiveHub is an explicit object owned by the application state, never a global
// - Time comes from a Clock trait so window boundaries are testable
// - Error handling distinguishes client errors from storage and delivery failures

// Domain entity types
pub mod event;

pub mod aggregator;
pub mod clock;
pub mod error;
pub mod fanout;
pub mod ingest;
pub mod live;
pub mod traits;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use aggregator::{
    AnalyticsSnapshot, Dimension, KeyCount, SlidingWindowAggregator, Window, MAX_TOP_K,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Result, RippleError};
pub use event::{CreateEvent, Event, NewEvent, Notification, NotificationWithEvent};
pub use fanout::{FanoutFailure, FanoutReport, NotificationFanout};
pub use ingest::{validate_new_event, IngestOutcome, IngestionService};
pub use live::{ConnectionState, LiveConfig, LiveConnection, LiveFrame, LiveHub};
pub use traits::{CreateNotification, EventStore};
