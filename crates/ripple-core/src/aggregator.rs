// Sliding-window aggregator for top verbs and objects
//
// Decision: Per-dimension ring of 1-second buckets covering the largest window,
// each bucket behind its own lock. record() touches one bucket per dimension;
// a query sums the buckets inside the window. Cost is buckets x distinct keys,
// independent of total event volume.
//
// A bucket stamps the second it holds. A stale stamp means the slot belongs to
// a second that has slid out of the ring, so it is reset lazily on the next
// write and skipped by readers. sweep() reclaims memory of idle slots.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::task::JoinHandle;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::clock::Clock;
use crate::error::RippleError;
use crate::event::Event;

/// Server-side cap on k
pub const MAX_TOP_K: usize = 100;

/// How far in the future an event timestamp may be and still be counted
pub const DEFAULT_FUTURE_SKEW_SECS: i64 = 60;

// ============================================
// Windows and dimensions
// ============================================

/// Trailing window over which counts are computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub enum Window {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[default]
    #[serde(rename = "1h")]
    OneHour,
}

impl Window {
    pub const ALL: [Window; 3] = [Window::OneMinute, Window::FiveMinutes, Window::OneHour];

    pub fn as_str(&self) -> &'static str {
        match self {
            Window::OneMinute => "1m",
            Window::FiveMinutes => "5m",
            Window::OneHour => "1h",
        }
    }

    pub fn duration_secs(&self) -> i64 {
        match self {
            Window::OneMinute => 60,
            Window::FiveMinutes => 5 * 60,
            Window::OneHour => 60 * 60,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::seconds(self.duration_secs())
    }

    /// The window the ring must cover
    pub fn largest() -> Window {
        Window::OneHour
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Window {
    type Err = RippleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Window::OneMinute),
            "5m" => Ok(Window::FiveMinutes),
            "1h" => Ok(Window::OneHour),
            _ => Err(RippleError::validation("Invalid window. Use 1m, 5m, or 1h")),
        }
    }
}

/// Which field of an event is counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Verb,
    /// Keyed by object_id
    Object,
}

/// One ranked entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct KeyCount {
    #[cfg_attr(feature = "openapi", schema(example = "starred"))]
    pub key: String,
    pub count: u64,
}

/// Top analytics for one window as of a single instant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct AnalyticsSnapshot {
    pub window: Window,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    /// Events in the window (every event has exactly one verb).
    pub total_events: u64,
    pub top_verbs: Vec<KeyCount>,
    pub top_objects: Vec<KeyCount>,
}

// ============================================
// Bucket ring
// ============================================

struct Bucket {
    /// Unix second this slot currently holds; i64::MIN when empty.
    second: i64,
    counts: HashMap<String, u64>,
}

impl Bucket {
    fn empty() -> Self {
        Self {
            second: i64::MIN,
            counts: HashMap::new(),
        }
    }
}

struct BucketRing {
    buckets: Box<[Mutex<Bucket>]>,
}

impl BucketRing {
    fn new(len: usize) -> Self {
        Self {
            buckets: (0..len).map(|_| Mutex::new(Bucket::empty())).collect(),
        }
    }

    fn slot(&self, second: i64) -> &Mutex<Bucket> {
        let idx = second.rem_euclid(self.buckets.len() as i64) as usize;
        &self.buckets[idx]
    }

    /// Returns false when the slot was already taken over by a newer second
    fn increment(&self, second: i64, key: &str) -> bool {
        let mut bucket = self.slot(second).lock();
        if bucket.second != second {
            if bucket.second > second {
                return false;
            }
            bucket.second = second;
            bucket.counts.clear();
        }
        match bucket.counts.get_mut(key) {
            Some(count) => *count += 1,
            None => {
                bucket.counts.insert(key.to_owned(), 1);
            }
        }
        true
    }

    /// Per-key sums over the inclusive second range
    fn totals(&self, from: i64, to: i64) -> HashMap<String, u64> {
        let mut totals: HashMap<String, u64> = HashMap::new();
        for second in from..=to {
            let bucket = self.slot(second).lock();
            if bucket.second != second {
                continue;
            }
            for (key, count) in &bucket.counts {
                match totals.get_mut(key.as_str()) {
                    Some(total) => *total += count,
                    None => {
                        totals.insert(key.clone(), *count);
                    }
                }
            }
        }
        totals
    }

    fn evict_before(&self, cutoff: i64) -> usize {
        let mut evicted = 0;
        for slot in self.buckets.iter() {
            let mut bucket = slot.lock();
            if bucket.second != i64::MIN && bucket.second < cutoff {
                *bucket = Bucket::empty();
                evicted += 1;
            }
        }
        evicted
    }
}

// ============================================
// Aggregator
// ============================================

/// Exact sliding-window counts of verbs and objects
pub struct SlidingWindowAggregator {
    clock: Arc<dyn Clock>,
    verbs: BucketRing,
    objects: BucketRing,
    future_skew_secs: i64,
}

impl SlidingWindowAggregator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_future_skew(clock, Duration::seconds(DEFAULT_FUTURE_SKEW_SECS))
    }

    pub fn with_future_skew(clock: Arc<dyn Clock>, future_skew: Duration) -> Self {
        let future_skew_secs = future_skew.num_seconds().max(0);
        // The largest window is inclusive at both ends, hence the extra slot.
        let len = (Window::largest().duration_secs() + 1 + future_skew_secs) as usize;
        Self {
            clock,
            verbs: BucketRing::new(len),
            objects: BucketRing::new(len),
            future_skew_secs,
        }
    }

    fn ring(&self, dimension: Dimension) -> &BucketRing {
        match dimension {
            Dimension::Verb => &self.verbs,
            Dimension::Object => &self.objects,
        }
    }

    /// Count a persisted event. Returns false if its timestamp is outside
    /// the range any window can still see.
    pub fn record(&self, event: &Event) -> bool {
        self.record_parts(&event.verb, &event.object_id, event.created_at)
    }

    pub fn record_parts(&self, verb: &str, object_id: &str, created_at: DateTime<Utc>) -> bool {
        let now = self.clock.now().timestamp();
        let second = created_at.timestamp();

        if second < now - Window::largest().duration_secs() {
            tracing::debug!(verb, object_id, %created_at, "Event older than the largest window, not counted");
            return false;
        }
        if second > now + self.future_skew_secs {
            tracing::debug!(verb, object_id, %created_at, "Event too far in the future, not counted");
            return false;
        }

        let counted = self.verbs.increment(second, verb);
        if counted {
            self.objects.increment(second, object_id);
        }
        counted
    }

    /// Replay already-persisted events, e.g. to warm up after a restart
    pub fn replay<'a>(&self, events: impl IntoIterator<Item = &'a Event>) -> usize {
        events.into_iter().filter(|e| self.record(e)).count()
    }

    fn totals_at(&self, dimension: Dimension, window: Window, now: i64) -> HashMap<String, u64> {
        self.ring(dimension)
            .totals(now - window.duration_secs(), now)
    }

    /// Per-key counts for the window ending now
    pub fn counts(&self, dimension: Dimension, window: Window) -> HashMap<String, u64> {
        self.totals_at(dimension, window, self.clock.now().timestamp())
    }

    /// Count of a single key for the window ending now
    pub fn count(&self, dimension: Dimension, window: Window, key: &str) -> u64 {
        self.counts(dimension, window).get(key).copied().unwrap_or(0)
    }

    /// Highest counts first, ties by ascending key; k is capped at MAX_TOP_K
    pub fn top_k(&self, dimension: Dimension, window: Window, k: usize) -> Vec<KeyCount> {
        select_top(self.counts(dimension, window), k)
    }

    pub fn snapshot(&self, window: Window) -> AnalyticsSnapshot {
        let window_end = self.clock.now();
        let now = window_end.timestamp();

        let verbs = self.totals_at(Dimension::Verb, window, now);
        let objects = self.totals_at(Dimension::Object, window, now);
        let total_events = verbs.values().sum();

        AnalyticsSnapshot {
            window,
            window_start: window_end - window.duration(),
            window_end,
            total_events,
            top_verbs: select_top(verbs, MAX_TOP_K),
            top_objects: select_top(objects, MAX_TOP_K),
        }
    }

    /// Drop buckets no window can see any more. Returns the number evicted.
    pub fn sweep(&self) -> usize {
        let cutoff = self.clock.now().timestamp() - Window::largest().duration_secs();
        self.verbs.evict_before(cutoff) + self.objects.evict_before(cutoff)
    }

    /// Run sweep() periodically until the returned task is aborted
    pub fn spawn_sweeper(self: Arc<Self>, interval: std::time::Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = self.sweep();
                if evicted > 0 {
                    tracing::debug!(evicted, "Swept expired analytics buckets");
                }
            }
        })
    }
}

// ============================================
// Top-K selection
// ============================================

/// Heap entry ordered so that the weakest entry is the greatest
#[derive(PartialEq, Eq)]
struct Ranked {
    count: u64,
    key: String,
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .count
            .cmp(&self.count)
            .then_with(|| self.key.cmp(&other.key))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Bounded heap of size k over the totals: O(keys * log k)
fn select_top(counts: HashMap<String, u64>, k: usize) -> Vec<KeyCount> {
    let k = k.min(MAX_TOP_K);
    if k == 0 {
        return Vec::new();
    }

    let mut heap = BinaryHeap::with_capacity(k + 1);
    for (key, count) in counts {
        heap.push(Ranked { count, key });
        if heap.len() > k {
            heap.pop();
        }
    }

    heap.into_sorted_vec()
        .into_iter()
        .map(|r| KeyCount {
            key: r.key,
            count: r.count,
        })
        .collect()
}
