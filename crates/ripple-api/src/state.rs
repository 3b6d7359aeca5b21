// Shared application state
//
// Decision: One LiveHub and one aggregator per process, owned here and handed
// to the ingestion service; handlers reach them only through this state.

use std::sync::Arc;

use ripple_core::{Clock, EventStore, IngestionService, LiveConfig, LiveHub, SlidingWindowAggregator};
use ripple_storage::StorageBackend;

use crate::services::{FeedService, NotificationService};

#[derive(Clone)]
pub struct AppState {
    pub storage: StorageBackend,
    pub hub: LiveHub,
    pub aggregator: Arc<SlidingWindowAggregator>,
    pub ingestion: Arc<IngestionService>,
    pub feed: Arc<FeedService>,
    pub notifications: Arc<NotificationService>,
}

impl AppState {
    pub fn new(storage: StorageBackend, live: LiveConfig, clock: Arc<dyn Clock>) -> Self {
        let store: Arc<dyn EventStore> = Arc::new(storage.clone());
        let hub = LiveHub::new(live);
        let aggregator = Arc::new(SlidingWindowAggregator::new(clock.clone()));
        let ingestion = Arc::new(IngestionService::new(
            store.clone(),
            aggregator.clone(),
            hub.clone(),
            clock,
        ));

        Self {
            storage,
            hub,
            aggregator,
            ingestion,
            feed: Arc::new(FeedService::new(store.clone())),
            notifications: Arc::new(NotificationService::new(store)),
        }
    }
}
