use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    EntityId, EventEnvelope, NewEvent, Result, Version,
    store::{EventStore, EventStream, conflict, validate_events_for_append},
};

/// In-memory event store implementation.
///
/// Provides the same guarantees as the PostgreSQL implementation: the
/// version check and the append happen under a single write lock, so two
/// writers racing on one stream produce exactly one winner.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    inner: Arc<RwLock<MemoryLog>>,
}

#[derive(Default)]
struct MemoryLog {
    /// Every committed event, in commit order.
    events: Vec<EventEnvelope>,
    /// Positions in `events` for each stream, in sequence order.
    streams: HashMap<EntityId, Vec<usize>>,
}

impl MemoryLog {
    fn version_of(&self, stream_id: &EntityId) -> Version {
        self.streams
            .get(stream_id)
            .map(|positions| Version::initial().advance(positions.len()))
            .unwrap_or_default()
    }
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.inner.read().await.events.len()
    }

    /// Returns the number of streams with at least one event.
    pub async fn stream_count(&self) -> usize {
        self.inner.read().await.streams.len()
    }

    /// Clears all events.
    pub async fn clear(&self) {
        let mut log = self.inner.write().await;
        log.events.clear();
        log.streams.clear();
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    #[tracing::instrument(skip(self, events), fields(count = events.len()))]
    async fn append(
        &self,
        stream_id: &EntityId,
        expected_version: Version,
        events: Vec<NewEvent>,
    ) -> Result<Version> {
        validate_events_for_append(&events)?;

        let mut log = self.inner.write().await;

        let current_version = log.version_of(stream_id);
        if current_version != expected_version {
            return Err(conflict(stream_id, expected_version, current_version));
        }

        let appended = events.len();
        let mut version = current_version;
        let mut positions = Vec::with_capacity(appended);
        for event in events {
            version = version.next();
            positions.push(log.events.len());
            log.events
                .push(EventEnvelope::record(stream_id.clone(), version, event));
        }
        log.streams
            .entry(stream_id.clone())
            .or_default()
            .extend(positions);

        metrics::counter!("event_store_events_appended_total").increment(appended as u64);

        Ok(version)
    }

    async fn read_stream(
        &self,
        stream_id: &EntityId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>> {
        let log = self.inner.read().await;
        let events = log
            .streams
            .get(stream_id)
            .map(|positions| {
                positions
                    .iter()
                    .map(|&position| &log.events[position])
                    .filter(|event| event.version >= from_version)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(events)
    }

    async fn stream_version(&self, stream_id: &EntityId) -> Result<Version> {
        Ok(self.inner.read().await.version_of(stream_id))
    }

    async fn read_all(&self) -> Result<EventStream> {
        use futures_util::stream;

        let events = self.inner.read().await.events.clone();
        let stream = stream::iter(events.into_iter().map(Ok));
        Ok(Box::pin(stream))
    }
}
