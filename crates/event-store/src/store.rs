use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{EntityId, EventEnvelope, NewEvent, Result, StoreError, Version};

/// A stream of committed events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventEnvelope>> + Send>>;

/// Core trait for event store implementations.
///
/// An event store keeps one append-only stream per aggregate instance.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends a batch of events to a stream.
    ///
    /// The append is atomic: either every event is stored, numbered
    /// `expected_version + 1 ..= expected_version + events.len()`, or none
    /// is. Fails with `ConcurrencyConflict` if the stream is not at
    /// `expected_version` when the append happens.
    ///
    /// Returns the new version of the stream.
    async fn append(
        &self,
        stream_id: &EntityId,
        expected_version: Version,
        events: Vec<NewEvent>,
    ) -> Result<Version>;

    /// Reads a stream in sequence order, starting at `from_version`
    /// (inclusive).
    ///
    /// A stream that does not exist reads as empty.
    async fn read_stream(
        &self,
        stream_id: &EntityId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>>;

    /// Returns the current version of a stream (0 if it has no events).
    async fn stream_version(&self, stream_id: &EntityId) -> Result<Version>;

    /// Streams every committed event in commit order.
    async fn read_all(&self) -> Result<EventStream>;
}

/// Extension trait providing convenience methods for event stores.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Appends a single event to a stream.
    async fn append_one(
        &self,
        stream_id: &EntityId,
        expected_version: Version,
        event: NewEvent,
    ) -> Result<Version> {
        self.append(stream_id, expected_version, vec![event]).await
    }

    /// Reads a whole stream from the beginning.
    async fn read_full_stream(&self, stream_id: &EntityId) -> Result<Vec<EventEnvelope>> {
        self.read_stream(stream_id, Version::initial()).await
    }

    /// Checks if a stream has any events.
    async fn stream_exists(&self, stream_id: &EntityId) -> Result<bool> {
        Ok(self.stream_version(stream_id).await? > Version::initial())
    }
}

// Blanket implementation for all EventStore implementations
impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Validates an append request before touching storage.
pub fn validate_events_for_append(events: &[NewEvent]) -> Result<()> {
    let Some(first) = events.first() else {
        return Err(StoreError::InvalidAppend(
            "Cannot append empty event list".to_string(),
        ));
    };

    // One batch belongs to one aggregate type
    if events
        .iter()
        .any(|event| event.aggregate_type != first.aggregate_type)
    {
        return Err(StoreError::InvalidAppend(
            "All events must have the same aggregate type".to_string(),
        ));
    }

    if events.iter().any(|event| event.event_type.is_empty()) {
        return Err(StoreError::InvalidAppend(
            "Event type must not be empty".to_string(),
        ));
    }

    Ok(())
}

/// Records a concurrency conflict and builds the matching error.
pub(crate) fn conflict(stream_id: &EntityId, expected: Version, actual: Version) -> StoreError {
    metrics::counter!("event_store_concurrency_conflicts_total").increment(1);
    tracing::debug!(%stream_id, %expected, %actual, "optimistic concurrency conflict");
    StoreError::ConcurrencyConflict {
        stream_id: stream_id.clone(),
        expected,
        actual,
    }
}
