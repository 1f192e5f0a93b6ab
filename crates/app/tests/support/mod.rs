//! Store fakes and a recording subscriber shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use app::Stores;
use async_trait::async_trait;
use dispatch::{EventDispatcher, EventSubscriber};
use domain::RaisedEvent;
use event_store::{
    EntityId, EventEnvelope, EventStore, EventStream, InMemoryEventStore, InMemoryStateStore,
    NewEvent, StateRecord, StateStore, StoreError, Version,
};
use tokio::sync::Mutex;

fn outage() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

/// In-memory event store with switchable faults.
#[derive(Default)]
pub struct FlakyEventStore {
    inner: InMemoryEventStore,
    appends: AtomicUsize,
    offline: AtomicBool,
    /// Yield after every stream read so concurrent requests interleave
    /// between load and commit.
    yield_after_read: AtomicBool,
    rejected_streams: Mutex<HashSet<EntityId>>,
}

impl FlakyEventStore {
    pub fn append_calls(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn interleave_reads(&self) {
        self.yield_after_read.store(true, Ordering::SeqCst);
    }

    /// Every append to this stream fails with a concurrency conflict.
    pub async fn reject_stream(&self, stream_id: &str) {
        self.rejected_streams
            .lock()
            .await
            .insert(EntityId::from(stream_id));
    }

    pub async fn event_count(&self) -> usize {
        self.inner.event_count().await
    }
}

#[async_trait]
impl EventStore for FlakyEventStore {
    async fn append(
        &self,
        stream_id: &EntityId,
        expected_version: Version,
        events: Vec<NewEvent>,
    ) -> event_store::Result<Version> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(outage());
        }
        if self.rejected_streams.lock().await.contains(stream_id) {
            return Err(StoreError::ConcurrencyConflict {
                stream_id: stream_id.clone(),
                expected: expected_version,
                actual: expected_version.next(),
            });
        }
        self.inner.append(stream_id, expected_version, events).await
    }

    async fn read_stream(
        &self,
        stream_id: &EntityId,
        from_version: Version,
    ) -> event_store::Result<Vec<EventEnvelope>> {
        let events = self.inner.read_stream(stream_id, from_version).await?;
        if self.yield_after_read.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        Ok(events)
    }

    async fn stream_version(&self, stream_id: &EntityId) -> event_store::Result<Version> {
        self.inner.stream_version(stream_id).await
    }

    async fn read_all(&self) -> event_store::Result<EventStream> {
        self.inner.read_all().await
    }
}

/// In-memory record store that can be taken offline for writes.
#[derive(Default)]
pub struct FlakyStateStore {
    inner: InMemoryStateStore,
    saves: AtomicUsize,
    offline: AtomicBool,
}

impl FlakyStateStore {
    pub fn save_calls(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl StateStore for FlakyStateStore {
    async fn load(&self, entity_type: &str, id: &EntityId) -> event_store::Result<Option<StateRecord>> {
        self.inner.load(entity_type, id).await
    }

    async fn save(
        &self,
        entity_type: &str,
        id: &EntityId,
        expected_version: Version,
        state: serde_json::Value,
    ) -> event_store::Result<Version> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(outage());
        }
        self.inner.save(entity_type, id, expected_version, state).await
    }

    async fn delete(
        &self,
        entity_type: &str,
        id: &EntityId,
        expected_version: Version,
    ) -> event_store::Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(outage());
        }
        self.inner.delete(entity_type, id, expected_version).await
    }
}

/// Records every delivered event as `"Type/id:EventType"`.
#[derive(Default)]
pub struct Recorder {
    seen: Mutex<Vec<String>>,
}

impl Recorder {
    pub async fn seen(&self) -> Vec<String> {
        self.seen.lock().await.clone()
    }
}

#[async_trait]
impl EventSubscriber for Recorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    async fn handle(&self, event: &RaisedEvent) -> dispatch::Result<()> {
        self.seen
            .lock()
            .await
            .push(format!("{}:{}", event.entity, event.event_type));
        Ok(())
    }
}

pub struct Harness {
    pub events: Arc<FlakyEventStore>,
    pub records: Arc<FlakyStateStore>,
    pub recorder: Arc<Recorder>,
    pub mediator: mediator::Mediator,
}

/// A mediator over flaky stores, with a recorder on every event type.
pub fn harness() -> Harness {
    harness_with(|builder| builder)
}

/// Like [`harness`], with extra subscribers registered before the recorder.
pub fn harness_with(
    configure: impl FnOnce(dispatch::EventDispatcherBuilder) -> dispatch::EventDispatcherBuilder,
) -> Harness {
    let events = Arc::new(FlakyEventStore::default());
    let records = Arc::new(FlakyStateStore::default());
    let recorder = Arc::new(Recorder::default());
    let dispatcher = configure(EventDispatcher::builder())
        .subscribe_all(recorder.clone())
        .build();

    let stores = Stores::new(events.clone(), records.clone());
    let mediator = app::build_mediator(&stores, Arc::new(dispatcher)).unwrap();

    Harness {
        events,
        records,
        recorder,
        mediator,
    }
}
