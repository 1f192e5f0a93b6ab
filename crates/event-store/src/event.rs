use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EntityId, Result, StoreError};

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an event ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EventId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Stream version, used for optimistic concurrency control.
///
/// A stream with no events is at version 0. The first event appended to a
/// stream gets sequence number 1, and every later event increments it by 1.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the initial version (0) of an empty stream.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the first version (1) for the first event.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the version `count` events later.
    pub fn advance(&self, count: usize) -> Self {
        Self(self.0 + count as i64)
    }

    /// Returns the version `count` events earlier, never below zero.
    pub fn rewind(&self, count: usize) -> Self {
        Self((self.0 - count as i64).max(0))
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// An event that has been raised but not yet appended to a stream.
///
/// It has no sequence number: the store assigns one at append time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub event_id: EventId,
    pub event_type: String,
    pub aggregate_type: String,
    pub payload: serde_json::Value,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl NewEvent {
    /// Creates a new event builder.
    pub fn builder() -> NewEventBuilder {
        NewEventBuilder::default()
    }
}

/// Builder for constructing new events.
#[derive(Debug, Default)]
pub struct NewEventBuilder {
    event_id: Option<EventId>,
    event_type: Option<String>,
    aggregate_type: Option<String>,
    payload: Option<serde_json::Value>,
    metadata: HashMap<String, serde_json::Value>,
}

impl NewEventBuilder {
    /// Sets the event ID. If not set, a new ID will be generated.
    pub fn event_id(mut self, id: EventId) -> Self {
        self.event_id = Some(id);
        self
    }

    /// Sets the event type.
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Sets the aggregate type.
    pub fn aggregate_type(mut self, aggregate_type: impl Into<String>) -> Self {
        self.aggregate_type = Some(aggregate_type.into());
        self
    }

    /// Sets the payload from a serializable value.
    pub fn payload<T: Serialize>(mut self, payload: &T) -> Result<Self> {
        self.payload = Some(serde_json::to_value(payload)?);
        Ok(self)
    }

    /// Sets the payload from a raw JSON value.
    pub fn payload_raw(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Adds a metadata entry.
    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Builds the event, failing if a required field is missing.
    pub fn build(self) -> Result<NewEvent> {
        let missing = |field: &str| StoreError::InvalidAppend(format!("{field} is required"));

        Ok(NewEvent {
            event_id: self.event_id.unwrap_or_default(),
            event_type: self.event_type.ok_or_else(|| missing("event_type"))?,
            aggregate_type: self.aggregate_type.ok_or_else(|| missing("aggregate_type"))?,
            payload: self.payload.ok_or_else(|| missing("payload"))?,
            metadata: self.metadata,
        })
    }
}

/// A committed event as read back from a stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique identifier for this event.
    pub event_id: EventId,

    /// The stream (aggregate instance) this event belongs to.
    pub stream_id: EntityId,

    /// The type of aggregate owning the stream (e.g., "Order").
    pub aggregate_type: String,

    /// The type of the event (e.g., "OrderPlaced").
    pub event_type: String,

    /// Sequence number of this event within its stream.
    pub version: Version,

    /// When the event was appended.
    pub recorded_at: DateTime<Utc>,

    /// The event payload as JSON.
    pub payload: serde_json::Value,

    /// Additional metadata about the event.
    pub metadata: HashMap<String, serde_json::Value>,
}

impl EventEnvelope {
    /// Stamps a new event with its stream position.
    pub fn record(stream_id: EntityId, version: Version, event: NewEvent) -> Self {
        Self {
            event_id: event.event_id,
            stream_id,
            aggregate_type: event.aggregate_type,
            event_type: event.event_type,
            version,
            recorded_at: Utc::now(),
            payload: event.payload,
            metadata: event.metadata,
        }
    }
}
