//! Type-erased events handed from the unit of work to subscribers.

use chrono::{DateTime, Utc};
use event_store::{EventEnvelope, EventId, Version};

use crate::aggregate::{DomainEvent, EntityRef, PendingEvent};

/// A domain event together with the entity that raised it.
#[derive(Debug, Clone)]
pub struct RaisedEvent {
    pub event_id: EventId,
    pub entity: EntityRef,
    pub event_type: String,
    /// Stream sequence number for events of event-sourced aggregates.
    /// `None` for events raised by state-based entities.
    pub sequence: Option<Version>,
    pub payload: serde_json::Value,
    pub raised_at: DateTime<Utc>,
}

impl RaisedEvent {
    /// Serializes a buffered event.
    pub fn from_pending<E: DomainEvent>(
        entity: EntityRef,
        sequence: Option<Version>,
        pending: &PendingEvent<E>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            event_id: pending.event_id,
            entity,
            event_type: pending.event.event_type().to_string(),
            sequence,
            payload: serde_json::to_value(&pending.event)?,
            raised_at: pending.raised_at,
        })
    }

    /// Wraps an event read back from the event store.
    pub fn from_envelope(envelope: &EventEnvelope) -> Self {
        Self {
            event_id: envelope.event_id,
            entity: EntityRef::new(&envelope.aggregate_type, envelope.stream_id.clone()),
            event_type: envelope.event_type.clone(),
            sequence: Some(envelope.version),
            payload: envelope.payload.clone(),
            raised_at: envelope.recorded_at,
        }
    }

    /// Decodes the payload into a concrete event type.
    pub fn decode<E: DomainEvent>(&self) -> Result<E, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}
