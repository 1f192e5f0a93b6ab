//! Core entity, aggregate and domain event traits.

use chrono::{DateTime, Utc};
use common::EntityId;
use event_store::{EventId, Version};
use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Returns the event type name.
    ///
    /// This is stored alongside the payload and used to route the event to
    /// subscribers.
    fn event_type(&self) -> &'static str;
}

/// Identity of an entity: its type name plus its identifier.
///
/// Two handles to entities are the same entity exactly when their refs are
/// equal. State is never compared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityRef {
    pub entity_type: String,
    pub id: EntityId,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, id: EntityId) -> Self {
        Self {
            entity_type: entity_type.into(),
            id,
        }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.entity_type, self.id)
    }
}

/// A raised event waiting in an entity's buffer.
#[derive(Debug, Clone)]
pub struct PendingEvent<E> {
    /// Assigned at raise time and kept when the event is stored.
    pub event_id: EventId,
    pub raised_at: DateTime<Utc>,
    pub event: E,
}

/// Buffer of uncommitted domain events owned by an entity.
///
/// Events stay here until the unit of work drains them after a successful
/// commit. `saved` counts the leading events already appended to the store,
/// so saving twice in one unit of work never appends the same event twice.
#[derive(Debug, Clone)]
pub struct PendingEvents<E> {
    events: Vec<PendingEvent<E>>,
    saved: usize,
}

impl<E> Default for PendingEvents<E> {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            saved: 0,
        }
    }
}

impl<E> PendingEvents<E> {
    /// Appends a newly raised event.
    pub fn push(&mut self, event: E) {
        self.events.push(PendingEvent {
            event_id: EventId::new(),
            raised_at: Utc::now(),
            event,
        });
    }

    /// All uncommitted events, in raise order.
    pub fn entries(&self) -> &[PendingEvent<E>] {
        &self.events
    }

    /// Uncommitted events that have not been written to a store yet.
    pub fn unsaved(&self) -> &[PendingEvent<E>] {
        &self.events[self.saved..]
    }

    /// Marks every buffered event as written.
    pub fn mark_saved(&mut self) {
        self.saved = self.events.len();
    }

    /// Empties the buffer, returning its events.
    pub fn take(&mut self) -> Vec<PendingEvent<E>> {
        self.saved = 0;
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// A domain object with identity.
///
/// Any entity may raise domain events; they are collected and dispatched
/// by the unit of work regardless of how the entity is persisted.
pub trait Entity: Send + Sync + Sized + 'static {
    /// The type of events this entity raises.
    type Event: DomainEvent;

    /// Returns the entity type name.
    ///
    /// Used as the aggregate type on stored events and as the record type in
    /// the state store.
    fn entity_type() -> &'static str;

    /// Returns the entity's unique identifier.
    fn id(&self) -> &EntityId;

    fn pending_events(&self) -> &PendingEvents<Self::Event>;

    fn pending_events_mut(&mut self) -> &mut PendingEvents<Self::Event>;

    /// Returns this entity's identity.
    fn entity_ref(&self) -> EntityRef {
        EntityRef::new(Self::entity_type(), self.id().clone())
    }

    /// Returns the events raised since the last drain, in raise order.
    fn uncommitted_events(&self) -> &[PendingEvent<Self::Event>] {
        self.pending_events().entries()
    }
}

/// Trait for event-sourced aggregate roots.
///
/// An aggregate's state is a pure function of the events applied to it. All
/// mutation goes through methods that call [`AggregateRoot::raise_event`],
/// which applies the event immediately so in-memory state always reflects
/// the raised events.
pub trait AggregateRoot: Entity {
    /// Creates an instance with no events applied.
    fn blank(id: EntityId) -> Self;

    /// Returns the number of events applied to reach the current state.
    fn version(&self) -> Version;

    fn set_version(&mut self, version: Version);

    /// Applies an event to the aggregate, updating its state.
    ///
    /// This method must be pure and deterministic:
    /// - Given the same state and event, it must always produce the same new state
    /// - It must not have side effects
    /// - It must not fail (events represent facts that have happened)
    fn apply(&mut self, event: &Self::Event);

    /// Applies a new event and buffers it for commit.
    fn raise_event(&mut self, event: Self::Event) {
        self.apply(&event);
        let version = self.version().next();
        self.set_version(version);
        self.pending_events_mut().push(event);
    }

    /// Rebuilds an aggregate by replaying its history in stream order.
    ///
    /// Replayed events are not buffered: replay never leads to dispatch.
    fn load_from_history(id: EntityId, history: impl IntoIterator<Item = Self::Event>) -> Self {
        let mut aggregate = Self::blank(id);
        let mut version = Version::initial();
        for event in history {
            aggregate.apply(&event);
            version = version.next();
        }
        aggregate.set_version(version);
        aggregate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum CounterEvent {
        Incremented { by: i32 },
        Reset,
    }

    impl DomainEvent for CounterEvent {
        fn event_type(&self) -> &'static str {
            match self {
                CounterEvent::Incremented { .. } => "Incremented",
                CounterEvent::Reset => "Reset",
            }
        }
    }

    #[derive(Debug)]
    struct Counter {
        id: EntityId,
        value: i32,
        version: Version,
        pending: PendingEvents<CounterEvent>,
    }

    impl Entity for Counter {
        type Event = CounterEvent;

        fn entity_type() -> &'static str {
            "Counter"
        }

        fn id(&self) -> &EntityId {
            &self.id
        }

        fn pending_events(&self) -> &PendingEvents<CounterEvent> {
            &self.pending
        }

        fn pending_events_mut(&mut self) -> &mut PendingEvents<CounterEvent> {
            &mut self.pending
        }
    }

    impl AggregateRoot for Counter {
        fn blank(id: EntityId) -> Self {
            Self {
                id,
                value: 0,
                version: Version::initial(),
                pending: PendingEvents::default(),
            }
        }

        fn version(&self) -> Version {
            self.version
        }

        fn set_version(&mut self, version: Version) {
            self.version = version;
        }

        fn apply(&mut self, event: &CounterEvent) {
            match event {
                CounterEvent::Incremented { by } => self.value += by,
                CounterEvent::Reset => self.value = 0,
            }
        }
    }

    #[test]
    fn raise_event_applies_and_buffers() {
        let mut counter = Counter::blank(EntityId::from("c-1"));
        counter.raise_event(CounterEvent::Incremented { by: 2 });
        counter.raise_event(CounterEvent::Incremented { by: 3 });

        assert_eq!(counter.value, 5);
        assert_eq!(counter.version(), Version::new(2));
        let types: Vec<_> = counter
            .uncommitted_events()
            .iter()
            .map(|p| p.event.event_type())
            .collect();
        assert_eq!(types, vec!["Incremented", "Incremented"]);
    }

    #[test]
    fn load_from_history_does_not_buffer() {
        let history = vec![
            CounterEvent::Incremented { by: 4 },
            CounterEvent::Reset,
            CounterEvent::Incremented { by: 1 },
        ];
        let counter = Counter::load_from_history(EntityId::from("c-1"), history);

        assert_eq!(counter.value, 1);
        assert_eq!(counter.version(), Version::new(3));
        assert!(counter.uncommitted_events().is_empty());
    }

    #[test]
    fn pending_events_track_saved_prefix() {
        let mut pending = PendingEvents::default();
        pending.push(CounterEvent::Reset);
        pending.mark_saved();
        pending.push(CounterEvent::Incremented { by: 1 });

        assert_eq!(pending.len(), 2);
        assert_eq!(pending.unsaved().len(), 1);

        let drained = pending.take();
        assert_eq!(drained.len(), 2);
        assert!(pending.is_empty());
        assert!(pending.unsaved().is_empty());
    }

    #[test]
    fn entity_ref_is_identity() {
        let a = Counter::blank(EntityId::from("c-1"));
        let mut b = Counter::blank(EntityId::from("c-1"));
        b.raise_event(CounterEvent::Incremented { by: 9 });

        assert_eq!(a.entity_ref(), b.entity_ref());
        assert_eq!(a.entity_ref().to_string(), "Counter/c-1");
        assert_ne!(
            a.entity_ref(),
            EntityRef::new("Other", EntityId::from("c-1"))
        );
    }
}
