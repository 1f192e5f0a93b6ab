use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use common::EntityId;
use event_store::{EventStore, EventStoreExt, NewEvent, StoreError, Version};

use crate::{
    DomainError, Result,
    aggregate::{AggregateRoot, DomainEvent, EntityRef},
    event::RaisedEvent,
    unit_of_work::{Enlisted, Tracked, UnitOfWork},
};

/// Repository for event-sourced aggregates.
pub struct EventSourcedRepository<A> {
    store: Arc<dyn EventStore>,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A> Clone for EventSourcedRepository<A> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _aggregate: PhantomData,
        }
    }
}

impl<A: AggregateRoot> EventSourcedRepository<A> {
    /// Creates a new repository over an event store.
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            store,
            _aggregate: PhantomData,
        }
    }

    /// Loads an aggregate into the unit of work.
    ///
    /// Returns the already-tracked instance if this unit of work loaded it
    /// before, and None if the stream has no events.
    #[tracing::instrument(skip(self, uow), fields(aggregate_type = A::entity_type()))]
    pub async fn get_by_id(&self, uow: &UnitOfWork, id: &EntityId) -> Result<Option<Tracked<A>>> {
        let entity_ref = EntityRef::new(A::entity_type(), id.clone());
        if let Some(tracked) = uow.find::<A>(&entity_ref).await? {
            return Ok(Some(tracked));
        }

        let Some(aggregate) = self.load(id).await? else {
            return Ok(None);
        };

        let tracked = Tracked::new(aggregate);
        uow.enlist(self.entry(entity_ref, tracked.clone())).await;
        Ok(Some(tracked))
    }

    /// Tracks a newly created aggregate.
    ///
    /// Its events are appended when the unit of work commits.
    pub async fn add(&self, uow: &UnitOfWork, aggregate: A) -> Result<Tracked<A>> {
        let entity_ref = aggregate.entity_ref();
        let tracked = Tracked::new(aggregate);
        if !uow.enlist(self.entry(entity_ref.clone(), tracked.clone())).await {
            return Err(DomainError::AlreadyTracked { entity: entity_ref });
        }
        Ok(tracked)
    }

    /// Appends the aggregate's unsaved events and enlists it.
    ///
    /// The expected stream version is the aggregate version minus the number
    /// of unsaved events. Saving does not clear the buffer: the events stay
    /// available to the unit of work's drain.
    #[tracing::instrument(skip(self, uow, aggregate), fields(aggregate_type = A::entity_type()))]
    pub async fn save(&self, uow: &UnitOfWork, aggregate: &Tracked<A>) -> Result<Version> {
        let (entity_ref, version) = {
            let mut guard = aggregate.write().await;
            let version = self.append_unsaved(&mut guard).await?;
            (guard.entity_ref(), version)
        };
        uow.enlist(self.entry(entity_ref, aggregate.clone())).await;
        Ok(version)
    }

    /// Rebuilds an aggregate from its stream without tracking it.
    pub async fn load(&self, id: &EntityId) -> Result<Option<A>> {
        let envelopes = self.store.read_full_stream(id).await?;
        if envelopes.is_empty() {
            return Ok(None);
        }

        let history = envelopes
            .into_iter()
            .map(|envelope| serde_json::from_value::<A::Event>(envelope.payload))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        tracing::debug!(%id, events = history.len(), "replaying aggregate");
        Ok(Some(A::load_from_history(id.clone(), history)))
    }

    async fn append_unsaved(&self, aggregate: &mut A) -> Result<Version> {
        let unsaved = aggregate.pending_events().unsaved();
        if unsaved.is_empty() {
            return Ok(aggregate.version());
        }

        let expected_version = aggregate.version().rewind(unsaved.len());
        let events = unsaved
            .iter()
            .map(|pending| {
                NewEvent::builder()
                    .event_id(pending.event_id)
                    .aggregate_type(A::entity_type())
                    .event_type(pending.event.event_type())
                    .payload(&pending.event)?
                    .build()
            })
            .collect::<std::result::Result<Vec<_>, StoreError>>()?;

        let version = self
            .store
            .append(aggregate.id(), expected_version, events)
            .await?;
        aggregate.pending_events_mut().mark_saved();
        Ok(version)
    }

    fn entry(&self, entity: EntityRef, tracked: Tracked<A>) -> Arc<dyn Enlisted> {
        Arc::new(AggregateEntry {
            entity,
            tracked,
            repository: self.clone(),
        })
    }
}

struct AggregateEntry<A> {
    entity: EntityRef,
    tracked: Tracked<A>,
    repository: EventSourcedRepository<A>,
}

#[async_trait]
impl<A: AggregateRoot> Enlisted for AggregateEntry<A> {
    fn entity_ref(&self) -> &EntityRef {
        &self.entity
    }

    fn tracked(&self) -> &(dyn Any + Send + Sync) {
        &self.tracked
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }

    async fn persist(&self) -> Result<()> {
        let mut aggregate = self.tracked.write().await;
        self.repository.append_unsaved(&mut aggregate).await?;
        Ok(())
    }

    async fn raised_events(&self) -> Result<Vec<RaisedEvent>> {
        let aggregate = self.tracked.read().await;
        let pending = aggregate.uncommitted_events();
        // The buffered events are the last `len` events applied
        let base = aggregate.version().rewind(pending.len());

        let raised = pending
            .iter()
            .enumerate()
            .map(|(index, event)| {
                RaisedEvent::from_pending(self.entity.clone(), Some(base.advance(index + 1)), event)
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(raised)
    }

    async fn clear_events(&self) {
        self.tracked.write().await.pending_events_mut().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Entity;
    use crate::order::{Money, Order, OrderItem, OrderState};
    use event_store::InMemoryEventStore;

    fn setup() -> (Arc<InMemoryEventStore>, EventSourcedRepository<Order>) {
        let store = Arc::new(InMemoryEventStore::new());
        let repository = EventSourcedRepository::new(store.clone() as Arc<dyn EventStore>);
        (store, repository)
    }

    fn espresso() -> OrderItem {
        OrderItem::new("SKU-1", "Espresso", 2, Money::from_cents(300))
    }

    #[tokio::test]
    async fn missing_stream_is_not_found() {
        let (_, repository) = setup();
        let uow = UnitOfWork::new();

        let loaded = repository
            .get_by_id(&uow, &EntityId::from("order-404"))
            .await
            .unwrap();
        assert!(loaded.is_none());
        assert!(uow.is_empty().await);
    }

    #[tokio::test]
    async fn save_appends_with_expected_version() {
        let (store, repository) = setup();
        let uow = UnitOfWork::new();
        let id = EntityId::from("order-1");

        let order = repository
            .add(&uow, Order::place(id.clone(), EntityId::from("customer-1")).unwrap())
            .await
            .unwrap();
        order.write().await.add_item(espresso()).unwrap();

        let version = repository.save(&uow, &order).await.unwrap();
        assert_eq!(version, Version::new(2));
        assert_eq!(store.stream_version(&id).await.unwrap(), Version::new(2));

        // The buffer survives the save for the drain
        assert_eq!(order.read().await.uncommitted_events().len(), 2);

        // Nothing new to persist: the commit is a no-op
        uow.commit().await.unwrap();
        assert_eq!(store.event_count().await, 2);
    }

    #[tokio::test]
    async fn save_without_new_events_is_noop() {
        let (store, repository) = setup();
        let uow = UnitOfWork::new();
        let order = repository
            .add(
                &uow,
                Order::place(EntityId::from("order-1"), EntityId::from("customer-1")).unwrap(),
            )
            .await
            .unwrap();
        uow.commit().await.unwrap();
        uow.collect_and_clear_events().await.unwrap();

        let version = repository.save(&uow, &order).await.unwrap();
        assert_eq!(version, Version::first());
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn get_by_id_replays_history() {
        let (_, repository) = setup();
        let id = EntityId::from("order-1");

        let first = UnitOfWork::new();
        let order = repository
            .add(&first, Order::place(id.clone(), EntityId::from("customer-1")).unwrap())
            .await
            .unwrap();
        {
            let mut order = order.write().await;
            order.add_item(espresso()).unwrap();
            order.mark_ready().unwrap();
        }
        first.commit().await.unwrap();

        let second = UnitOfWork::new();
        let loaded = repository.get_by_id(&second, &id).await.unwrap().unwrap();
        let loaded = loaded.read().await;
        assert_eq!(loaded.version(), Version::new(3));
        assert_eq!(loaded.state(), OrderState::Ready);
        assert_eq!(loaded.total_amount(), Money::from_cents(600));
        assert!(loaded.uncommitted_events().is_empty());
    }

    #[tokio::test]
    async fn get_by_id_returns_tracked_instance() {
        let (_, repository) = setup();
        let id = EntityId::from("order-1");

        let seed = UnitOfWork::new();
        repository
            .add(&seed, Order::place(id.clone(), EntityId::from("customer-1")).unwrap())
            .await
            .unwrap();
        seed.commit().await.unwrap();

        let uow = UnitOfWork::new();
        let a = repository.get_by_id(&uow, &id).await.unwrap().unwrap();
        let b = repository.get_by_id(&uow, &id).await.unwrap().unwrap();
        assert!(a.ptr_eq(&b));
        assert_eq!(uow.len().await, 1);
    }

    #[tokio::test]
    async fn adding_tracked_identity_fails() {
        let (_, repository) = setup();
        let uow = UnitOfWork::new();
        let id = EntityId::from("order-1");

        repository
            .add(&uow, Order::place(id.clone(), EntityId::from("customer-1")).unwrap())
            .await
            .unwrap();
        let again = repository
            .add(&uow, Order::place(id, EntityId::from("customer-2")).unwrap())
            .await;
        assert!(matches!(again, Err(DomainError::AlreadyTracked { .. })));
    }

    #[tokio::test]
    async fn stale_aggregate_conflicts() {
        let (_, repository) = setup();
        let id = EntityId::from("order-1");

        let seed = UnitOfWork::new();
        let order = repository
            .add(&seed, Order::place(id.clone(), EntityId::from("customer-1")).unwrap())
            .await
            .unwrap();
        order.write().await.add_item(espresso()).unwrap();
        seed.commit().await.unwrap();

        let first = UnitOfWork::new();
        let second = UnitOfWork::new();
        let a = repository.get_by_id(&first, &id).await.unwrap().unwrap();
        let b = repository.get_by_id(&second, &id).await.unwrap().unwrap();

        a.write().await.mark_ready().unwrap();
        b.write().await.cancel("changed my mind").unwrap();

        first.commit().await.unwrap();
        let err = second.commit().await.unwrap_err();
        assert!(err.is_concurrency_conflict());

        let reloaded = repository.load(&id).await.unwrap().unwrap();
        assert_eq!(reloaded.state(), OrderState::Ready);
        assert_eq!(reloaded.version(), Version::new(3));
    }
}
