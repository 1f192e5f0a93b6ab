use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::EntityId;
use event_store::{StateStore, Version};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;

use crate::{
    DomainError, Result,
    aggregate::{Entity, EntityRef},
    event::RaisedEvent,
    unit_of_work::{Enlisted, Tracked, UnitOfWork},
};

/// Repository for entities stored as materialized records.
///
/// The entity's serialized form is the record. Its event buffer must be
/// excluded from serialization (`#[serde(skip)]`); events raised by state
/// entities are dispatched exactly like aggregate events but never stored.
pub struct StateRepository<E> {
    store: Arc<dyn StateStore>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for StateRepository<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _entity: PhantomData,
        }
    }
}

impl<E> StateRepository<E>
where
    E: Entity + Serialize + DeserializeOwned,
{
    /// Creates a new repository over a state store.
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    /// Loads an entity into the unit of work, or returns None if no record
    /// exists.
    #[tracing::instrument(skip(self, uow), fields(entity_type = E::entity_type()))]
    pub async fn get_by_id(&self, uow: &UnitOfWork, id: &EntityId) -> Result<Option<Tracked<E>>> {
        let entity_ref = EntityRef::new(E::entity_type(), id.clone());
        if let Some(tracked) = uow.find::<E>(&entity_ref).await? {
            return Ok(Some(tracked));
        }

        let Some(record) = self.store.load(E::entity_type(), id).await? else {
            return Ok(None);
        };
        let entity: E = serde_json::from_value(record.state)?;

        let tracked = Tracked::new(entity);
        uow.enlist(self.entry(entity_ref, tracked.clone(), record.version))
            .await;
        Ok(Some(tracked))
    }

    /// Tracks a newly created entity. Its record is inserted at commit.
    pub async fn add(&self, uow: &UnitOfWork, entity: E) -> Result<Tracked<E>> {
        let entity_ref = entity.entity_ref();
        let tracked = Tracked::new(entity);
        if !uow
            .enlist(self.entry(entity_ref.clone(), tracked.clone(), Version::initial()))
            .await
        {
            return Err(DomainError::AlreadyTracked { entity: entity_ref });
        }
        Ok(tracked)
    }

    /// Writes the entity's current state now, checking the record version
    /// it was loaded at.
    #[tracing::instrument(skip(self, uow, entity), fields(entity_type = E::entity_type()))]
    pub async fn save(&self, uow: &UnitOfWork, entity: &Tracked<E>) -> Result<Version> {
        let entry = self.tracked_entry(uow, entity).await?;
        let entry = Self::downcast(&entry)?;
        entry.write().await
    }

    /// Marks the entity for deletion at commit.
    ///
    /// Events it raised before deletion are still dispatched.
    pub async fn delete(&self, uow: &UnitOfWork, entity: &Tracked<E>) -> Result<()> {
        let entry = self.tracked_entry(uow, entity).await?;
        Self::downcast(&entry)?.deleted.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn tracked_entry(
        &self,
        uow: &UnitOfWork,
        entity: &Tracked<E>,
    ) -> Result<Arc<dyn Enlisted>> {
        let entity_ref = entity.read().await.entity_ref();
        uow.entry(&entity_ref)
            .await
            .ok_or(DomainError::NotTracked { entity: entity_ref })
    }

    fn downcast(entry: &Arc<dyn Enlisted>) -> Result<&StateEntry<E>> {
        entry
            .as_any()
            .downcast_ref::<StateEntry<E>>()
            .ok_or_else(|| DomainError::TypeMismatch {
                entity: entry.entity_ref().clone(),
            })
    }

    fn entry(&self, entity: EntityRef, tracked: Tracked<E>, version: Version) -> Arc<dyn Enlisted> {
        Arc::new(StateEntry {
            entity,
            tracked,
            store: Arc::clone(&self.store),
            version: Mutex::new(version),
            deleted: AtomicBool::new(false),
        })
    }
}

struct StateEntry<E> {
    entity: EntityRef,
    tracked: Tracked<E>,
    store: Arc<dyn StateStore>,
    /// Record version as last read or written by this unit of work.
    version: Mutex<Version>,
    deleted: AtomicBool,
}

impl<E> StateEntry<E>
where
    E: Entity + Serialize + DeserializeOwned,
{
    async fn write(&self) -> Result<Version> {
        let mut version = self.version.lock().await;
        let state = serde_json::to_value(&*self.tracked.read().await)?;
        *version = self
            .store
            .save(E::entity_type(), &self.entity.id, *version, state)
            .await?;
        Ok(*version)
    }

    async fn remove(&self) -> Result<()> {
        let mut version = self.version.lock().await;
        // Never stored, nothing to remove
        if *version == Version::initial() {
            return Ok(());
        }
        self.store
            .delete(E::entity_type(), &self.entity.id, *version)
            .await?;
        *version = Version::initial();
        Ok(())
    }
}

#[async_trait]
impl<E> Enlisted for StateEntry<E>
where
    E: Entity + Serialize + DeserializeOwned,
{
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
        if self.deleted.load(Ordering::SeqCst) {
            self.remove().await
        } else {
            self.write().await.map(|_| ())
        }
    }

    async fn raised_events(&self) -> Result<Vec<RaisedEvent>> {
        let entity = self.tracked.read().await;
        let raised = entity
            .uncommitted_events()
            .iter()
            .map(|pending| RaisedEvent::from_pending(self.entity.clone(), None, pending))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(raised)
    }

    async fn clear_events(&self) {
        self.tracked.write().await.pending_events_mut().take();
    }
}
