//! Request-scoped tracking of loaded and created entities.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{
    DomainError, Result,
    aggregate::{Entity, EntityRef},
    event::RaisedEvent,
};

/// Shared handle to an entity tracked by a unit of work.
///
/// Handlers mutate the entity through this handle; the unit of work persists
/// and drains the very same instance at commit.
pub struct Tracked<E> {
    inner: Arc<RwLock<E>>,
}

impl<E> Clone for Tracked<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Entity> Tracked<E> {
    pub(crate) fn new(entity: E) -> Self {
        Self {
            inner: Arc::new(RwLock::new(entity)),
        }
    }

    /// Locks the entity for reading.
    pub async fn read(&self) -> RwLockReadGuard<'_, E> {
        self.inner.read().await
    }

    /// Locks the entity for mutation.
    pub async fn write(&self) -> RwLockWriteGuard<'_, E> {
        self.inner.write().await
    }

    /// Returns true if both handles point at the same instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// An entity enlisted in a unit of work, together with the means to
/// persist it.
///
/// Repositories create one entry per tracked entity. The unit of work only
/// sees this trait, so it is agnostic to the persistence style.
#[async_trait]
pub trait Enlisted: Send + Sync {
    fn entity_ref(&self) -> &EntityRef;

    /// The `Tracked<E>` handle, for identity-map lookups.
    fn tracked(&self) -> &(dyn Any + Send + Sync);

    /// The entry itself, for repositories that need their own entry back.
    fn as_any(&self) -> &(dyn Any + Send + Sync);

    /// Writes the entity's final state to its store.
    async fn persist(&self) -> Result<()>;

    /// Serializes the entity's uncommitted events, in raise order, without
    /// removing them.
    async fn raised_events(&self) -> Result<Vec<RaisedEvent>>;

    /// Empties the entity's event buffer.
    async fn clear_events(&self);
}

/// Collects every entity loaded or created while handling one request.
///
/// Entries are kept in enlistment order. Enlisting an identity that is
/// already tracked is a no-op, so repositories act as an identity map on
/// top of it: loading the same entity twice returns the same instance.
#[derive(Default)]
pub struct UnitOfWork {
    entries: RwLock<Vec<Arc<dyn Enlisted>>>,
}

impl UnitOfWork {
    /// Creates an empty unit of work.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entry. Returns false if its identity is already tracked.
    pub async fn enlist(&self, entry: Arc<dyn Enlisted>) -> bool {
        let mut entries = self.entries.write().await;
        if entries
            .iter()
            .any(|existing| existing.entity_ref() == entry.entity_ref())
        {
            return false;
        }
        tracing::trace!(entity = %entry.entity_ref(), "enlisted");
        entries.push(entry);
        true
    }

    /// Returns the tracked instance for an identity, if any.
    pub async fn find<E: Entity>(&self, entity_ref: &EntityRef) -> Result<Option<Tracked<E>>> {
        let Some(entry) = self.entry(entity_ref).await else {
            return Ok(None);
        };
        entry
            .tracked()
            .downcast_ref::<Tracked<E>>()
            .cloned()
            .map(Some)
            .ok_or_else(|| DomainError::TypeMismatch {
                entity: entity_ref.clone(),
            })
    }

    /// Returns the entry for an identity, if any.
    pub async fn entry(&self, entity_ref: &EntityRef) -> Option<Arc<dyn Enlisted>> {
        self.entries
            .read()
            .await
            .iter()
            .find(|entry| entry.entity_ref() == entity_ref)
            .cloned()
    }

    /// Returns the identities of all enlisted entities, first enlisted first.
    pub async fn get_enlisted(&self) -> Vec<EntityRef> {
        self.entries
            .read()
            .await
            .iter()
            .map(|entry| entry.entity_ref().clone())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Persists every enlisted entity, in enlistment order.
    ///
    /// Stops at the first failure. Entities persisted before the failure
    /// stay persisted: there is no transaction spanning several streams.
    #[tracing::instrument(skip(self))]
    pub async fn commit(&self) -> Result<()> {
        let entries = self.snapshot().await;
        for entry in &entries {
            if let Err(e) = entry.persist().await {
                tracing::debug!(entity = %entry.entity_ref(), error = %e, "persist failed");
                return Err(e);
            }
        }
        tracing::debug!(entities = entries.len(), "unit of work persisted");
        Ok(())
    }

    /// Drains every enlisted entity's uncommitted events.
    ///
    /// Events come out in enlistment order, then in raise order within each
    /// entity. Clearing the buffers happens here and nowhere else, and only
    /// once every event has been serialized: on error no buffer is touched.
    pub async fn collect_and_clear_events(&self) -> Result<Vec<RaisedEvent>> {
        let entries = self.snapshot().await;
        let mut events = Vec::new();
        for entry in &entries {
            events.extend(entry.raised_events().await?);
        }
        for entry in &entries {
            entry.clear_events().await;
        }
        Ok(events)
    }

    async fn snapshot(&self) -> Vec<Arc<dyn Enlisted>> {
        self.entries.read().await.clone()
    }
}
