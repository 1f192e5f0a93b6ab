//! Domain error types.

use event_store::StoreError;
use thiserror::Error;

use crate::aggregate::EntityRef;

/// Errors that can occur while loading, tracking or persisting entities.
///
/// Business rule violations are not errors at this level; each entity
/// reports them through its own error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the event or state store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The unit of work already tracks this identity under another Rust type.
    #[error("Entity {entity} is already tracked as a different type")]
    TypeMismatch { entity: EntityRef },

    /// A new entity was added with an identity the unit of work already tracks.
    #[error("Entity {entity} is already tracked")]
    AlreadyTracked { entity: EntityRef },

    /// The entity was not loaded or added through this unit of work.
    #[error("Entity {entity} is not tracked by this unit of work")]
    NotTracked { entity: EntityRef },
}

impl DomainError {
    /// Returns true if this error is an optimistic concurrency conflict.
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, DomainError::Store(e) if e.is_concurrency_conflict())
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
