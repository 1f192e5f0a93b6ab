use thiserror::Error;

use crate::{EntityId, Version};

/// Errors that can occur when interacting with a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another writer committed first: the stream (or record) is not at the
    /// version the caller expected.
    #[error(
        "Concurrency conflict on {stream_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        stream_id: EntityId,
        expected: Version,
        actual: Version,
    },

    /// The append request itself was malformed.
    #[error("Invalid append: {0}")]
    InvalidAppend(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true if this error is an optimistic concurrency conflict.
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, StoreError::ConcurrencyConflict { .. })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
