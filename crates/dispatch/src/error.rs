//! Dispatch error types.

use thiserror::Error;

/// Errors that can occur while delivering events.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A subscriber rejected an event.
    #[error("Subscriber {subscriber} failed: {message}")]
    Subscriber {
        subscriber: &'static str,
        message: String,
    },

    /// Failed to deserialize an event payload.
    #[error("Event deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// An error occurred reading the event store.
    #[error("Event store error: {0}")]
    Store(#[from] event_store::StoreError),
}

/// Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;
