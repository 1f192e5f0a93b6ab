//! Mediator error types.

use domain::DomainError;
use event_store::StoreError;
use thiserror::Error;

/// Errors raised by the mediator, its pipeline or a handler.
///
/// Business outcomes never travel here: they are `OperationResult`
/// failures. An `Err` is either a wiring mistake or an infrastructure fault.
#[derive(Debug, Error)]
pub enum MediatorError {
    /// No handler is registered for the request type.
    #[error("No handler registered for {request}")]
    HandlerNotFound { request: &'static str },

    /// A second handler was registered for the same request type.
    #[error("A handler for {request} is already registered")]
    DuplicateHandler { request: &'static str },

    /// A pipeline stage handed the handler a request of the wrong type.
    #[error("Handler for {expected} received a different request type")]
    RequestTypeMismatch { expected: &'static str },

    /// The pipeline produced a payload of the wrong type.
    #[error("Handler for {request} produced an unexpected payload type")]
    ResponseTypeMismatch { request: &'static str },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Any other handler fault.
    #[error("Handler error: {0}")]
    Handler(String),
}

impl MediatorError {
    /// Returns true if this error is an optimistic concurrency conflict.
    pub fn is_concurrency_conflict(&self) -> bool {
        match self {
            MediatorError::Domain(e) => e.is_concurrency_conflict(),
            MediatorError::Store(e) => e.is_concurrency_conflict(),
            _ => false,
        }
    }

    /// Returns true for registration and routing mistakes.
    pub fn is_wiring_error(&self) -> bool {
        matches!(
            self,
            MediatorError::HandlerNotFound { .. }
                | MediatorError::DuplicateHandler { .. }
                | MediatorError::RequestTypeMismatch { .. }
                | MediatorError::ResponseTypeMismatch { .. }
        )
    }
}

/// Result type for mediator operations.
pub type Result<T> = std::result::Result<T, MediatorError>;
