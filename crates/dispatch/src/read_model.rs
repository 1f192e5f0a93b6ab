//! Read model trait for query-side views.

/// A read model providing query access to denormalized data.
///
/// Read models are kept up to date by subscribing to domain events and can
/// be rebuilt from the event store with
/// [`EventDispatcher::replay_history`](crate::EventDispatcher::replay_history).
pub trait ReadModel: Send + Sync {
    /// Returns the name of this read model.
    fn name(&self) -> &'static str;

    /// Returns the number of entries in this read model.
    fn count(&self) -> usize;
}
