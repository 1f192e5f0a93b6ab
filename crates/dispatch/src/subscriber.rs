//! Core subscriber trait.

use async_trait::async_trait;
use domain::RaisedEvent;

use crate::Result;

/// Receives domain events after the unit of work that raised them committed.
///
/// Subscribers are notified after the fact: an error here is reported and
/// logged, but never undoes the write that produced the event.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Returns the name of this subscriber, used in logs and failure reports.
    fn name(&self) -> &'static str;

    /// Handles a single event.
    async fn handle(&self, event: &RaisedEvent) -> Result<()>;

    /// Whether this subscriber takes part in history replay.
    ///
    /// Subscribers with external side effects (notifications, emails) keep
    /// the default so that rebuilding read models does not repeat them.
    fn replays_history(&self) -> bool {
        false
    }

    /// Clears any state before a history replay.
    async fn reset(&self) -> Result<()> {
        Ok(())
    }
}
