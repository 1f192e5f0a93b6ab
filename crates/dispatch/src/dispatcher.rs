//! Event dispatcher: routes raised events to their subscribers.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use domain::RaisedEvent;
use event_store::{EventId, EventStore};
use futures_util::{FutureExt, StreamExt};

use crate::{DispatchError, EventSubscriber, Result};

/// A subscriber that failed to handle an event.
#[derive(Debug)]
pub struct SubscriberFailure {
    pub subscriber: &'static str,
    pub event_id: EventId,
    pub event_type: String,
    pub error: DispatchError,
}

/// Outcome of delivering one or more events.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Number of successful subscriber deliveries.
    pub delivered: usize,
    pub failures: Vec<SubscriberFailure>,
}

impl DispatchReport {
    /// Returns true if every delivery succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn merge(&mut self, other: DispatchReport) {
        self.delivered += other.delivered;
        self.failures.extend(other.failures);
    }
}

/// Builder for [`EventDispatcher`].
#[derive(Default)]
pub struct EventDispatcherBuilder {
    by_type: HashMap<String, Vec<Arc<dyn EventSubscriber>>>,
    wildcard: Vec<Arc<dyn EventSubscriber>>,
}

impl EventDispatcherBuilder {
    /// Subscribes to a single event type.
    pub fn subscribe(
        mut self,
        event_type: impl Into<String>,
        subscriber: Arc<dyn EventSubscriber>,
    ) -> Self {
        self.by_type
            .entry(event_type.into())
            .or_default()
            .push(subscriber);
        self
    }

    /// Subscribes to several event types with the same subscriber.
    pub fn subscribe_many<I, S>(mut self, event_types: I, subscriber: Arc<dyn EventSubscriber>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for event_type in event_types {
            self = self.subscribe(event_type, Arc::clone(&subscriber));
        }
        self
    }

    /// Subscribes to every event type.
    pub fn subscribe_all(mut self, subscriber: Arc<dyn EventSubscriber>) -> Self {
        self.wildcard.push(subscriber);
        self
    }

    pub fn build(self) -> EventDispatcher {
        EventDispatcher {
            by_type: self.by_type,
            wildcard: self.wildcard,
        }
    }
}

/// Delivers committed events to subscribers.
///
/// The registry is fixed once built. Delivery is sequential: events in the
/// order given, and for each event the type subscribers in registration
/// order followed by the catch-all subscribers. A failing subscriber does
/// not stop delivery to the others.
pub struct EventDispatcher {
    by_type: HashMap<String, Vec<Arc<dyn EventSubscriber>>>,
    wildcard: Vec<Arc<dyn EventSubscriber>>,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("event_types", &self.by_type.keys().collect::<Vec<_>>())
            .field("wildcard", &self.wildcard.len())
            .finish()
    }
}

impl EventDispatcher {
    pub fn builder() -> EventDispatcherBuilder {
        EventDispatcherBuilder::default()
    }

    /// A dispatcher with no subscribers.
    pub fn empty() -> Self {
        Self::builder().build()
    }

    /// Returns the subscribers that receive the given event type.
    pub fn subscribers_for<'a>(
        &'a self,
        event_type: &str,
    ) -> impl Iterator<Item = &'a Arc<dyn EventSubscriber>> + 'a {
        self.by_type
            .get(event_type)
            .into_iter()
            .flatten()
            .chain(self.wildcard.iter())
    }

    /// Delivers one event to its subscribers.
    pub async fn dispatch(&self, event: &RaisedEvent) -> DispatchReport {
        self.deliver(event, |_| true).await
    }

    /// Delivers a batch of events in order.
    #[tracing::instrument(skip(self, events), fields(events = events.len()))]
    pub async fn dispatch_all(&self, events: &[RaisedEvent]) -> DispatchReport {
        let mut report = DispatchReport::default();
        for event in events {
            report.merge(self.dispatch(event).await);
        }
        if !report.is_clean() {
            tracing::warn!(
                failures = report.failures.len(),
                delivered = report.delivered,
                "event dispatch completed with subscriber failures"
            );
        }
        report
    }

    /// Rebuilds replayable subscribers from the full event log.
    ///
    /// Each replayable subscriber is reset first. Subscribers that do not
    /// replay history are skipped entirely.
    #[tracing::instrument(skip(self, store))]
    pub async fn replay_history(&self, store: &dyn EventStore) -> Result<DispatchReport> {
        for subscriber in self.unique_subscribers() {
            if subscriber.replays_history() {
                subscriber.reset().await?;
            }
        }

        let mut report = DispatchReport::default();
        let mut events = store.read_all().await?;
        let mut replayed = 0usize;
        while let Some(envelope) = events.next().await {
            let event = RaisedEvent::from_envelope(&envelope?);
            report.merge(self.deliver(&event, |s| s.replays_history()).await);
            replayed += 1;
        }

        tracing::info!(replayed, delivered = report.delivered, "history replay complete");
        Ok(report)
    }

    async fn deliver(
        &self,
        event: &RaisedEvent,
        include: impl Fn(&dyn EventSubscriber) -> bool,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();
        for subscriber in self.subscribers_for(&event.event_type) {
            if !include(subscriber.as_ref()) {
                continue;
            }
            let outcome = AssertUnwindSafe(subscriber.handle(event))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(DispatchError::Subscriber {
                        subscriber: subscriber.name(),
                        message: format!("panicked: {}", panic_message(panic.as_ref())),
                    })
                });
            match outcome {
                Ok(()) => {
                    report.delivered += 1;
                    metrics::counter!(
                        "dispatcher_events_delivered_total",
                        "event_type" => event.event_type.clone()
                    )
                    .increment(1);
                }
                Err(error) => {
                    tracing::warn!(
                        subscriber = subscriber.name(),
                        event_id = %event.event_id,
                        event_type = %event.event_type,
                        entity = %event.entity,
                        %error,
                        "subscriber failed to handle event"
                    );
                    metrics::counter!(
                        "dispatcher_subscriber_failures_total",
                        "subscriber" => subscriber.name()
                    )
                    .increment(1);
                    report.failures.push(SubscriberFailure {
                        subscriber: subscriber.name(),
                        event_id: event.event_id,
                        event_type: event.event_type.clone(),
                        error,
                    });
                }
            }
        }
        report
    }

    fn unique_subscribers(&self) -> Vec<&Arc<dyn EventSubscriber>> {
        let mut seen: Vec<&Arc<dyn EventSubscriber>> = Vec::new();
        for subscriber in self.by_type.values().flatten().chain(self.wildcard.iter()) {
            if !seen.iter().any(|&s| Arc::ptr_eq(s, subscriber)) {
                seen.push(subscriber);
            }
        }
        seen
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
