//! Storage engines for the mediator core.
//!
//! - [`EventStore`]: append-only, per-stream event log with optimistic
//!   concurrency on the expected stream version.
//! - [`StateStore`]: materialized records with a per-record version check.
//!
//! Both come with an in-memory engine and a PostgreSQL engine.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod postgres_state;
pub mod state;
pub mod store;

pub use common::EntityId;
pub use error::{Result, StoreError};
pub use event::{EventEnvelope, EventId, NewEvent, NewEventBuilder, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use postgres_state::PostgresStateStore;
pub use state::{InMemoryStateStore, StateRecord, StateStore};
pub use store::{EventStore, EventStoreExt, EventStream};
