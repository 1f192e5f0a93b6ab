//! Repositories load entities into a unit of work and persist them at commit.
//!
//! - [`EventSourcedRepository`] stores aggregates as event streams and
//!   rebuilds them by replay.
//! - [`StateRepository`] stores entities as materialized records.

mod event_sourced;
mod state;

pub use event_sourced::EventSourcedRepository;
pub use state::StateRepository;
