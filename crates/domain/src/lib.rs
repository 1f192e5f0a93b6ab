//! Domain layer: entities, aggregates and the unit of work.
//!
//! This crate provides:
//! - `Entity` and `AggregateRoot` traits with an uncommitted-event buffer
//! - `UnitOfWork`, the request-scoped identity map that persists tracked
//!   entities and drains their events
//! - Event-sourced and state-based repositories
//! - A sample domain: the `Order` aggregate and the `Customer` entity

pub mod aggregate;
pub mod customer;
pub mod error;
pub mod event;
pub mod order;
pub mod repository;
pub mod unit_of_work;

pub use aggregate::{AggregateRoot, DomainEvent, Entity, EntityRef, PendingEvent, PendingEvents};
pub use common::EntityId;
pub use customer::{Customer, CustomerError, CustomerEvent};
pub use error::{DomainError, Result};
pub use event::RaisedEvent;
pub use order::{Money, Order, OrderError, OrderEvent, OrderItem, OrderState, ProductId};
pub use repository::{EventSourcedRepository, StateRepository};
pub use unit_of_work::{Enlisted, Tracked, UnitOfWork};
