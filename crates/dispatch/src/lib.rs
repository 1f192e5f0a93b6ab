//! Fan-out delivery of committed domain events.
//!
//! - [`EventSubscriber`] handles events of the types it subscribed to
//! - [`EventDispatcher`] is the immutable subscriber registry, built once
//!   through [`EventDispatcherBuilder`] and shared across requests
//! - [`ReadModel`] marks subscribers that maintain a queryable view
//! - Sample subscribers: [`KitchenNotifier`] and [`OrderBoardView`]

pub mod dispatcher;
pub mod error;
pub mod read_model;
pub mod subscriber;
pub mod subscribers;

pub use dispatcher::{DispatchReport, EventDispatcher, EventDispatcherBuilder, SubscriberFailure};
pub use error::{DispatchError, Result};
pub use read_model::ReadModel;
pub use subscriber::EventSubscriber;
pub use subscribers::{KitchenNotifier, Notification, OrderBoardView, OrderSummary};
