//! Composition root for the order service.
//!
//! Wires the stores, repositories, subscribers and request handlers into a
//! [`Mediator`] running the standard pipeline, and carries the
//! configuration and telemetry setup used by the binary.

pub mod config;
pub mod demo;
pub mod error;
pub mod handlers;
pub mod stores;
pub mod telemetry;

use std::sync::Arc;

use dispatch::{EventDispatcher, KitchenNotifier, OrderBoardView};
use domain::{Customer, EventSourcedRepository, Order, StateRepository};
use mediator::{Mediator, MediatorError};

use handlers::customers::{CustomerHandlers, GetCustomer, RegisterCustomer, RenameCustomer};
use handlers::orders::{
    AddItem, CancelOrder, CompleteOrder, GetOrder, MarkOrderReady, OrderHandlers, PlaceOrder,
    RemoveItem,
};
pub use stores::Stores;

/// The wired application.
pub struct App {
    pub mediator: Arc<Mediator>,
    pub dispatcher: Arc<EventDispatcher>,
    pub board: Arc<OrderBoardView>,
    pub kitchen: Arc<KitchenNotifier>,
    pub stores: Stores,
}

impl App {
    /// Builds the application over the given stores.
    pub fn build(stores: Stores) -> Result<Self, MediatorError> {
        let board = Arc::new(OrderBoardView::new());
        let kitchen = Arc::new(KitchenNotifier::new());
        let dispatcher = Arc::new(
            EventDispatcher::builder()
                .subscribe_many(OrderBoardView::EVENT_TYPES, board.clone())
                .subscribe_many(KitchenNotifier::EVENT_TYPES, kitchen.clone())
                .build(),
        );
        let mediator = Arc::new(build_mediator(&stores, dispatcher.clone())?);

        Ok(Self {
            mediator,
            dispatcher,
            board,
            kitchen,
            stores,
        })
    }

    /// Rebuilds the read models from the event log.
    pub async fn catch_up(&self) -> Result<(), dispatch::DispatchError> {
        let report = self
            .dispatcher
            .replay_history(self.stores.events.as_ref())
            .await?;
        tracing::info!(
            delivered = report.delivered,
            failures = report.failures.len(),
            "read models caught up"
        );
        Ok(())
    }
}

/// Registers every handler behind the standard pipeline.
pub fn build_mediator(
    stores: &Stores,
    dispatcher: Arc<EventDispatcher>,
) -> Result<Mediator, MediatorError> {
    let orders = EventSourcedRepository::<Order>::new(stores.events.clone());
    let customers = StateRepository::<Customer>::new(stores.records.clone());
    let order_handlers = OrderHandlers::new(orders, customers.clone());
    let customer_handlers = CustomerHandlers::new(customers);

    Ok(Mediator::standard_pipeline(dispatcher)
        .register::<PlaceOrder, _>(order_handlers.clone())?
        .register::<AddItem, _>(order_handlers.clone())?
        .register::<RemoveItem, _>(order_handlers.clone())?
        .register::<MarkOrderReady, _>(order_handlers.clone())?
        .register::<CompleteOrder, _>(order_handlers.clone())?
        .register::<CancelOrder, _>(order_handlers.clone())?
        .register::<GetOrder, _>(order_handlers)?
        .register::<RegisterCustomer, _>(customer_handlers.clone())?
        .register::<RenameCustomer, _>(customer_handlers.clone())?
        .register::<GetCustomer, _>(customer_handlers)?
        .build())
}
