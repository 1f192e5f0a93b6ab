//! Order aggregate and related types.

mod aggregate;
mod events;
mod state;
mod value_objects;

pub use aggregate::Order;
pub use events::{
    ItemAddedData, ItemRemovedData, OrderCancelledData, OrderCompletedData, OrderEvent,
    OrderPlacedData, OrderReadyData,
};
pub use state::OrderState;
pub use value_objects::{Money, OrderItem, ProductId};

use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Customer ID is required.
    #[error("Customer ID is required")]
    CustomerIdRequired,

    /// Order is not in the expected state.
    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: OrderState,
        action: &'static str,
    },

    /// Item not found in order.
    #[error("Item not found: {product_id}")]
    ItemNotFound { product_id: String },

    /// Invalid quantity.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// Invalid price.
    #[error("Invalid price: {price} (must be greater than 0)")]
    InvalidPrice { price: i64 },

    /// The same product was added again at a different unit price.
    #[error("Price mismatch for {product_id}: order has {existing}, got {requested}")]
    PriceMismatch {
        product_id: String,
        existing: Money,
        requested: Money,
    },

    /// The line or order total would not fit in the amount type.
    #[error("Amount too large for {product_id}")]
    AmountOverflow { product_id: String },

    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// Cancellation reason is required.
    #[error("Cancellation reason is required")]
    ReasonRequired,
}
