//! Order domain events.

use chrono::{DateTime, Utc};
use common::EntityId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::{Money, OrderItem, ProductId};

/// Events that can occur on an order aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order was placed.
    OrderPlaced(OrderPlacedData),

    /// Item was added to the order.
    ItemAdded(ItemAddedData),

    /// Item was removed from the order.
    ItemRemoved(ItemRemovedData),

    /// Order was prepared.
    OrderReady(OrderReadyData),

    /// Order was handed over.
    OrderCompleted(OrderCompletedData),

    /// Order was cancelled.
    OrderCancelled(OrderCancelledData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "OrderPlaced",
            OrderEvent::ItemAdded(_) => "ItemAdded",
            OrderEvent::ItemRemoved(_) => "ItemRemoved",
            OrderEvent::OrderReady(_) => "OrderReady",
            OrderEvent::OrderCompleted(_) => "OrderCompleted",
            OrderEvent::OrderCancelled(_) => "OrderCancelled",
        }
    }
}

/// Data for OrderPlaced event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedData {
    /// The unique order ID.
    pub order_id: EntityId,

    /// The customer who placed the order.
    pub customer_id: EntityId,

    /// When the order was placed.
    pub placed_at: DateTime<Utc>,
}

/// Data for ItemAdded event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemAddedData {
    /// The product that was added.
    pub product_id: ProductId,

    /// Product name.
    pub product_name: String,

    /// Quantity added.
    pub quantity: u32,

    /// Unit price at the time of adding.
    pub unit_price: Money,
}

/// Data for ItemRemoved event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRemovedData {
    /// The product that was removed.
    pub product_id: ProductId,
}

/// Data for OrderReady event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReadyData {
    pub ready_at: DateTime<Utc>,

    /// Number of distinct items prepared.
    pub item_count: usize,

    /// Total amount at the time the order was prepared.
    pub total_amount: Money,
}

/// Data for OrderCompleted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCompletedData {
    pub completed_at: DateTime<Utc>,

    /// Amount charged.
    pub total_amount: Money,
}

/// Data for OrderCancelled event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancelledData {
    pub cancelled_at: DateTime<Utc>,

    /// Reason for cancellation.
    pub reason: String,
}

// Convenience constructors for events
impl OrderEvent {
    /// Creates an OrderPlaced event.
    pub fn order_placed(order_id: EntityId, customer_id: EntityId) -> Self {
        OrderEvent::OrderPlaced(OrderPlacedData {
            order_id,
            customer_id,
            placed_at: Utc::now(),
        })
    }

    /// Creates an ItemAdded event.
    pub fn item_added(item: &OrderItem) -> Self {
        OrderEvent::ItemAdded(ItemAddedData {
            product_id: item.product_id.clone(),
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
        })
    }

    /// Creates an ItemRemoved event.
    pub fn item_removed(product_id: ProductId) -> Self {
        OrderEvent::ItemRemoved(ItemRemovedData { product_id })
    }

    /// Creates an OrderReady event.
    pub fn order_ready(item_count: usize, total_amount: Money) -> Self {
        OrderEvent::OrderReady(OrderReadyData {
            ready_at: Utc::now(),
            item_count,
            total_amount,
        })
    }

    /// Creates an OrderCompleted event.
    pub fn order_completed(total_amount: Money) -> Self {
        OrderEvent::OrderCompleted(OrderCompletedData {
            completed_at: Utc::now(),
            total_amount,
        })
    }

    /// Creates an OrderCancelled event.
    pub fn order_cancelled(reason: impl Into<String>) -> Self {
        OrderEvent::OrderCancelled(OrderCancelledData {
            cancelled_at: Utc::now(),
            reason: reason.into(),
        })
    }
}
