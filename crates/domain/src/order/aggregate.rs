//! Order aggregate implementation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::EntityId;
use event_store::Version;
use serde::Serialize;

use crate::aggregate::{AggregateRoot, Entity, PendingEvents};

use super::{
    Money, OrderError, OrderEvent, OrderItem, OrderState, ProductId,
    events::{ItemAddedData, OrderPlacedData},
};

/// Order aggregate root.
///
/// Represents an order from placement to pickup or cancellation. The state
/// is rebuilt from its event stream; equality compares identity only.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    id: EntityId,

    /// Number of events applied.
    version: Version,

    customer_id: Option<EntityId>,

    state: OrderState,

    /// Items keyed by product, ordered for stable serialization.
    items: BTreeMap<ProductId, OrderItem>,

    total_amount: Money,

    placed_at: Option<DateTime<Utc>>,

    #[serde(skip)]
    pending: PendingEvents<OrderEvent>,
}

impl PartialEq for Order {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Order {}

impl Entity for Order {
    type Event = OrderEvent;

    fn entity_type() -> &'static str {
        "Order"
    }

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn pending_events(&self) -> &PendingEvents<OrderEvent> {
        &self.pending
    }

    fn pending_events_mut(&mut self) -> &mut PendingEvents<OrderEvent> {
        &mut self.pending
    }
}

impl AggregateRoot for Order {
    fn blank(id: EntityId) -> Self {
        Self {
            id,
            version: Version::initial(),
            customer_id: None,
            state: OrderState::default(),
            items: BTreeMap::new(),
            total_amount: Money::zero(),
            placed_at: None,
            pending: PendingEvents::default(),
        }
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: &OrderEvent) {
        match event {
            OrderEvent::OrderPlaced(data) => self.apply_order_placed(data),
            OrderEvent::ItemAdded(data) => self.apply_item_added(data),
            OrderEvent::ItemRemoved(data) => self.apply_item_removed(&data.product_id),
            OrderEvent::OrderReady(_) => self.state = OrderState::Ready,
            OrderEvent::OrderCompleted(_) => self.state = OrderState::Completed,
            OrderEvent::OrderCancelled(_) => self.state = OrderState::Cancelled,
        }
    }
}

// Query methods
impl Order {
    /// Returns the customer ID.
    pub fn customer_id(&self) -> Option<&EntityId> {
        self.customer_id.as_ref()
    }

    /// Returns the current state.
    pub fn state(&self) -> OrderState {
        self.state
    }

    /// Returns all items in the order, ordered by product.
    pub fn items(&self) -> impl Iterator<Item = &OrderItem> {
        self.items.values()
    }

    /// Returns an item by product ID.
    pub fn get_item(&self, product_id: &ProductId) -> Option<&OrderItem> {
        self.items.get(product_id)
    }

    /// Returns the number of distinct items.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns the total amount.
    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn placed_at(&self) -> Option<DateTime<Utc>> {
        self.placed_at
    }

    /// Returns true if the order has items.
    pub fn has_items(&self) -> bool {
        !self.items.is_empty()
    }
}

// Command methods (raise events)
impl Order {
    /// Places a new order for a customer.
    pub fn place(id: EntityId, customer_id: EntityId) -> Result<Self, OrderError> {
        if customer_id.as_str().is_empty() {
            return Err(OrderError::CustomerIdRequired);
        }

        let mut order = Self::blank(id.clone());
        order.raise_event(OrderEvent::order_placed(id, customer_id));
        Ok(order)
    }

    /// Adds an item to the order.
    ///
    /// Adding a product that is already in the order increases its quantity,
    /// as long as the unit price matches.
    pub fn add_item(&mut self, item: OrderItem) -> Result<(), OrderError> {
        self.ensure(self.state.can_modify_items(), "add item")?;

        if item.quantity == 0 {
            return Err(OrderError::InvalidQuantity {
                quantity: item.quantity,
            });
        }

        if !item.unit_price.is_positive() {
            return Err(OrderError::InvalidPrice {
                price: item.unit_price.cents(),
            });
        }

        if let Some(existing) = self.items.get(&item.product_id) {
            if existing.unit_price != item.unit_price {
                return Err(OrderError::PriceMismatch {
                    product_id: item.product_id.to_string(),
                    existing: existing.unit_price,
                    requested: item.unit_price,
                });
            }
            existing
                .quantity
                .checked_add(item.quantity)
                .ok_or_else(|| overflow(&item))?;
        }

        // Applying the event must not overflow the running totals
        item.line_total()
            .and_then(|line| self.total_amount.checked_add(line))
            .ok_or_else(|| overflow(&item))?;

        self.raise_event(OrderEvent::item_added(&item));
        Ok(())
    }

    /// Removes an item from the order.
    pub fn remove_item(&mut self, product_id: ProductId) -> Result<(), OrderError> {
        self.ensure(self.state.can_modify_items(), "remove item")?;

        if !self.items.contains_key(&product_id) {
            return Err(OrderError::ItemNotFound {
                product_id: product_id.to_string(),
            });
        }

        self.raise_event(OrderEvent::item_removed(product_id));
        Ok(())
    }

    /// Marks the order as prepared.
    pub fn mark_ready(&mut self) -> Result<(), OrderError> {
        self.ensure(self.state.can_mark_ready(), "mark ready")?;

        if !self.has_items() {
            return Err(OrderError::NoItems);
        }

        self.raise_event(OrderEvent::order_ready(self.items.len(), self.total_amount));
        Ok(())
    }

    /// Completes the order.
    pub fn complete(&mut self) -> Result<(), OrderError> {
        self.ensure(self.state.can_complete(), "complete")?;

        self.raise_event(OrderEvent::order_completed(self.total_amount));
        Ok(())
    }

    /// Cancels the order.
    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<(), OrderError> {
        self.ensure(self.state.can_cancel(), "cancel")?;

        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(OrderError::ReasonRequired);
        }

        self.raise_event(OrderEvent::order_cancelled(reason));
        Ok(())
    }

    fn ensure(&self, allowed: bool, action: &'static str) -> Result<(), OrderError> {
        if allowed {
            Ok(())
        } else {
            Err(OrderError::InvalidStateTransition {
                current_state: self.state,
                action,
            })
        }
    }
}

fn overflow(item: &OrderItem) -> OrderError {
    OrderError::AmountOverflow {
        product_id: item.product_id.to_string(),
    }
}

// Apply event helpers
impl Order {
    fn apply_order_placed(&mut self, data: &OrderPlacedData) {
        self.customer_id = Some(data.customer_id.clone());
        self.placed_at = Some(data.placed_at);
        self.state = OrderState::Placed;
    }

    fn apply_item_added(&mut self, data: &ItemAddedData) {
        let added = OrderItem::new(
            data.product_id.clone(),
            data.product_name.clone(),
            data.quantity,
            data.unit_price,
        );
        self.total_amount = self
            .total_amount
            .saturating_add(added.unit_price.saturating_times(added.quantity));
        self.items
            .entry(data.product_id.clone())
            .and_modify(|item| item.quantity = item.quantity.saturating_add(data.quantity))
            .or_insert(added);
    }

    fn apply_item_removed(&mut self, product_id: &ProductId) {
        if let Some(item) = self.items.remove(product_id) {
            self.total_amount = self
                .total_amount
                .saturating_sub(item.unit_price.saturating_times(item.quantity));
        }
    }
}
