//! Order board read model: open orders and what they contain.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::EntityId;
use domain::{Money, OrderEvent, OrderState, ProductId, RaisedEvent};
use tokio::sync::RwLock;

use crate::{EventSubscriber, ReadModel, Result};

/// An open order on the board.
#[derive(Debug, Clone)]
pub struct OrderSummary {
    pub order_id: EntityId,
    pub customer_id: EntityId,
    pub state: OrderState,
    pub quantities: HashMap<ProductId, u32>,
    pub total_amount: Money,
    pub placed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderSummary {
    pub fn item_count(&self) -> usize {
        self.quantities.len()
    }
}

/// Open (non-terminal) orders, keyed by order id.
///
/// Orders leave the board when they are completed or cancelled. The view is
/// derived purely from order events and can be rebuilt by replaying history.
#[derive(Debug, Default)]
pub struct OrderBoardView {
    orders: RwLock<HashMap<EntityId, OrderSummary>>,
    prices: RwLock<HashMap<(EntityId, ProductId), Money>>,
}

impl OrderBoardView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Event types that affect the board.
    pub const EVENT_TYPES: [&'static str; 6] = [
        "OrderPlaced",
        "ItemAdded",
        "ItemRemoved",
        "OrderReady",
        "OrderCompleted",
        "OrderCancelled",
    ];

    pub async fn get_order(&self, order_id: &EntityId) -> Option<OrderSummary> {
        self.orders.read().await.get(order_id).cloned()
    }

    /// Open orders in the given state, oldest first.
    pub async fn orders_in_state(&self, state: OrderState) -> Vec<OrderSummary> {
        let mut orders: Vec<_> = self
            .orders
            .read()
            .await
            .values()
            .filter(|o| o.state == state)
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.placed_at);
        orders
    }

    pub async fn open_orders(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait]
impl EventSubscriber for OrderBoardView {
    fn name(&self) -> &'static str {
        "OrderBoardView"
    }

    async fn handle(&self, event: &RaisedEvent) -> Result<()> {
        if event.entity.entity_type != "Order" {
            return Ok(());
        }

        let order_id = &event.entity.id;
        let order_event: OrderEvent = event.decode()?;
        let mut orders = self.orders.write().await;
        let mut prices = self.prices.write().await;

        match order_event {
            OrderEvent::OrderPlaced(data) => {
                orders.insert(
                    order_id.clone(),
                    OrderSummary {
                        order_id: order_id.clone(),
                        customer_id: data.customer_id,
                        state: OrderState::Placed,
                        quantities: HashMap::new(),
                        total_amount: Money::zero(),
                        placed_at: data.placed_at,
                        updated_at: data.placed_at,
                    },
                );
            }
            OrderEvent::ItemAdded(data) => {
                if let Some(order) = orders.get_mut(order_id) {
                    let quantity = order.quantities.entry(data.product_id.clone()).or_default();
                    *quantity = quantity.saturating_add(data.quantity);
                    order.total_amount = order
                        .total_amount
                        .saturating_add(data.unit_price.saturating_times(data.quantity));
                    order.updated_at = event.raised_at;
                    prices.insert((order_id.clone(), data.product_id), data.unit_price);
                }
            }
            OrderEvent::ItemRemoved(data) => {
                if let Some(order) = orders.get_mut(order_id)
                    && let Some(quantity) = order.quantities.remove(&data.product_id)
                {
                    let key = (order_id.clone(), data.product_id);
                    if let Some(price) = prices.remove(&key) {
                        order.total_amount =
                            order.total_amount.saturating_sub(price.saturating_times(quantity));
                    }
                    order.updated_at = event.raised_at;
                }
            }
            OrderEvent::OrderReady(data) => {
                if let Some(order) = orders.get_mut(order_id) {
                    order.state = OrderState::Ready;
                    order.total_amount = data.total_amount;
                    order.updated_at = data.ready_at;
                }
            }
            OrderEvent::OrderCompleted(_) | OrderEvent::OrderCancelled(_) => {
                orders.remove(order_id);
                prices.retain(|(id, _), _| id != order_id);
            }
        }

        Ok(())
    }

    fn replays_history(&self) -> bool {
        true
    }

    async fn reset(&self) -> Result<()> {
        self.orders.write().await.clear();
        self.prices.write().await.clear();
        Ok(())
    }
}

impl ReadModel for OrderBoardView {
    fn name(&self) -> &'static str {
        "OrderBoardView"
    }

    fn count(&self) -> usize {
        // try_read avoids blocking; a held lock reads as empty
        self.orders.try_read().map(|o| o.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{EntityRef, OrderItem, PendingEvents};

    fn raise(order_id: &str, event: OrderEvent) -> RaisedEvent {
        let mut buffer = PendingEvents::default();
        buffer.push(event);
        RaisedEvent::from_pending(
            EntityRef::new("Order", EntityId::from(order_id)),
            None,
            &buffer.entries()[0],
        )
        .unwrap()
    }

    fn placed(order_id: &str) -> RaisedEvent {
        raise(
            order_id,
            OrderEvent::order_placed(EntityId::from(order_id), EntityId::from("customer-1")),
        )
    }

    fn added(order_id: &str, sku: &str, quantity: u32, cents: i64) -> RaisedEvent {
        let item = OrderItem::new(sku, sku, quantity, Money::from_cents(cents));
        raise(order_id, OrderEvent::item_added(&item))
    }

    #[tokio::test]
    async fn tracks_items_and_totals() {
        let view = OrderBoardView::new();
        let id = EntityId::from("order-1");

        view.handle(&placed("order-1")).await.unwrap();
        view.handle(&added("order-1", "LATTE", 2, 450)).await.unwrap();
        view.handle(&added("order-1", "LATTE", 1, 450)).await.unwrap();
        view.handle(&added("order-1", "SCONE", 1, 300)).await.unwrap();

        let order = view.get_order(&id).await.unwrap();
        assert_eq!(order.item_count(), 2);
        assert_eq!(order.quantities[&ProductId::new("LATTE")], 3);
        assert_eq!(order.total_amount, Money::from_cents(1650));

        view.handle(&raise(
            "order-1",
            OrderEvent::item_removed(ProductId::new("LATTE")),
        ))
        .await
        .unwrap();
        let order = view.get_order(&id).await.unwrap();
        assert_eq!(order.total_amount, Money::from_cents(300));
    }

    #[tokio::test]
    async fn terminal_orders_leave_the_board() {
        let view = OrderBoardView::new();
        view.handle(&placed("order-1")).await.unwrap();
        view.handle(&placed("order-2")).await.unwrap();
        view.handle(&raise(
            "order-2",
            OrderEvent::order_ready(1, Money::from_cents(300)),
        ))
        .await
        .unwrap();

        assert_eq!(view.orders_in_state(OrderState::Placed).await.len(), 1);
        assert_eq!(view.orders_in_state(OrderState::Ready).await.len(), 1);

        view.handle(&raise(
            "order-2",
            OrderEvent::order_completed(Money::from_cents(300)),
        ))
        .await
        .unwrap();
        view.handle(&raise("order-1", OrderEvent::order_cancelled("closed")))
            .await
            .unwrap();

        assert_eq!(view.open_orders().await, 0);
        assert_eq!(ReadModel::count(&view), 0);
    }

    #[tokio::test]
    async fn reset_clears_the_board() {
        let view = OrderBoardView::new();
        view.handle(&placed("order-1")).await.unwrap();
        assert_eq!(ReadModel::count(&view), 1);

        view.reset().await.unwrap();
        assert_eq!(ReadModel::count(&view), 0);
        assert!(view.replays_history());
    }
}
