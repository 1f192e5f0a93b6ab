//! Kitchen notifications for new and prepared orders.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::EntityId;
use domain::{OrderEvent, RaisedEvent};
use tokio::sync::RwLock;

use crate::{EventSubscriber, Result};

/// A message sent to the kitchen display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub order_id: EntityId,
    pub message: String,
    pub sent_at: DateTime<Utc>,
}

/// Sends a notification for every placed or prepared order.
///
/// Notifications are side effects, so the notifier never takes part in
/// history replay.
#[derive(Debug, Default)]
pub struct KitchenNotifier {
    sent: RwLock<Vec<Notification>>,
}

impl KitchenNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Event types the notifier wants.
    pub const EVENT_TYPES: [&'static str; 2] = ["OrderPlaced", "OrderReady"];

    pub async fn notifications(&self) -> Vec<Notification> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl EventSubscriber for KitchenNotifier {
    fn name(&self) -> &'static str {
        "KitchenNotifier"
    }

    async fn handle(&self, event: &RaisedEvent) -> Result<()> {
        let message = match event.decode::<OrderEvent>()? {
            OrderEvent::OrderPlaced(data) => {
                format!("New order from customer {}", data.customer_id)
            }
            OrderEvent::OrderReady(data) => {
                format!("Order ready: {} items, {}", data.item_count, data.total_amount)
            }
            _ => return Ok(()),
        };

        tracing::info!(order_id = %event.entity.id, %message, "kitchen notified");
        self.sent.write().await.push(Notification {
            order_id: event.entity.id.clone(),
            message,
            sent_at: Utc::now(),
        });
        Ok(())
    }
}
