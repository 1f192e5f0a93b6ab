//! Subscribers shipped with the service.

mod kitchen;
mod order_board;

pub use kitchen::{KitchenNotifier, Notification};
pub use order_board::{OrderBoardView, OrderSummary};
