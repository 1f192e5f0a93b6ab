//! Order state machine.

use serde::{Deserialize, Serialize};

/// The state of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Placed ──► Ready ──► Completed
///    │         │
///    └─────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderState {
    /// Order was placed, items can be added/removed.
    #[default]
    Placed,

    /// Order has been prepared and is waiting for pickup.
    Ready,

    /// Order was handed over (terminal state).
    Completed,

    /// Order was cancelled (terminal state).
    Cancelled,
}

impl OrderState {
    /// Returns true if items can be modified in this state.
    pub fn can_modify_items(&self) -> bool {
        matches!(self, OrderState::Placed)
    }

    /// Returns true if the order can be marked ready in this state.
    pub fn can_mark_ready(&self) -> bool {
        matches!(self, OrderState::Placed)
    }

    /// Returns true if the order can be completed in this state.
    pub fn can_complete(&self) -> bool {
        matches!(self, OrderState::Ready)
    }

    /// Returns true if the order can be cancelled in this state.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderState::Placed | OrderState::Ready)
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderState::Completed | OrderState::Cancelled)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Placed => "Placed",
            OrderState::Ready => "Ready",
            OrderState::Completed => "Completed",
            OrderState::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_placed_orders_change_items() {
        assert!(OrderState::Placed.can_modify_items());
        assert!(!OrderState::Ready.can_modify_items());
        assert!(!OrderState::Completed.can_modify_items());
        assert!(!OrderState::Cancelled.can_modify_items());
    }

    #[test]
    fn ready_orders_can_complete() {
        assert!(!OrderState::Placed.can_complete());
        assert!(OrderState::Ready.can_complete());
        assert!(!OrderState::Completed.can_complete());
        assert!(!OrderState::Cancelled.can_complete());
    }

    #[test]
    fn can_cancel_from_non_terminal_states() {
        assert!(OrderState::Placed.can_cancel());
        assert!(OrderState::Ready.can_cancel());
        assert!(!OrderState::Completed.can_cancel());
        assert!(!OrderState::Cancelled.can_cancel());
    }

    #[test]
    fn terminal_states() {
        assert!(!OrderState::Placed.is_terminal());
        assert!(!OrderState::Ready.is_terminal());
        assert!(OrderState::Completed.is_terminal());
        assert!(OrderState::Cancelled.is_terminal());
    }

    #[test]
    fn display() {
        assert_eq!(OrderState::Placed.to_string(), "Placed");
        assert_eq!(OrderState::Cancelled.to_string(), "Cancelled");
    }
}
