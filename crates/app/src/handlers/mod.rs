//! Request handlers for the order domain.

pub mod customers;
pub mod orders;

use common::OperationResult;
use domain::{CustomerError, OrderError};

/// Maps an order rule violation to its result status.
fn order_failure<T>(error: OrderError) -> OperationResult<T> {
    match error {
        OrderError::InvalidStateTransition { .. } => OperationResult::conflict(error.to_string()),
        OrderError::ItemNotFound { .. } => OperationResult::not_found(error.to_string()),
        OrderError::CustomerIdRequired
        | OrderError::InvalidQuantity { .. }
        | OrderError::InvalidPrice { .. }
        | OrderError::PriceMismatch { .. }
        | OrderError::AmountOverflow { .. }
        | OrderError::NoItems
        | OrderError::ReasonRequired => OperationResult::bad_request(error.to_string()),
    }
}

fn customer_failure<T>(error: CustomerError) -> OperationResult<T> {
    OperationResult::bad_request(error.to_string())
}
