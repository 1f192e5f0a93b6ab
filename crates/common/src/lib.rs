//! Shared types used across every crate of the mediator core.

pub mod result;
pub mod types;

pub use result::{FailureStatus, OperationResult, SuccessStatus};
pub use types::EntityId;
