//! Standard pipeline behaviors.

mod logging;
mod unit_of_work;
mod validation;

pub use logging::LoggingBehavior;
pub use unit_of_work::UnitOfWorkBehavior;
pub use validation::ValidationBehavior;
