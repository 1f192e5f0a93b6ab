//! Request mediation.
//!
//! A [`Mediator`] routes each request to the one [`RequestHandler`]
//! registered for its type, through an ordered chain of
//! [`PipelineBehavior`]s composed once at build time.
//!
//! The standard chain is validation, then logging, then the unit-of-work
//! commit:
//!
//! ```text
//! execute(request)
//!   └─ ValidationBehavior      bad_request on invalid input
//!       └─ LoggingBehavior     span, timing, request metrics
//!           └─ UnitOfWorkBehavior
//!               ├─ handler     mutates tracked entities
//!               ├─ commit      persist every enlisted entity
//!               └─ dispatch    only after a successful commit
//! ```

pub mod behaviors;
pub mod context;
pub mod error;
pub mod mediator;
pub mod pipeline;
pub mod request;

pub use behaviors::{LoggingBehavior, UnitOfWorkBehavior, ValidationBehavior};
pub use context::RequestContext;
pub use error::{MediatorError, Result};
pub use mediator::{Mediator, MediatorBuilder};
pub use pipeline::{ErasedResult, Next, PipelineBehavior, RequestEnvelope};
pub use request::{
    Request, RequestDescriptor, RequestHandler, RequestKind, ValidationError, ValidationErrors,
};
