//! Handler registry and request execution.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use common::OperationResult;
use dispatch::EventDispatcher;

use crate::behaviors::{LoggingBehavior, UnitOfWorkBehavior, ValidationBehavior};
use crate::pipeline::{ErasedHandler, HandlerAdapter};
use crate::{
    MediatorError, Next, PipelineBehavior, Request, RequestContext, RequestDescriptor,
    RequestEnvelope, RequestHandler, Result,
};

struct Registration {
    descriptor: RequestDescriptor,
    handler: Arc<dyn ErasedHandler>,
}

/// Collects handlers and behaviors, then freezes them into a [`Mediator`].
#[derive(Default)]
pub struct MediatorBuilder {
    handlers: HashMap<TypeId, Registration>,
    behaviors: Vec<Arc<dyn PipelineBehavior>>,
}

impl MediatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler for request type `R`.
    ///
    /// Fails with `DuplicateHandler` if `R` already has one.
    pub fn register<R, H>(mut self, handler: H) -> Result<Self>
    where
        R: Request,
        H: RequestHandler<R>,
    {
        let descriptor = RequestDescriptor::of::<R>();
        if self.handlers.contains_key(&descriptor.type_id) {
            return Err(MediatorError::DuplicateHandler {
                request: descriptor.name,
            });
        }

        tracing::debug!(request = descriptor.name, kind = descriptor.kind.as_str(), "handler registered");
        self.handlers.insert(
            descriptor.type_id,
            Registration {
                descriptor,
                handler: Arc::new(HandlerAdapter::<R, H>::new(handler)),
            },
        );
        Ok(self)
    }

    /// Appends a behavior. Behaviors run outermost first, in the order
    /// they were added.
    pub fn with_behavior(mut self, behavior: impl PipelineBehavior + 'static) -> Self {
        self.behaviors.push(Arc::new(behavior));
        self
    }

    /// Appends the standard chain: validation, logging, unit of work.
    pub fn with_standard_pipeline(self, dispatcher: Arc<EventDispatcher>) -> Self {
        self.with_behavior(ValidationBehavior)
            .with_behavior(LoggingBehavior)
            .with_behavior(UnitOfWorkBehavior::new(dispatcher))
    }

    /// Composes one chain per registered request type.
    pub fn build(self) -> Mediator {
        let pipelines = self
            .handlers
            .into_iter()
            .map(|(type_id, registration)| {
                let behaviors = self
                    .behaviors
                    .iter()
                    .filter(|b| b.applies_to(&registration.descriptor))
                    .cloned()
                    .collect();
                let pipeline = Pipeline {
                    descriptor: registration.descriptor,
                    behaviors,
                    handler: registration.handler,
                };
                (type_id, pipeline)
            })
            .collect::<HashMap<_, _>>();

        tracing::debug!(handlers = pipelines.len(), behaviors = self.behaviors.len(), "mediator built");
        Mediator { pipelines }
    }
}

struct Pipeline {
    descriptor: RequestDescriptor,
    behaviors: Vec<Arc<dyn PipelineBehavior>>,
    handler: Arc<dyn ErasedHandler>,
}

/// Routes requests to their handlers through the behavior chain.
///
/// Immutable once built; share it behind an `Arc`.
pub struct Mediator {
    pipelines: HashMap<TypeId, Pipeline>,
}

impl Mediator {
    pub fn builder() -> MediatorBuilder {
        MediatorBuilder::new()
    }

    /// A builder preloaded with the standard chain.
    pub fn standard_pipeline(dispatcher: Arc<EventDispatcher>) -> MediatorBuilder {
        MediatorBuilder::new().with_standard_pipeline(dispatcher)
    }

    /// Returns true if a handler is registered for `R`.
    pub fn handles<R: Request>(&self) -> bool {
        self.pipelines.contains_key(&TypeId::of::<R>())
    }

    /// Names of the behaviors wrapping `R`, outermost first.
    pub fn behaviors_for<R: Request>(&self) -> Vec<&'static str> {
        self.pipelines
            .get(&TypeId::of::<R>())
            .map(|p| p.behaviors.iter().map(|b| b.name()).collect())
            .unwrap_or_default()
    }

    /// Executes a request.
    ///
    /// Every execution gets its own context and unit of work; nothing a
    /// failed request enlisted can leak into a later commit.
    pub async fn execute<R: Request>(&self, request: R) -> Result<OperationResult<R::Output>> {
        let Some(pipeline) = self.pipelines.get(&TypeId::of::<R>()) else {
            return Err(MediatorError::HandlerNotFound { request: R::name() });
        };

        let ctx = RequestContext::new();
        let next = Next::new(&pipeline.behaviors, pipeline.handler.as_ref());
        let result = next.run(RequestEnvelope::new(request), &ctx).await?;

        let name = pipeline.descriptor.name;
        result.try_map(|payload| {
            payload
                .downcast::<R::Output>()
                .map(|output| *output)
                .map_err(|_| MediatorError::ResponseTypeMismatch { request: name })
        })
    }
}

impl std::fmt::Debug for Mediator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut requests: Vec<_> = self.pipelines.values().map(|p| p.descriptor.name).collect();
        requests.sort_unstable();
        f.debug_struct("Mediator").field("requests", &requests).finish()
    }
}
