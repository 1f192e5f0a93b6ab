//! Type-erased pipeline: envelopes, behaviors and continuations.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use common::OperationResult;

use crate::{
    MediatorError, Request, RequestContext, RequestDescriptor, RequestHandler, Result,
    ValidationErrors,
};

/// Outcome of a pipeline stage with the payload type erased.
pub type ErasedResult = OperationResult<Box<dyn Any + Send>>;

trait AnyRequest: Send {
    fn validate(&self) -> std::result::Result<(), ValidationErrors>;
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<R: Request> AnyRequest for R {
    fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        Request::validate(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// A request travelling through the pipeline.
pub struct RequestEnvelope {
    descriptor: RequestDescriptor,
    request: Box<dyn AnyRequest>,
}

impl RequestEnvelope {
    pub fn new<R: Request>(request: R) -> Self {
        Self {
            descriptor: RequestDescriptor::of::<R>(),
            request: Box::new(request),
        }
    }

    pub fn descriptor(&self) -> &RequestDescriptor {
        &self.descriptor
    }

    /// Runs the request's own validation.
    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        self.request.validate()
    }

    /// Borrows the request as its concrete type.
    pub fn downcast_ref<R: Request>(&self) -> Option<&R> {
        self.request.as_any().downcast_ref::<R>()
    }

    /// Unwraps the request as its concrete type.
    pub fn downcast<R: Request>(self) -> Result<R> {
        self.request
            .into_any()
            .downcast::<R>()
            .map(|request| *request)
            .map_err(|_| MediatorError::RequestTypeMismatch {
                expected: R::name(),
            })
    }
}

impl std::fmt::Debug for RequestEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestEnvelope")
            .field("request", &self.descriptor.name)
            .field("kind", &self.descriptor.kind)
            .finish()
    }
}

/// A cross-cutting stage wrapped around handler invocation.
///
/// A behavior may inspect the request, call `next` or return without
/// calling it, and inspect or replace the result. Errors from `next`
/// propagate outward unless the behavior handles them.
#[async_trait]
pub trait PipelineBehavior: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this behavior wraps requests of the given type.
    ///
    /// Evaluated once per request type when the mediator is built.
    fn applies_to(&self, _descriptor: &RequestDescriptor) -> bool {
        true
    }

    async fn handle(
        &self,
        request: RequestEnvelope,
        ctx: &RequestContext,
        next: Next<'_>,
    ) -> Result<ErasedResult>;
}

/// The rest of the pipeline: inner behaviors, then the handler.
pub struct Next<'a> {
    behaviors: &'a [Arc<dyn PipelineBehavior>],
    handler: &'a dyn ErasedHandler,
}

impl<'a> Next<'a> {
    pub(crate) fn new(
        behaviors: &'a [Arc<dyn PipelineBehavior>],
        handler: &'a dyn ErasedHandler,
    ) -> Self {
        Self { behaviors, handler }
    }

    /// Invokes the next stage.
    pub async fn run(self, request: RequestEnvelope, ctx: &RequestContext) -> Result<ErasedResult> {
        match self.behaviors.split_first() {
            Some((behavior, rest)) => {
                behavior
                    .handle(request, ctx, Next::new(rest, self.handler))
                    .await
            }
            None => self.handler.handle(request, ctx).await,
        }
    }
}

#[async_trait]
pub(crate) trait ErasedHandler: Send + Sync {
    async fn handle(&self, request: RequestEnvelope, ctx: &RequestContext)
    -> Result<ErasedResult>;
}

/// Adapts a typed handler to the erased pipeline.
pub(crate) struct HandlerAdapter<R, H> {
    handler: H,
    _request: PhantomData<fn(R)>,
}

impl<R, H> HandlerAdapter<R, H> {
    pub(crate) fn new(handler: H) -> Self {
        Self {
            handler,
            _request: PhantomData,
        }
    }
}

#[async_trait]
impl<R, H> ErasedHandler for HandlerAdapter<R, H>
where
    R: Request,
    H: RequestHandler<R>,
{
    async fn handle(
        &self,
        request: RequestEnvelope,
        ctx: &RequestContext,
    ) -> Result<ErasedResult> {
        let request = request.downcast::<R>()?;
        let result = self.handler.handle(request, ctx).await?;
        Ok(result.map(|payload| Box::new(payload) as Box<dyn Any + Send>))
    }
}
