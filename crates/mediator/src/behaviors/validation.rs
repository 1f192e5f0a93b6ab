use async_trait::async_trait;
use common::OperationResult;

use crate::{ErasedResult, Next, PipelineBehavior, RequestContext, RequestEnvelope, Result};

/// Rejects invalid requests with `bad_request` before anything else runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationBehavior;

#[async_trait]
impl PipelineBehavior for ValidationBehavior {
    fn name(&self) -> &'static str {
        "validation"
    }

    async fn handle(
        &self,
        request: RequestEnvelope,
        ctx: &RequestContext,
        next: Next<'_>,
    ) -> Result<ErasedResult> {
        if let Err(errors) = request.validate() {
            tracing::debug!(
                request = request.descriptor().name,
                %errors,
                "request rejected by validation"
            );
            return Ok(OperationResult::bad_request(errors.to_string()));
        }
        next.run(request, ctx).await
    }
}
