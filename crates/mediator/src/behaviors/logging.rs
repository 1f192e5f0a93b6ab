use std::time::Instant;

use async_trait::async_trait;
use tracing::Instrument;

use crate::{ErasedResult, Next, PipelineBehavior, RequestContext, RequestEnvelope, Result};

/// Opens a span per request and records its outcome and duration.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingBehavior;

#[async_trait]
impl PipelineBehavior for LoggingBehavior {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn handle(
        &self,
        request: RequestEnvelope,
        ctx: &RequestContext,
        next: Next<'_>,
    ) -> Result<ErasedResult> {
        let descriptor = *request.descriptor();
        let span = tracing::info_span!(
            "request",
            request = descriptor.name,
            kind = descriptor.kind.as_str(),
            request_id = %ctx.request_id(),
        );

        async move {
            let start = Instant::now();
            tracing::debug!("handling request");
            let result = next.run(request, ctx).await;
            let elapsed = start.elapsed();

            let outcome = match &result {
                Ok(r) if r.is_success() => {
                    tracing::info!(status = r.status_name(), elapsed_ms = elapsed.as_millis() as u64, "request succeeded");
                    r.status_name()
                }
                Ok(r) => {
                    tracing::info!(
                        status = r.status_name(),
                        message = r.message().unwrap_or_default(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "request failed"
                    );
                    r.status_name()
                }
                Err(e) => {
                    tracing::error!(error = %e, elapsed_ms = elapsed.as_millis() as u64, "request errored");
                    "error"
                }
            };

            metrics::counter!(
                "mediator_requests_total",
                "request" => descriptor.name,
                "outcome" => outcome
            )
            .increment(1);
            metrics::histogram!("mediator_request_duration_seconds", "request" => descriptor.name)
                .record(elapsed.as_secs_f64());

            result
        }
        .instrument(span)
        .await
    }
}
