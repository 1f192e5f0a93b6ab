use std::sync::Arc;

use async_trait::async_trait;
use common::OperationResult;
use dispatch::EventDispatcher;

use crate::{ErasedResult, Next, PipelineBehavior, RequestContext, RequestEnvelope, Result};

/// Commits the request's unit of work and dispatches its events.
///
/// Runs innermost, closest to the handler:
///
/// 1. the handler runs;
/// 2. a failure result is returned as is, nothing is persisted;
/// 3. every enlisted entity is persisted, a concurrency conflict becomes a
///    `conflict` result and any other fault propagates;
/// 4. after a successful commit the drained events go to the dispatcher.
///    Failures to collect the events, and subscriber failures, are logged
///    and never change the result.
pub struct UnitOfWorkBehavior {
    dispatcher: Arc<EventDispatcher>,
}

impl UnitOfWorkBehavior {
    pub fn new(dispatcher: Arc<EventDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl PipelineBehavior for UnitOfWorkBehavior {
    fn name(&self) -> &'static str {
        "unit_of_work"
    }

    async fn handle(
        &self,
        request: RequestEnvelope,
        ctx: &RequestContext,
        next: Next<'_>,
    ) -> Result<ErasedResult> {
        let result = next.run(request, ctx).await?;
        if result.is_failure() {
            tracing::debug!(status = result.status_name(), "handler failed, skipping commit");
            metrics::counter!("unit_of_work_commits_total", "outcome" => "skipped").increment(1);
            return Ok(result);
        }

        let uow = ctx.unit_of_work();
        if let Err(e) = uow.commit().await {
            if e.is_concurrency_conflict() {
                tracing::info!(error = %e, "commit rejected by concurrency check");
                metrics::counter!("unit_of_work_commits_total", "outcome" => "conflict").increment(1);
                return Ok(OperationResult::conflict(e.to_string()));
            }
            tracing::error!(error = %e, "commit failed");
            metrics::counter!("unit_of_work_commits_total", "outcome" => "failed").increment(1);
            return Err(e.into());
        }
        metrics::counter!("unit_of_work_commits_total", "outcome" => "committed").increment(1);

        let events = match uow.collect_and_clear_events().await {
            Ok(events) => events,
            Err(e) => {
                tracing::error!(error = %e, "committed events could not be collected");
                metrics::counter!("unit_of_work_drain_failures_total").increment(1);
                return Ok(result);
            }
        };
        if !events.is_empty() {
            let report = self.dispatcher.dispatch_all(&events).await;
            tracing::debug!(
                events = events.len(),
                delivered = report.delivered,
                failures = report.failures.len(),
                "events dispatched"
            );
        }

        Ok(result)
    }
}
