use chrono::{DateTime, Utc};
use domain::UnitOfWork;
use uuid::Uuid;

/// Per-execution state shared by the pipeline and the handler.
///
/// A fresh context, with its own unit of work, is created for every
/// `Mediator::execute` call and dropped when it returns.
pub struct RequestContext {
    request_id: Uuid,
    started_at: DateTime<Utc>,
    unit_of_work: UnitOfWork,
}

impl RequestContext {
    pub(crate) fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            started_at: Utc::now(),
            unit_of_work: UnitOfWork::new(),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// The unit of work tracking entities touched by this request.
    pub fn unit_of_work(&self) -> &UnitOfWork {
        &self.unit_of_work
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}
