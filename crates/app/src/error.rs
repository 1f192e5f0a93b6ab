//! Application error type.

use thiserror::Error;

use crate::config::ConfigError;

/// Failures that stop the application from starting or running.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Store(#[from] event_store::StoreError),

    #[error("Mediator error: {0}")]
    Mediator(#[from] mediator::MediatorError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] dispatch::DispatchError),

    #[error("Metrics exporter error: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// A demo step did not end the way it should.
    #[error("Unexpected outcome: {0}")]
    Unexpected(String),
}
