//! Logging and metrics initialisation.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{Config, LogFormat};
use crate::error::AppError;

/// Installs the global tracing subscriber.
pub fn init_tracing(config: &Config) -> Result<(), AppError> {
    let filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| AppError::Telemetry(format!("invalid RUST_LOG directive: {e}")))?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.log_format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    };
    result.map_err(|e| AppError::Telemetry(e.to_string()))
}

/// Installs the Prometheus recorder.
///
/// With `metrics_addr` set, a scrape listener is spawned on the current
/// runtime. The handle renders the current snapshot either way.
pub fn install_metrics(config: &Config) -> Result<PrometheusHandle, AppError> {
    let Some(addr) = config.metrics_addr else {
        return Ok(PrometheusBuilder::new().install_recorder()?);
    };

    let (recorder, exporter) = PrometheusBuilder::new().with_http_listener(addr).build()?;
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder)
        .map_err(|_| AppError::Telemetry("metrics recorder already installed".to_string()))?;

    tokio::spawn(async move {
        if let Err(e) = exporter.await {
            tracing::error!(error = ?e, "metrics listener stopped");
        }
    });
    tracing::info!(%addr, "serving Prometheus metrics");
    Ok(handle)
}
