//! Order service entry point.

use app::config::Config;
use app::error::AppError;
use app::{App, Stores, demo, telemetry};
use dispatch::ReadModel;
use domain::OrderState;
use tokio::signal;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, shutting down");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, shutting down");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Configuration and telemetry
    let config = Config::from_env()?;
    telemetry::init_tracing(&config)?;
    let metrics_handle = telemetry::install_metrics(&config)?;

    // 2. Stores and wiring
    let stores = Stores::from_config(&config).await?;
    let app = App::build(stores)?;

    // 3. Rebuild read models from whatever the store already holds
    app.catch_up().await?;

    // 4. Walk-through
    let summary = demo::run(&app).await?;
    tracing::info!(
        order_id = %summary.order_id,
        events = ?summary.event_types,
        loyalty_points = summary.loyalty_points,
        race_conflicts = summary.race_conflicts,
        "walk-through complete"
    );
    tracing::info!(
        open_orders = app.board.count(),
        placed = app.board.orders_in_state(OrderState::Placed).await.len(),
        ready = app.board.orders_in_state(OrderState::Ready).await.len(),
        kitchen_notifications = app.kitchen.notifications().await.len(),
        "read models"
    );

    // 5. Keep serving metrics until asked to stop, or print the snapshot
    if config.metrics_addr.is_some() {
        shutdown_signal().await;
    } else {
        tracing::info!(metrics = %metrics_handle.render(), "metrics snapshot");
    }

    Ok(())
}
