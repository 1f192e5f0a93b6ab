//! Walk-through run by the binary: a customer, an order taken from
//! placement to completion, and two cashiers racing on the same order.

use common::OperationResult;
use domain::EntityId;
use event_store::EventStoreExt;

use crate::App;
use crate::error::AppError;
use crate::handlers::customers::{GetCustomer, RegisterCustomer};
use crate::handlers::orders::{CancelOrder, CompleteOrder, ItemLine, MarkOrderReady, PlaceOrder};

/// What the walk-through observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoSummary {
    pub order_id: String,
    pub event_types: Vec<String>,
    pub loyalty_points: u32,
    pub race_conflicts: usize,
}

fn expect_success<T>(step: &str, result: OperationResult<T>) -> Result<Option<T>, AppError> {
    if result.is_failure() {
        return Err(AppError::Unexpected(format!(
            "{step}: {} ({})",
            result.status_name(),
            result.message().unwrap_or_default()
        )));
    }
    Ok(result.into_payload())
}

/// Runs the walk-through against a freshly built application.
pub async fn run(app: &App) -> Result<DemoSummary, AppError> {
    let mediator = &app.mediator;
    let suffix = EntityId::new();

    let customer_id = expect_success(
        "register customer",
        mediator
            .execute(RegisterCustomer {
                customer_id: None,
                name: "Ada".into(),
                email: "ada@example.com".into(),
            })
            .await?,
    )?
    .ok_or_else(|| AppError::Unexpected("register customer returned no id".into()))?;

    let order_id = format!("order-{suffix}");
    expect_success(
        "place order",
        mediator
            .execute(PlaceOrder {
                order_id: Some(order_id.clone()),
                customer_id: customer_id.clone(),
                items: vec![
                    ItemLine::new("FLAT-WHITE", "Flat white", 2, 450),
                    ItemLine::new("CROISSANT", "Croissant", 1, 325),
                ],
            })
            .await?,
    )?;
    expect_success(
        "mark ready",
        mediator
            .execute(MarkOrderReady {
                order_id: order_id.clone(),
            })
            .await?,
    )?;

    // Two cashiers act on the ready order at once: one wins
    let (complete, cancel) = tokio::join!(
        mediator.execute(CompleteOrder {
            order_id: order_id.clone(),
        }),
        mediator.execute(CancelOrder {
            order_id: order_id.clone(),
            reason: "customer left".into(),
        }),
    );
    let outcomes = [complete?.status_name(), cancel?.status_name()];
    let race_conflicts = outcomes.iter().filter(|s| **s == "conflict").count();
    tracing::info!(?outcomes, "race finished");

    let customer = expect_success(
        "get customer",
        mediator
            .execute(GetCustomer {
                customer_id: customer_id.clone(),
            })
            .await?,
    )?
    .ok_or_else(|| AppError::Unexpected("get customer returned no view".into()))?;

    let event_types = app
        .stores
        .events
        .read_full_stream(&EntityId::from(order_id.as_str()))
        .await?
        .into_iter()
        .map(|e| e.event_type)
        .collect();

    Ok(DemoSummary {
        order_id,
        event_types,
        loyalty_points: customer.loyalty_points,
        race_conflicts,
    })
}
