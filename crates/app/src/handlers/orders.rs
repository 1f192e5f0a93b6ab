//! Order commands and queries.

use async_trait::async_trait;
use common::{EntityId, OperationResult};
use domain::{
    AggregateRoot, Customer, Entity, EventSourcedRepository, Money, Order, OrderItem, ProductId,
    StateRepository, Tracked, UnitOfWork,
};
use mediator::{Request, RequestContext, RequestHandler, RequestKind, Result, ValidationErrors};
use serde::{Deserialize, Serialize};

use super::{customer_failure, order_failure};

/// One line of an order as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemLine {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

impl ItemLine {
    pub fn new(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price_cents: i64,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            quantity,
            unit_price_cents,
        }
    }

    fn check(&self, errors: &mut ValidationErrors) {
        errors.check(!self.product_id.trim().is_empty(), "product_id", "is required");
        errors.check(self.quantity > 0, "quantity", "must be greater than 0");
        errors.check(self.unit_price_cents > 0, "unit_price_cents", "must be greater than 0");
    }

    fn to_item(&self) -> OrderItem {
        OrderItem::new(
            self.product_id.as_str(),
            self.product_name.as_str(),
            self.quantity,
            Money::from_cents(self.unit_price_cents),
        )
    }
}

/// Read-side shape of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderView {
    pub id: String,
    pub customer_id: Option<String>,
    pub state: String,
    pub items: Vec<ItemLine>,
    pub total_cents: i64,
    pub version: i64,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            customer_id: order.customer_id().map(ToString::to_string),
            state: order.state().to_string(),
            items: order
                .items()
                .map(|item| ItemLine {
                    product_id: item.product_id.to_string(),
                    product_name: item.product_name.clone(),
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price.cents(),
                })
                .collect(),
            total_cents: order.total_amount().cents(),
            version: order.version().as_i64(),
        }
    }
}

/// Places a new order, optionally with its first items.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    /// Caller-chosen id; a new one is generated when absent.
    pub order_id: Option<String>,
    pub customer_id: String,
    pub items: Vec<ItemLine>,
}

impl Request for PlaceOrder {
    type Output = String;
    const KIND: RequestKind = RequestKind::Command;

    fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(!self.customer_id.trim().is_empty(), "customer_id", "is required");
        if let Some(id) = &self.order_id {
            errors.check(!id.trim().is_empty(), "order_id", "must not be blank");
        }
        for item in &self.items {
            item.check(&mut errors);
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone)]
pub struct AddItem {
    pub order_id: String,
    pub item: ItemLine,
}

impl Request for AddItem {
    type Output = OrderView;
    const KIND: RequestKind = RequestKind::Command;

    fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        self.item.check(&mut errors);
        errors.into_result()
    }
}

#[derive(Debug, Clone)]
pub struct RemoveItem {
    pub order_id: String,
    pub product_id: String,
}

impl Request for RemoveItem {
    type Output = OrderView;
    const KIND: RequestKind = RequestKind::Command;
}

#[derive(Debug, Clone)]
pub struct MarkOrderReady {
    pub order_id: String,
}

impl Request for MarkOrderReady {
    type Output = ();
    const KIND: RequestKind = RequestKind::Command;
}

/// Hands the order over and credits the customer one loyalty point per
/// whole currency unit charged.
#[derive(Debug, Clone)]
pub struct CompleteOrder {
    pub order_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedOrder {
    pub order_id: String,
    pub total_cents: i64,
    /// Zero when the customer has no record.
    pub points_awarded: u32,
}

impl Request for CompleteOrder {
    type Output = CompletedOrder;
    const KIND: RequestKind = RequestKind::Command;
}

#[derive(Debug, Clone)]
pub struct CancelOrder {
    pub order_id: String,
    pub reason: String,
}

impl Request for CancelOrder {
    type Output = ();
    const KIND: RequestKind = RequestKind::Command;

    fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(!self.reason.trim().is_empty(), "reason", "is required");
        errors.into_result()
    }
}

#[derive(Debug, Clone)]
pub struct GetOrder {
    pub order_id: String,
}

impl Request for GetOrder {
    type Output = OrderView;
    const KIND: RequestKind = RequestKind::Query;
}

/// Handles every order request.
#[derive(Clone)]
pub struct OrderHandlers {
    orders: EventSourcedRepository<Order>,
    customers: StateRepository<Customer>,
}

impl OrderHandlers {
    pub fn new(orders: EventSourcedRepository<Order>, customers: StateRepository<Customer>) -> Self {
        Self { orders, customers }
    }

    async fn load(&self, uow: &UnitOfWork, order_id: &str) -> Result<Option<Tracked<Order>>> {
        Ok(self
            .orders
            .get_by_id(uow, &EntityId::from(order_id))
            .await?)
    }
}

fn order_not_found<T>(order_id: &str) -> OperationResult<T> {
    OperationResult::not_found(format!("Order {order_id} not found"))
}

#[async_trait]
impl RequestHandler<PlaceOrder> for OrderHandlers {
    #[tracing::instrument(skip(self, request, ctx), fields(customer_id = %request.customer_id))]
    async fn handle(
        &self,
        request: PlaceOrder,
        ctx: &RequestContext,
    ) -> Result<OperationResult<String>> {
        let uow = ctx.unit_of_work();
        let id = request
            .order_id
            .as_deref()
            .map(EntityId::from)
            .unwrap_or_default();

        if self.orders.get_by_id(uow, &id).await?.is_some() {
            return Ok(OperationResult::conflict(format!("Order {id} already exists")));
        }

        let mut order = match Order::place(id.clone(), EntityId::from(request.customer_id)) {
            Ok(order) => order,
            Err(e) => return Ok(order_failure(e)),
        };
        for line in &request.items {
            if let Err(e) = order.add_item(line.to_item()) {
                return Ok(order_failure(e));
            }
        }

        self.orders.add(uow, order).await?;
        tracing::info!(order_id = %id, items = request.items.len(), "order placed");
        Ok(OperationResult::created(id.to_string()))
    }
}

#[async_trait]
impl RequestHandler<AddItem> for OrderHandlers {
    #[tracing::instrument(skip(self, request, ctx), fields(order_id = %request.order_id))]
    async fn handle(&self, request: AddItem, ctx: &RequestContext) -> Result<OperationResult<OrderView>> {
        let Some(order) = self.load(ctx.unit_of_work(), &request.order_id).await? else {
            return Ok(order_not_found(&request.order_id));
        };
        let mut order = order.write().await;
        if let Err(e) = order.add_item(request.item.to_item()) {
            return Ok(order_failure(e));
        }
        Ok(OperationResult::ok(OrderView::from(&*order)))
    }
}

#[async_trait]
impl RequestHandler<RemoveItem> for OrderHandlers {
    #[tracing::instrument(skip(self, request, ctx), fields(order_id = %request.order_id))]
    async fn handle(
        &self,
        request: RemoveItem,
        ctx: &RequestContext,
    ) -> Result<OperationResult<OrderView>> {
        let Some(order) = self.load(ctx.unit_of_work(), &request.order_id).await? else {
            return Ok(order_not_found(&request.order_id));
        };
        let mut order = order.write().await;
        if let Err(e) = order.remove_item(ProductId::new(request.product_id)) {
            return Ok(order_failure(e));
        }
        Ok(OperationResult::ok(OrderView::from(&*order)))
    }
}

#[async_trait]
impl RequestHandler<MarkOrderReady> for OrderHandlers {
    #[tracing::instrument(skip(self, request, ctx), fields(order_id = %request.order_id))]
    async fn handle(
        &self,
        request: MarkOrderReady,
        ctx: &RequestContext,
    ) -> Result<OperationResult<()>> {
        let Some(order) = self.load(ctx.unit_of_work(), &request.order_id).await? else {
            return Ok(order_not_found(&request.order_id));
        };
        if let Err(e) = order.write().await.mark_ready() {
            return Ok(order_failure(e));
        }
        Ok(OperationResult::accepted())
    }
}

#[async_trait]
impl RequestHandler<CompleteOrder> for OrderHandlers {
    #[tracing::instrument(skip(self, request, ctx), fields(order_id = %request.order_id))]
    async fn handle(
        &self,
        request: CompleteOrder,
        ctx: &RequestContext,
    ) -> Result<OperationResult<CompletedOrder>> {
        let uow = ctx.unit_of_work();
        let Some(order) = self.load(uow, &request.order_id).await? else {
            return Ok(order_not_found(&request.order_id));
        };

        let (order_id, customer_id, total) = {
            let mut order = order.write().await;
            if let Err(e) = order.complete() {
                return Ok(order_failure(e));
            }
            (
                order.id().clone(),
                order.customer_id().cloned(),
                order.total_amount(),
            )
        };

        let points = u32::try_from(total.dollars()).unwrap_or(0);
        let mut points_awarded = 0;
        if points > 0
            && let Some(customer_id) = customer_id
            && let Some(customer) = self.customers.get_by_id(uow, &customer_id).await?
        {
            if let Err(e) = customer
                .write()
                .await
                .award_points(points, Some(order_id.clone()))
            {
                return Ok(customer_failure(e));
            }
            points_awarded = points;
        }

        Ok(OperationResult::ok(CompletedOrder {
            order_id: order_id.to_string(),
            total_cents: total.cents(),
            points_awarded,
        }))
    }
}

#[async_trait]
impl RequestHandler<CancelOrder> for OrderHandlers {
    #[tracing::instrument(skip(self, request, ctx), fields(order_id = %request.order_id))]
    async fn handle(&self, request: CancelOrder, ctx: &RequestContext) -> Result<OperationResult<()>> {
        let Some(order) = self.load(ctx.unit_of_work(), &request.order_id).await? else {
            return Ok(order_not_found(&request.order_id));
        };
        if let Err(e) = order.write().await.cancel(request.reason) {
            return Ok(order_failure(e));
        }
        Ok(OperationResult::ok_empty())
    }
}

#[async_trait]
impl RequestHandler<GetOrder> for OrderHandlers {
    async fn handle(&self, request: GetOrder, ctx: &RequestContext) -> Result<OperationResult<OrderView>> {
        let Some(order) = self.load(ctx.unit_of_work(), &request.order_id).await? else {
            return Ok(order_not_found(&request.order_id));
        };
        let view = OrderView::from(&*order.read().await);
        Ok(OperationResult::ok(view))
    }
}
