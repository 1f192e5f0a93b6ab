//! Customer commands and queries.

use async_trait::async_trait;
use common::{EntityId, OperationResult};
use domain::{Customer, Entity, StateRepository};
use mediator::{Request, RequestContext, RequestHandler, RequestKind, Result, ValidationErrors};
use serde::Serialize;

use super::customer_failure;

#[derive(Debug, Clone)]
pub struct RegisterCustomer {
    pub customer_id: Option<String>,
    pub name: String,
    pub email: String,
}

impl Request for RegisterCustomer {
    type Output = String;
    const KIND: RequestKind = RequestKind::Command;

    fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(!self.name.trim().is_empty(), "name", "is required");
        errors.check(self.email.contains('@'), "email", "must be an email address");
        errors.into_result()
    }
}

#[derive(Debug, Clone)]
pub struct RenameCustomer {
    pub customer_id: String,
    pub name: String,
}

impl Request for RenameCustomer {
    type Output = ();
    const KIND: RequestKind = RequestKind::Command;
}

#[derive(Debug, Clone)]
pub struct GetCustomer {
    pub customer_id: String,
}

impl Request for GetCustomer {
    type Output = CustomerView;
    const KIND: RequestKind = RequestKind::Query;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub loyalty_points: u32,
}

impl From<&Customer> for CustomerView {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id().to_string(),
            name: customer.name().to_string(),
            email: customer.email().to_string(),
            loyalty_points: customer.loyalty_points(),
        }
    }
}

#[derive(Clone)]
pub struct CustomerHandlers {
    customers: StateRepository<Customer>,
}

impl CustomerHandlers {
    pub fn new(customers: StateRepository<Customer>) -> Self {
        Self { customers }
    }
}

fn customer_not_found<T>(customer_id: &str) -> OperationResult<T> {
    OperationResult::not_found(format!("Customer {customer_id} not found"))
}

#[async_trait]
impl RequestHandler<RegisterCustomer> for CustomerHandlers {
    #[tracing::instrument(skip(self, request, ctx))]
    async fn handle(
        &self,
        request: RegisterCustomer,
        ctx: &RequestContext,
    ) -> Result<OperationResult<String>> {
        let uow = ctx.unit_of_work();
        let id = request
            .customer_id
            .as_deref()
            .map(EntityId::from)
            .unwrap_or_default();

        if self.customers.get_by_id(uow, &id).await?.is_some() {
            return Ok(OperationResult::conflict(format!(
                "Customer {id} is already registered"
            )));
        }

        let customer = match Customer::register(id.clone(), request.name, request.email) {
            Ok(customer) => customer,
            Err(e) => return Ok(customer_failure(e)),
        };
        self.customers.add(uow, customer).await?;
        Ok(OperationResult::created(id.to_string()))
    }
}

#[async_trait]
impl RequestHandler<RenameCustomer> for CustomerHandlers {
    #[tracing::instrument(skip(self, request, ctx), fields(customer_id = %request.customer_id))]
    async fn handle(
        &self,
        request: RenameCustomer,
        ctx: &RequestContext,
    ) -> Result<OperationResult<()>> {
        let id = EntityId::from(request.customer_id.as_str());
        let Some(customer) = self.customers.get_by_id(ctx.unit_of_work(), &id).await? else {
            return Ok(customer_not_found(&request.customer_id));
        };
        if let Err(e) = customer.write().await.rename(request.name) {
            return Ok(customer_failure(e));
        }
        Ok(OperationResult::ok_empty())
    }
}

#[async_trait]
impl RequestHandler<GetCustomer> for CustomerHandlers {
    async fn handle(
        &self,
        request: GetCustomer,
        ctx: &RequestContext,
    ) -> Result<OperationResult<CustomerView>> {
        let id = EntityId::from(request.customer_id.as_str());
        let Some(customer) = self.customers.get_by_id(ctx.unit_of_work(), &id).await? else {
            return Ok(customer_not_found(&request.customer_id));
        };
        let view = CustomerView::from(&*customer.read().await);
        Ok(OperationResult::ok(view))
    }
}
