//! Customer entity, persisted as a materialized record.

use common::EntityId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::{DomainEvent, Entity, PendingEvents};

/// Errors that can occur during customer operations.
#[derive(Debug, Error)]
pub enum CustomerError {
    #[error("Customer name is required")]
    NameRequired,

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Loyalty points must be greater than 0")]
    InvalidPoints,
}

/// Events raised by a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CustomerEvent {
    CustomerRegistered {
        customer_id: EntityId,
        name: String,
        email: String,
    },
    LoyaltyPointsAwarded {
        customer_id: EntityId,
        points: u32,
        balance: u32,
        order_id: Option<EntityId>,
    },
    CustomerRenamed {
        customer_id: EntityId,
        old_name: String,
        new_name: String,
    },
}

impl DomainEvent for CustomerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CustomerEvent::CustomerRegistered { .. } => "CustomerRegistered",
            CustomerEvent::LoyaltyPointsAwarded { .. } => "LoyaltyPointsAwarded",
            CustomerEvent::CustomerRenamed { .. } => "CustomerRenamed",
        }
    }
}

/// A customer with a loyalty balance.
///
/// Customers are not event-sourced: the record holds the current state, and
/// the events below only notify subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    id: EntityId,
    name: String,
    email: String,
    loyalty_points: u32,
    #[serde(skip)]
    pending: PendingEvents<CustomerEvent>,
}

impl PartialEq for Customer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Customer {}

impl Entity for Customer {
    type Event = CustomerEvent;

    fn entity_type() -> &'static str {
        "Customer"
    }

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn pending_events(&self) -> &PendingEvents<CustomerEvent> {
        &self.pending
    }

    fn pending_events_mut(&mut self) -> &mut PendingEvents<CustomerEvent> {
        &mut self.pending
    }
}

impl Customer {
    /// Registers a new customer.
    pub fn register(
        id: EntityId,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Result<Self, CustomerError> {
        let name = name.into();
        let email = email.into();
        validate_name(&name)?;
        if !email.contains('@') {
            return Err(CustomerError::InvalidEmail(email));
        }

        let mut customer = Self {
            id: id.clone(),
            name: name.clone(),
            email: email.clone(),
            loyalty_points: 0,
            pending: PendingEvents::default(),
        };
        customer.pending.push(CustomerEvent::CustomerRegistered {
            customer_id: id,
            name,
            email,
        });
        Ok(customer)
    }

    /// Adds loyalty points, optionally crediting the order that earned them.
    pub fn award_points(
        &mut self,
        points: u32,
        order_id: Option<EntityId>,
    ) -> Result<(), CustomerError> {
        if points == 0 {
            return Err(CustomerError::InvalidPoints);
        }

        self.loyalty_points = self.loyalty_points.saturating_add(points);
        self.pending.push(CustomerEvent::LoyaltyPointsAwarded {
            customer_id: self.id.clone(),
            points,
            balance: self.loyalty_points,
            order_id,
        });
        Ok(())
    }

    /// Changes the display name. Renaming to the current name raises nothing.
    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), CustomerError> {
        let name = name.into();
        validate_name(&name)?;
        if name == self.name {
            return Ok(());
        }

        let old_name = std::mem::replace(&mut self.name, name.clone());
        self.pending.push(CustomerEvent::CustomerRenamed {
            customer_id: self.id.clone(),
            old_name,
            new_name: name,
        });
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn loyalty_points(&self) -> u32 {
        self.loyalty_points
    }
}

fn validate_name(name: &str) -> Result<(), CustomerError> {
    if name.trim().is_empty() {
        return Err(CustomerError::NameRequired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ada() -> Customer {
        Customer::register(EntityId::from("customer-1"), "Ada", "ada@example.com").unwrap()
    }

    #[test]
    fn register_raises_event() {
        let customer = ada();
        assert_eq!(customer.loyalty_points(), 0);
        assert_eq!(customer.uncommitted_events().len(), 1);
        assert_eq!(
            customer.uncommitted_events()[0].event.event_type(),
            "CustomerRegistered"
        );
    }

    #[test]
    fn register_validates_input() {
        assert!(matches!(
            Customer::register(EntityId::new(), " ", "a@b.c"),
            Err(CustomerError::NameRequired)
        ));
        assert!(matches!(
            Customer::register(EntityId::new(), "Ada", "not-an-email"),
            Err(CustomerError::InvalidEmail(_))
        ));
    }

    #[test]
    fn award_points_accumulates() {
        let mut customer = ada();
        customer.award_points(10, None).unwrap();
        customer
            .award_points(5, Some(EntityId::from("order-1")))
            .unwrap();

        assert_eq!(customer.loyalty_points(), 15);
        match &customer.uncommitted_events()[2].event {
            CustomerEvent::LoyaltyPointsAwarded {
                balance, order_id, ..
            } => {
                assert_eq!(*balance, 15);
                assert_eq!(order_id.as_ref().map(EntityId::as_str), Some("order-1"));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(
            customer.award_points(0, None),
            Err(CustomerError::InvalidPoints)
        ));
    }

    #[test]
    fn rename_to_same_name_is_silent() {
        let mut customer = ada();
        customer.rename("Ada").unwrap();
        assert_eq!(customer.uncommitted_events().len(), 1);

        customer.rename("Ada Lovelace").unwrap();
        assert_eq!(customer.name(), "Ada Lovelace");
        assert_eq!(customer.uncommitted_events().len(), 2);
    }

    #[test]
    fn serialized_form_excludes_event_buffer() {
        let customer = ada();
        let value = serde_json::to_value(&customer).unwrap();
        assert!(value.get("pending").is_none());

        let restored: Customer = serde_json::from_value(value).unwrap();
        assert_eq!(restored, customer);
        assert!(restored.uncommitted_events().is_empty());
    }
}
