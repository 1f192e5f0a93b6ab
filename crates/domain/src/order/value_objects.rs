//! Products, prices and order lines.

use serde::{Deserialize, Serialize};

/// Catalogue code of a product, e.g. `LATTE`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// An amount in cents.
///
/// Arithmetic is checked: callers that accept amounts from outside decide
/// what an overflow means, and replay of already-accepted events saturates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    cents: i64,
}

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Whole currency units, truncated.
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.cents.checked_add(other.cents).map(Money::from_cents)
    }

    /// Price of `quantity` units, or None on overflow.
    pub fn checked_times(self, quantity: u32) -> Option<Money> {
        self.cents
            .checked_mul(i64::from(quantity))
            .map(Money::from_cents)
    }

    pub fn saturating_add(self, other: Money) -> Money {
        Money::from_cents(self.cents.saturating_add(other.cents))
    }

    pub fn saturating_sub(self, other: Money) -> Money {
        Money::from_cents(self.cents.saturating_sub(other.cents))
    }

    pub fn saturating_times(self, quantity: u32) -> Money {
        Money::from_cents(self.cents.saturating_mul(i64::from(quantity)))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let cents = self.cents.unsigned_abs();
        write!(f, "{sign}${}.{:02}", cents / 100, cents % 100)
    }
}

/// One product line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderItem {
    pub fn new(
        product_id: impl Into<ProductId>,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }

    /// Quantity times unit price, or None on overflow.
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_times(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_formats_as_currency() {
        assert_eq!(Money::from_cents(1225).to_string(), "$12.25");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-450).to_string(), "-$4.50");
    }

    #[test]
    fn dollars_truncate_cents() {
        assert_eq!(Money::from_cents(1225).dollars(), 12);
        assert_eq!(Money::from_cents(99).dollars(), 0);
    }

    #[test]
    fn checked_arithmetic_reports_overflow() {
        let latte = Money::from_cents(450);
        assert_eq!(latte.checked_times(3), Some(Money::from_cents(1350)));
        assert_eq!(latte.checked_add(latte), Some(Money::from_cents(900)));

        let huge = Money::from_cents(i64::MAX / 2);
        assert_eq!(huge.checked_times(4), None);
        assert_eq!(huge.checked_add(huge).and_then(|m| m.checked_add(huge)), None);
    }

    #[test]
    fn saturating_arithmetic_clamps() {
        let huge = Money::from_cents(i64::MAX / 2);
        assert_eq!(huge.saturating_times(4).cents(), i64::MAX);
        assert_eq!(
            Money::from_cents(i64::MAX).saturating_add(Money::from_cents(1)).cents(),
            i64::MAX
        );
        assert_eq!(
            Money::from_cents(300).saturating_sub(Money::from_cents(450)),
            Money::from_cents(-150)
        );
    }

    #[test]
    fn line_total_multiplies_unit_price() {
        let scones = OrderItem::new("SCONE", "Scone", 3, Money::from_cents(325));
        assert_eq!(scones.line_total(), Some(Money::from_cents(975)));
        assert_eq!(scones.product_id.to_string(), "SCONE");

        let absurd = OrderItem::new("GOLD", "Gold leaf", u32::MAX, Money::from_cents(i64::MAX));
        assert_eq!(absurd.line_total(), None);
    }
}
