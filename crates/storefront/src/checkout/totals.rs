//! Order totals derived from the cart.

use rust_decimal::Decimal;

use shopfront_core::Money;

use crate::cart::CartStore;

/// Flat shipping cost and tax rate applied at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
    pub shipping_cost: Money,
    /// Fraction of the subtotal (e.g. `0.16`).
    pub tax_rate: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            shipping_cost: Money::from_cents(9900),
            tax_rate: Decimal::new(16, 2),
        }
    }
}

/// Subtotal, shipping, tax and total for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub shipping_cost: Money,
    /// Subtotal times the tax rate, rounded to cents half away from zero.
    pub tax: Money,
    pub total: Money,
}

impl OrderTotals {
    /// Compute totals for the cart's current contents.
    #[must_use]
    pub fn compute(cart: &CartStore, policy: &PricingPolicy) -> Self {
        let subtotal = cart.subtotal();
        let tax = subtotal.apply_rate(policy.tax_rate);
        Self {
            subtotal,
            shipping_cost: policy.shipping_cost,
            tax,
            total: subtotal + policy.shipping_cost + tax,
        }
    }
}
