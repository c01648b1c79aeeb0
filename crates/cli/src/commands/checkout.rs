//! Place an order from a YAML order file.
//!
//! ```yaml
//! items:
//!   - productId: 3
//!     quantity: 2
//! shipping:
//!   phone: "5512345678"
//!   address: Av. Reforma 222
//!   city: CDMX
//!   state: CDMX
//!   postalCode: "06600"
//! payment:
//!   paymentMethod: CREDIT_CARD
//!   cardNumber: "4111 1111 1111 1111"
//!   cardHolderName: Ana Pérez
//!   expiryMonth: "12"
//!   expiryYear: "2030"
//!   cvv: "123"
//! ```
//!
//! Shipping name and email default to the signed-in user's.

use std::path::Path;

use serde::Deserialize;
use shopfront_core::ProductId;
use shopfront_storefront::checkout::{CheckoutFlow, CheckoutStep, PaymentInfo, ShippingInfo};
use shopfront_storefront::error::AppError;
use shopfront_storefront::scope::FlowScope;
use shopfront_storefront::session::FileSessionStore;
use shopfront_storefront::state::Storefront;

use super::CliError;

/// An order as written in the order file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFile {
    pub items: Vec<OrderFileItem>,
    #[serde(default)]
    pub shipping: ShippingInfo,
    #[serde(default)]
    pub payment: PaymentInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFileItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl OrderFile {
    /// Read and parse an order file.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Io` or `CliError::Yaml`.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    /// Quantity per product, in first-listed order. Repeated products add up.
    #[must_use]
    pub fn quantities(&self) -> Vec<(ProductId, u32)> {
        let mut merged: Vec<(ProductId, u32)> = Vec::with_capacity(self.items.len());
        for item in &self.items {
            match merged.iter_mut().find(|(id, _)| *id == item.product_id) {
                Some((_, quantity)) => *quantity = quantity.saturating_add(item.quantity),
                None => merged.push((item.product_id, item.quantity)),
            }
        }
        merged
    }
}

/// Copy the order's details into `flow` and walk it to the review step.
///
/// Blank shipping name and email keep the values prefilled from the
/// session. Returns the step the flow stopped at.
pub fn fill(flow: &mut CheckoutFlow, order: &OrderFile) -> CheckoutStep {
    let prefilled = flow.shipping().clone();
    let shipping = flow.shipping_mut();
    *shipping = order.shipping.clone();
    if shipping.name.trim().is_empty() {
        shipping.name = prefilled.name;
    }
    if shipping.email.trim().is_empty() {
        shipping.email = prefilled.email;
    }
    *flow.payment_mut() = order.payment.clone();

    while matches!(flow.step(), CheckoutStep::Shipping | CheckoutStep::Payment) {
        let before = flow.step();
        if flow.advance() == before {
            break;
        }
    }
    flow.step()
}

/// Build the cart from the order file, review it, and submit.
#[allow(clippy::print_stdout)]
pub async fn run(
    storefront: &mut Storefront<FileSessionStore>,
    path: &Path,
    scope: &FlowScope,
) -> Result<(), CliError> {
    let order = OrderFile::load(path)?;
    if !storefront.session().is_authenticated() {
        return Err(AppError::NotSignedIn.into());
    }

    let listing = storefront.load_listing(scope).await?;
    for (product_id, quantity) in order.quantities() {
        let product = listing
            .products()
            .iter()
            .find(|p| p.id == product_id)
            .ok_or(CliError::UnknownProduct(product_id))?;
        storefront.add_to_cart(product);
        storefront
            .cart_mut()
            .set_quantity(product.id, i64::from(quantity));
    }

    let mut flow = storefront.open_checkout();
    if fill(&mut flow, &order) != CheckoutStep::Review {
        for (field, message) in flow.errors().iter() {
            println!("  {field}: {message}");
        }
        return Err(CliError::Invalid(flow.errors().len()));
    }

    let totals = flow.totals(storefront.cart());
    for line in storefront.cart().lines() {
        println!(
            "{} x {:<40} {:>12}",
            line.quantity,
            line.name,
            line.line_total().to_string()
        );
    }
    println!("Subtotal {:>12}", totals.subtotal.to_string());
    println!("Shipping {:>12}", totals.shipping_cost.to_string());
    println!("Tax      {:>12}", totals.tax.to_string());
    println!("Total    {:>12}", totals.total.to_string());
    println!("Payment  {}", flow.payment().method);

    let confirmation = storefront.submit_checkout(&mut flow, scope).await?;
    println!(
        "Order {} placed: {} ({})",
        confirmation.order_number, confirmation.total_amount, confirmation.status
    );
    Ok(())
}
