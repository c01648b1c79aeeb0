//! Wire types for the shop API.
//!
//! Field names follow the API's camelCase JSON. Nullable strings collapse to
//! empty strings via [`nullable`] so one missing column never fails a whole
//! listing.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

use shopfront_core::{Money, OrderId, OrderStatus, PaymentStatus, ProductId, UserId, UserRole};

use crate::checkout::{PaymentInfo, ShippingInfo};

/// Deserialize `null` as the type's default.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// Catalog Types
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product ID.
    pub id: ProductId,
    /// Display name.
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    /// Plain text description.
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    /// Unit price.
    pub price: Money,
    /// Units in stock.
    #[serde(default, deserialize_with = "nullable")]
    pub stock: i32,
    /// Image URL.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Category slug (e.g. `laptops`).
    #[serde(default)]
    pub category: Option<String>,
}

/// Envelope returned by the inventory endpoints.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProductsEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub products: Vec<Product>,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Auth Types
// =============================================================================

/// Profile of the signed-in user, as cached in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// User ID.
    #[serde(default)]
    pub id: Option<UserId>,
    /// Display name.
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    /// Email address.
    #[serde(default, deserialize_with = "nullable")]
    pub email: String,
    /// Role.
    #[serde(default, deserialize_with = "nullable")]
    pub role: UserRole,
}

/// Body of `POST /auth/login`.
#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body of `POST /auth/register`.
#[derive(Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Response of the auth endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    /// Bearer token.
    #[serde(default)]
    pub token: Option<String>,
    /// Signed-in user.
    #[serde(default)]
    pub user: Option<UserProfile>,
    /// Human-readable message (present on failures).
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Checkout Types
// =============================================================================

/// A cart line as sent to the checkout endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    /// Product ID.
    pub product_id: ProductId,
    /// Quantity (at least 1).
    pub quantity: u32,
    /// Unit price the client priced the line with.
    pub price: Money,
}

/// Payment section of the checkout body: the form plus the client total.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayment {
    /// Form fields.
    #[serde(flatten)]
    pub info: PaymentInfo,
    /// Total the client displayed at review time.
    pub total_amount: Money,
}

/// Body of `POST /orders/checkout`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Lines being purchased.
    pub cart_items: Vec<CheckoutItem>,
    /// Delivery address and contact.
    pub shipping_info: ShippingInfo,
    /// Payment method and card details.
    pub payment_info: CheckoutPayment,
}

/// Order summary returned once the API accepts a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    /// Human-facing order number (e.g. `ORD-1718000000000`).
    pub order_number: String,
    /// Total charged.
    pub total_amount: Money,
    /// Current status.
    #[serde(default)]
    pub status: OrderStatus,
}

/// Response of `POST /orders/checkout`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CheckoutResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub order: Option<OrderConfirmation>,
}

// =============================================================================
// Order History Types
// =============================================================================

/// Shipping details recorded on an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderShipping {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub email: String,
    #[serde(deserialize_with = "nullable")]
    pub phone: String,
    #[serde(deserialize_with = "nullable")]
    pub address: String,
    #[serde(deserialize_with = "nullable")]
    pub city: String,
    #[serde(deserialize_with = "nullable")]
    pub state: String,
    #[serde(deserialize_with = "nullable")]
    pub postal_code: String,
    #[serde(deserialize_with = "nullable")]
    pub country: String,
}

/// Payment details recorded on an order.
///
/// The method is kept as the raw wire string: the API knows methods the
/// checkout form does not offer (e.g. `BANK_TRANSFER`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderPayment {
    #[serde(deserialize_with = "nullable")]
    pub payment_method: String,
    pub payment_status: Option<PaymentStatus>,
    pub transaction_id: Option<String>,
}

/// One line of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    #[serde(default, deserialize_with = "nullable")]
    pub product_name: String,
    #[serde(default)]
    pub product_image_url: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
}

/// A placed order, as listed in the user's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    #[serde(default)]
    pub status: OrderStatus,
    pub total_amount: Money,
    #[serde(default)]
    pub subtotal: Option<Money>,
    #[serde(default)]
    pub shipping_cost: Option<Money>,
    #[serde(default)]
    pub tax_amount: Option<Money>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub estimated_delivery: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "nullable")]
    pub shipping_info: OrderShipping,
    #[serde(default, deserialize_with = "nullable")]
    pub payment_info: OrderPayment,
    #[serde(default, deserialize_with = "nullable")]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Response of `GET /orders/user`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OrdersEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Error body shape shared by all endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}
