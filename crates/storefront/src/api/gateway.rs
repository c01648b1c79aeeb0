//! Seams between the storefront flows and the remote API.
//!
//! Flows are generic over these traits so they can be driven against
//! [`ApiClient`](super::ApiClient) in production and against in-memory fakes
//! in tests.

use std::future::Future;

use secrecy::SecretString;
use uuid::Uuid;

use super::ApiError;
use super::types::{AuthResponse, CheckoutRequest, Order, OrderConfirmation, Product};

/// Sign-in and registration.
pub trait AuthGateway {
    /// Exchange credentials for a token and profile.
    fn login(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthResponse, ApiError>> + Send;

    /// Create an account and sign in.
    fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthResponse, ApiError>> + Send;
}

/// Public catalog and inventory reads.
pub trait CatalogGateway {
    /// All products.
    fn products(&self) -> impl Future<Output = Result<Vec<Product>, ApiError>> + Send;

    /// Category slugs, as the API lists them.
    fn categories(&self) -> impl Future<Output = Result<Vec<String>, ApiError>> + Send;

    /// Products running low on stock.
    fn low_stock(&self) -> impl Future<Output = Result<Vec<Product>, ApiError>> + Send;

    /// Products with no stock left.
    fn out_of_stock(&self) -> impl Future<Output = Result<Vec<Product>, ApiError>> + Send;
}

/// Authenticated order submission and history.
pub trait OrderGateway {
    /// Submit a checkout. `request_id` is sent so retries can be correlated.
    fn submit_order(
        &self,
        token: &SecretString,
        request: &CheckoutRequest,
        request_id: Uuid,
    ) -> impl Future<Output = Result<OrderConfirmation, ApiError>> + Send;

    /// Orders placed by the token's user.
    fn user_orders(
        &self,
        token: &SecretString,
    ) -> impl Future<Output = Result<Vec<Order>, ApiError>> + Send;
}
