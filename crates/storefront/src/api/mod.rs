//! HTTP client for the shop API.
//!
//! # Architecture
//!
//! - Plain JSON over `reqwest` 0.13; every path is relative to the configured
//!   base URL (e.g. `http://localhost:8081/api`)
//! - The API is the source of truth: no local persistence beyond the catalog
//!   cache, which lives in memory via `moka`
//! - Authenticated calls carry `Authorization: Bearer <token>`; the token is
//!   passed per call so one client can serve any session
//!
//! # Endpoints
//!
//! | Call                     | Method | Path                      |
//! |--------------------------|--------|---------------------------|
//! | [`ApiClient::login`]     | POST   | `/auth/login`             |
//! | [`ApiClient::register`]  | POST   | `/auth/register`          |
//! | products                 | GET    | `/products`               |
//! | categories               | GET    | `/products/categories`    |
//! | low stock                | GET    | `/products/low-stock`     |
//! | out of stock             | GET    | `/products/out-of-stock`  |
//! | submit order             | POST   | `/orders/checkout`        |
//! | user orders              | GET    | `/orders/user`            |

mod cache;
mod gateway;
pub mod types;

pub use gateway::{AuthGateway, CatalogGateway, OrderGateway};
pub use types::*;

use std::sync::Arc;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::config::ApiConfig;

use cache::{CacheKey, CacheValue};

/// Header carrying the client-generated id of a checkout attempt.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Errors that can occur when talking to the shop API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection refused, timeout, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The API answered 401.
    #[error("unauthorized{}", format_message(.message.as_deref()))]
    Unauthorized {
        /// Message from the response body, if any.
        message: Option<String>,
    },

    /// The API answered with another non-success status.
    #[error("API returned HTTP {status}{}", format_message(.message.as_deref()))]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message from the response body, if any.
        message: Option<String>,
    },

    /// The API answered 2xx but reported `success: false`.
    #[error("request rejected{}", format_message(.0.as_deref()))]
    Rejected(Option<String>),

    /// The request was abandoned because its flow was closed.
    #[error("request cancelled")]
    Cancelled,
}

fn format_message(message: Option<&str>) -> String {
    message.map_or_else(String::new, |m| format!(": {m}"))
}

fn with_bearer(request: reqwest::RequestBuilder, token: &SecretString) -> reqwest::RequestBuilder {
    request.bearer_auth(token.expose_secret())
}

impl ApiError {
    /// The human-readable message the API attached to its answer, if any.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { message }
            | Self::Status { message, .. }
            | Self::Rejected(message) => message.as_deref(),
            Self::Http(_) | Self::Parse(_) | Self::Cancelled => None,
        }
    }

    /// Whether the API reported the caller as not (or no longer) signed in.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Whether the failure points at the API itself rather than the request.
    #[must_use]
    pub const fn is_server_fault(&self) -> bool {
        match self {
            Self::Parse(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the shop API.
///
/// Cheap to clone; clones share the connection pool and the catalog cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<CacheKey, CacheValue>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("shopfront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
                cache,
            }),
        })
    }

    /// Base URL every path is appended to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Send a request and decode its JSON body.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&response_text)
                .ok()
                .and_then(|body| body.message);

            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(ApiError::Unauthorized { message });
            }

            tracing::warn!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "API returned non-success status"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse API response"
            );
            ApiError::Parse(e)
        })
    }

    // =========================================================================
    // Auth Methods
    // =========================================================================

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for bad credentials, or another
    /// variant if the request fails.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let request = self
            .inner
            .client
            .post(self.url("/auth/login"))
            .json(&LoginRequest { email, password });
        self.execute(request).await
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the registration or the request
    /// fails.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, ApiError> {
        let request = self
            .inner
            .client
            .post(self.url("/auth/register"))
            .json(&RegisterRequest {
                name,
                email,
                password,
            });
        self.execute(request).await
    }

    // =========================================================================
    // Catalog Methods
    // =========================================================================

    /// All products. Cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn get_products(&self) -> Result<Vec<Product>, ApiError> {
        if let Some(CacheValue::Products(products)) =
            self.inner.cache.get(&CacheKey::Products).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let products: Vec<Product> = self
            .execute(self.inner.client.get(self.url("/products")))
            .await?;

        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Category slugs. Cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn get_categories(&self) -> Result<Vec<String>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories: Vec<String> = self
            .execute(self.inner.client.get(self.url("/products/categories")))
            .await?;

        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(categories.clone()),
            )
            .await;

        Ok(categories)
    }

    /// Drop cached catalog data so the next read hits the API.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
    }

    async fn get_product_alerts(&self, path: &str) -> Result<Vec<Product>, ApiError> {
        let envelope: ProductsEnvelope = self
            .execute(self.inner.client.get(self.url(path)))
            .await?;
        if !envelope.success {
            return Err(ApiError::Rejected(envelope.message));
        }
        Ok(envelope.products)
    }

    /// Products running low on stock. Not cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API reports failure.
    #[instrument(skip(self))]
    pub async fn get_low_stock(&self) -> Result<Vec<Product>, ApiError> {
        self.get_product_alerts("/products/low-stock").await
    }

    /// Products with no stock left. Not cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API reports failure.
    #[instrument(skip(self))]
    pub async fn get_out_of_stock(&self) -> Result<Vec<Product>, ApiError> {
        self.get_product_alerts("/products/out-of-stock").await
    }

    // =========================================================================
    // Order Methods (not cached)
    // =========================================================================

    /// Submit a checkout on behalf of the token's user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` if the API declines the order,
    /// `ApiError::Unauthorized` if the token is no longer valid, or another
    /// variant if the request fails.
    #[instrument(skip(self, token, request), fields(items = request.cart_items.len()))]
    pub async fn checkout(
        &self,
        token: &SecretString,
        request: &CheckoutRequest,
        request_id: Uuid,
    ) -> Result<OrderConfirmation, ApiError> {
        let builder = self
            .inner
            .client
            .post(self.url("/orders/checkout"))
            .header(REQUEST_ID_HEADER, request_id.to_string())
            .json(request);

        let response: CheckoutResponse = self.execute(with_bearer(builder, token)).await?;

        match response {
            CheckoutResponse {
                success: true,
                order: Some(order),
                ..
            } => Ok(order),
            CheckoutResponse { message, .. } => Err(ApiError::Rejected(message)),
        }
    }

    /// Orders placed by the token's user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if the token is no longer valid, or
    /// another variant if the request fails.
    #[instrument(skip(self, token))]
    pub async fn get_user_orders(&self, token: &SecretString) -> Result<Vec<Order>, ApiError> {
        let builder = self.inner.client.get(self.url("/orders/user"));
        let envelope: OrdersEnvelope = self.execute(with_bearer(builder, token)).await?;
        if !envelope.success {
            return Err(ApiError::Rejected(envelope.message));
        }
        Ok(envelope.orders)
    }
}

impl AuthGateway for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        Self::login(self, email, password).await
    }

    async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, ApiError> {
        Self::register(self, name, email, password).await
    }
}

impl CatalogGateway for ApiClient {
    async fn products(&self) -> Result<Vec<Product>, ApiError> {
        self.get_products().await
    }

    async fn categories(&self) -> Result<Vec<String>, ApiError> {
        self.get_categories().await
    }

    async fn low_stock(&self) -> Result<Vec<Product>, ApiError> {
        self.get_low_stock().await
    }

    async fn out_of_stock(&self) -> Result<Vec<Product>, ApiError> {
        self.get_out_of_stock().await
    }
}

impl OrderGateway for ApiClient {
    async fn submit_order(
        &self,
        token: &SecretString,
        request: &CheckoutRequest,
        request_id: Uuid,
    ) -> Result<OrderConfirmation, ApiError> {
        self.checkout(token, request, request_id).await
    }

    async fn user_orders(&self, token: &SecretString) -> Result<Vec<Order>, ApiError> {
        self.get_user_orders(token).await
    }
}
