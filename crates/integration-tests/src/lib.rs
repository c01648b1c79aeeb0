//! Integration tests for Shopfront.
//!
//! [`FakeShop`] serves the shop API on an ephemeral local port so the real
//! [`ApiClient`] can be driven end to end.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopfront-integration-tests
//! ```
//!
//! # Fake accounts
//!
//! - Any email signs in with [`VALID_PASSWORD`]
//! - Emails starting with `admin` get the `ADMIN` role
//! - [`TAKEN_EMAIL`] cannot register

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use shopfront_storefront::api::{ApiClient, REQUEST_ID_HEADER};
use shopfront_storefront::config::ApiConfig;
use shopfront_storefront::session::{AuthSession, FileSessionStore};
use shopfront_storefront::state::Storefront;
use url::Url;

pub const VALID_PASSWORD: &str = "secret123";
pub const TOKEN: &str = "token-123";
pub const TAKEN_EMAIL: &str = "taken@example.com";

/// One `POST /orders/checkout` as the fake received it.
#[derive(Debug, Clone)]
pub struct RecordedCheckout {
    pub request_id: Option<String>,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Debug, Default)]
struct ShopState {
    expired: bool,
    reject_checkout: Option<String>,
    checkouts: Vec<RecordedCheckout>,
    product_requests: usize,
    alert_requests: usize,
}

type Shared = Arc<Mutex<ShopState>>;

/// A fake shop API running in the background.
pub struct FakeShop {
    base_url: Url,
    state: Shared,
}

impl FakeShop {
    /// Bind to an ephemeral port and start serving.
    pub async fn start() -> Self {
        let state = Shared::default();
        let api = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/register", post(register))
            .route("/products", get(products))
            .route("/products/categories", get(categories))
            .route("/products/low-stock", get(low_stock))
            .route("/products/out-of-stock", get(out_of_stock))
            .route("/orders/checkout", post(checkout))
            .route("/orders/user", get(user_orders))
            .with_state(state.clone());
        let app = Router::new().nest("/api", api);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake shop");
        let addr = listener.local_addr().expect("Failed to read local address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let base_url = Url::parse(&format!("http://{addr}/api")).expect("Invalid fake shop URL");
        Self { base_url, state }
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// A client for this shop.
    #[must_use]
    pub fn client(&self) -> ApiClient {
        ApiClient::new(&ApiConfig::new(self.base_url.clone())).expect("Failed to build API client")
    }

    /// A storefront with its session persisted under `session_dir`.
    #[must_use]
    pub fn storefront(&self, session_dir: &Path) -> Storefront<FileSessionStore> {
        let session = AuthSession::restore(FileSessionStore::new(session_dir))
            .expect("Failed to restore session");
        Storefront::new(self.client(), session)
    }

    /// Make every authenticated call answer 401 from now on.
    pub fn expire_tokens(&self) {
        self.lock().expired = true;
    }

    /// Decline checkouts with `message`.
    pub fn reject_checkouts(&self, message: &str) {
        self.lock().reject_checkout = Some(message.to_string());
    }

    #[must_use]
    pub fn checkouts(&self) -> Vec<RecordedCheckout> {
        self.lock().checkouts.clone()
    }

    /// Times `GET /products` was served.
    #[must_use]
    pub fn product_requests(&self) -> usize {
        self.lock().product_requests
    }

    /// Times either inventory alert endpoint was served.
    #[must_use]
    pub fn alert_requests(&self) -> usize {
        self.lock().alert_requests
    }

    fn lock(&self) -> MutexGuard<'_, ShopState> {
        lock(&self.state)
    }
}

/// A fresh directory for one test's persisted session.
#[must_use]
pub fn session_dir() -> PathBuf {
    std::env::temp_dir().join(format!("shopfront-it-{}", uuid::Uuid::new_v4()))
}

fn lock(state: &Shared) -> MutexGuard<'_, ShopState> {
    state.lock().expect("Fake shop state poisoned")
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn is_authorized(state: &Shared, headers: &HeaderMap) -> bool {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    !lock(state).expired && bearer == Some(TOKEN)
}

fn auth_response(name: &str, email: &str) -> Response {
    let role = if email.starts_with("admin") { "ADMIN" } else { "USER" };
    Json(json!({
        "token": TOKEN,
        "user": { "id": 1, "name": name, "email": email, "role": role },
        "message": "Login successful"
    }))
    .into_response()
}

async fn login(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    if body["password"].as_str() != Some(VALID_PASSWORD) {
        return error(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }
    auth_response("Ana", email)
}

async fn register(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    if email == TAKEN_EMAIL {
        return error(StatusCode::BAD_REQUEST, "Email already registered");
    }
    auth_response(body["name"].as_str().unwrap_or_default(), email)
}

fn catalog() -> Value {
    json!([
        { "id": 1, "name": "Mouse", "description": "Wireless", "price": "45.50",
          "stock": 3, "category": "accessories" },
        { "id": 2, "name": "Laptop Pro", "description": null, "price": "1299.99",
          "stock": 0, "category": "laptops", "imageUrl": "laptop.png" },
        { "id": 3, "name": "Álbum", "description": "Fotos", "price": 12,
          "stock": 40, "category": "home" }
    ])
}

async fn products(State(state): State<Shared>) -> Json<Value> {
    lock(&state).product_requests += 1;
    Json(catalog())
}

async fn categories() -> Json<Value> {
    Json(json!(["accessories", "laptops", "home"]))
}

async fn low_stock(State(state): State<Shared>) -> Json<Value> {
    lock(&state).alert_requests += 1;
    Json(json!({ "success": true, "products": [catalog()[0].clone()] }))
}

async fn out_of_stock(State(state): State<Shared>) -> Json<Value> {
    lock(&state).alert_requests += 1;
    Json(json!({ "success": true, "products": [catalog()[1].clone()] }))
}

async fn checkout(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !is_authorized(&state, &headers) {
        return error(StatusCode::UNAUTHORIZED, "Token expired");
    }

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let total = body["paymentInfo"]["totalAmount"].clone();
    let mut shop = lock(&state);
    shop.checkouts.push(RecordedCheckout {
        request_id: header(REQUEST_ID_HEADER),
        authorization: header("authorization"),
        body,
    });

    if let Some(message) = &shop.reject_checkout {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "message": message })),
        )
            .into_response();
    }

    let order_number = format!("ORD-{}", 1000 + shop.checkouts.len());
    Json(json!({
        "success": true,
        "message": "Order created",
        "order": { "orderNumber": order_number, "totalAmount": total, "status": "PENDING" }
    }))
    .into_response()
}

async fn user_orders(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !is_authorized(&state, &headers) {
        return error(StatusCode::UNAUTHORIZED, "Token expired");
    }
    Json(json!({
        "success": true,
        "orders": [{
            "id": 7,
            "orderNumber": "ORD-1000",
            "status": "DELIVERED",
            "totalAmount": "151.78",
            "subtotal": "45.50",
            "shippingCost": "99.00",
            "taxAmount": "7.28",
            "createdAt": "2026-09-01T10:30:00",
            "shippingInfo": null,
            "paymentInfo": { "paymentMethod": "BANK_TRANSFER", "paymentStatus": "PAID" },
            "items": [{
                "productId": 1, "productName": "Mouse", "quantity": 1,
                "unitPrice": "45.50", "totalPrice": "45.50"
            }]
        }]
    }))
    .into_response()
}
