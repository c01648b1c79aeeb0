//! The storefront facade owned by a front end.
//!
//! [`Storefront`] owns the API client, the auth session and the cart, and
//! routes every API result through one place: a 401 from any call signs the
//! user out and sends the front end back to [`Screen::Landing`].

use tracing::{info, warn};

use crate::api::{
    ApiClient, AuthGateway, CatalogGateway, Order, OrderConfirmation, OrderGateway, Product,
};
use crate::cart::CartStore;
use crate::catalog::ProductListing;
use crate::checkout::CheckoutFlow;
use crate::config::StorefrontConfig;
use crate::error::{AppError, Flow, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::inventory::{InventoryReport, load_inventory_report};
use crate::orders::fetch_order_history;
use crate::scope::FlowScope;
use crate::session::{AuthSession, FileSessionStore, RegisterForm, SessionStore};

/// Which view the front end should be showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Signed out (or just expired).
    Landing,
    Catalog,
    Checkout,
    Orders,
    Inventory,
}

/// Services for one front end.
pub struct Storefront<S, G = ApiClient> {
    api: G,
    session: AuthSession<S>,
    cart: CartStore,
    screen: Screen,
}

impl Storefront<FileSessionStore> {
    /// Build the API client and restore the session persisted under
    /// `config.session_dir`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Startup` if the HTTP client cannot be built, or
    /// `AppError::Store` if the persisted session cannot be read.
    pub fn from_config(config: &StorefrontConfig) -> Result<Self, AppError> {
        let api = ApiClient::new(&config.api).map_err(AppError::Startup)?;
        let session = AuthSession::restore(FileSessionStore::new(&config.session_dir))?;
        Ok(Self::new(api, session))
    }
}

impl<S, G> Storefront<S, G>
where
    S: SessionStore,
    G: AuthGateway + CatalogGateway + OrderGateway,
{
    #[must_use]
    pub fn new(api: G, session: AuthSession<S>) -> Self {
        let screen = if session.is_authenticated() {
            Screen::Catalog
        } else {
            Screen::Landing
        };
        if let Some(user) = session.user() {
            set_sentry_user(user.id.as_ref(), &user.email);
        }
        Self {
            api,
            session,
            cart: CartStore::new(),
            screen,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[must_use]
    pub const fn api(&self) -> &G {
        &self.api
    }

    #[must_use]
    pub const fn session(&self) -> &AuthSession<S> {
        &self.session
    }

    #[must_use]
    pub const fn cart(&self) -> &CartStore {
        &self.cart
    }

    pub const fn cart_mut(&mut self) -> &mut CartStore {
        &mut self.cart
    }

    #[must_use]
    pub const fn screen(&self) -> Screen {
        self.screen
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Sign in.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Auth` if sign-in fails; the session is unchanged.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<(), AppError> {
        let user = self.session.login(&self.api, email, password).await?;
        set_sentry_user(user.id.as_ref(), &user.email);
        self.screen = Screen::Catalog;
        Ok(())
    }

    /// Create an account and sign in.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Auth` if the form is invalid or registration
    /// fails; the session is unchanged.
    pub async fn register(&mut self, form: &RegisterForm) -> Result<(), AppError> {
        let user = self.session.register(&self.api, form).await?;
        set_sentry_user(user.id.as_ref(), &user.email);
        self.screen = Screen::Catalog;
        Ok(())
    }

    /// Sign out. The cart is kept.
    pub fn logout(&mut self) {
        self.session.logout();
        clear_sentry_user();
        self.screen = Screen::Landing;
    }

    // =========================================================================
    // Flows
    // =========================================================================

    /// Add one unit of `product` to the cart.
    pub fn add_to_cart(&mut self, product: &Product) {
        self.cart.add_item(product);
        let product_id = product.id.to_string();
        add_breadcrumb("cart", "Added item", Some(&[("product_id", product_id.as_str())]));
    }

    /// Load the product listing.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Api` if either fetch fails.
    pub async fn load_listing(&mut self, scope: &FlowScope) -> Result<ProductListing, AppError> {
        let result = ProductListing::load(&self.api, scope)
            .await
            .map_err(|e| AppError::api(Flow::Catalog, e));
        let listing = self.settle(result)?;
        self.screen = Screen::Catalog;
        Ok(listing)
    }

    /// Load the signed-in user's orders.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotSignedIn` without a session, or `AppError::Api`
    /// if the request fails.
    pub async fn order_history(&mut self, scope: &FlowScope) -> Result<Vec<Order>, AppError> {
        let result = fetch_order_history(&self.session, &self.api, scope).await;
        let orders = self.settle(result)?;
        self.screen = Screen::Orders;
        Ok(orders)
    }

    /// Load the admin inventory report.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotSignedIn`, `AppError::Forbidden` or
    /// `AppError::Api`.
    pub async fn inventory_report(&mut self, scope: &FlowScope) -> Result<InventoryReport, AppError> {
        let result = load_inventory_report(&self.session, &self.api, scope).await;
        let report = self.settle(result)?;
        self.screen = Screen::Inventory;
        Ok(report)
    }

    /// Start a checkout for the current session.
    pub fn open_checkout(&mut self) -> CheckoutFlow {
        self.screen = Screen::Checkout;
        CheckoutFlow::open(&self.session)
    }

    /// Submit `flow` using this storefront's cart, session and API.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Submit` if the order is refused or fails; the cart
    /// is unchanged in that case.
    pub async fn submit_checkout(
        &mut self,
        flow: &mut CheckoutFlow,
        scope: &FlowScope,
    ) -> Result<OrderConfirmation, AppError> {
        let result = flow
            .submit_order(&mut self.cart, &self.session, &self.api, scope)
            .await
            .cloned()
            .map_err(AppError::from);
        self.settle(result)
    }

    /// Tear the session down if `result` reports it expired.
    fn settle<T>(&mut self, result: Result<T, AppError>) -> Result<T, AppError> {
        if let Err(e) = &result
            && e.is_unauthorized()
        {
            warn!("API rejected the session token; signing out");
            self.logout();
            info!("Returned to landing");
        }
        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use secrecy::SecretString;
    use shopfront_core::{Money, OrderStatus, PaymentMethod, ProductId, UserRole};
    use uuid::Uuid;

    use super::*;
    use crate::api::{ApiError, AuthResponse, CheckoutRequest, UserProfile};
    use crate::checkout::CheckoutStep;
    use crate::session::{MemorySessionStore, keys};

    /// One fake for every gateway; `expired` makes authenticated calls 401.
    #[derive(Default)]
    struct FakeApi {
        expired: Mutex<bool>,
    }

    fn product() -> Product {
        Product {
            id: ProductId::new(1),
            name: "Mouse".to_string(),
            description: String::new(),
            price: Money::parse("45.50").unwrap(),
            stock: 3,
            image_url: None,
            category: Some("accessories".to_string()),
        }
    }

    impl FakeApi {
        fn expired(&self) -> bool {
            *self.expired.lock().unwrap()
        }
    }

    impl AuthGateway for FakeApi {
        async fn login(&self, email: &str, _password: &str) -> Result<AuthResponse, ApiError> {
            Ok(AuthResponse {
                token: Some("tok".to_string()),
                user: Some(UserProfile {
                    id: None,
                    name: "Ana".to_string(),
                    email: email.to_string(),
                    role: UserRole::User,
                }),
                message: None,
            })
        }

        async fn register(
            &self,
            _name: &str,
            email: &str,
            password: &str,
        ) -> Result<AuthResponse, ApiError> {
            self.login(email, password).await
        }
    }

    impl CatalogGateway for FakeApi {
        async fn products(&self) -> Result<Vec<Product>, ApiError> {
            Ok(vec![product()])
        }

        async fn categories(&self) -> Result<Vec<String>, ApiError> {
            Ok(vec!["accessories".to_string()])
        }

        async fn low_stock(&self) -> Result<Vec<Product>, ApiError> {
            Ok(Vec::new())
        }

        async fn out_of_stock(&self) -> Result<Vec<Product>, ApiError> {
            Ok(Vec::new())
        }
    }

    impl OrderGateway for FakeApi {
        async fn submit_order(
            &self,
            _token: &SecretString,
            request: &CheckoutRequest,
            _request_id: Uuid,
        ) -> Result<OrderConfirmation, ApiError> {
            if self.expired() {
                return Err(ApiError::Unauthorized { message: None });
            }
            Ok(OrderConfirmation {
                order_number: "ORD-9".to_string(),
                total_amount: request.payment_info.total_amount,
                status: OrderStatus::Pending,
            })
        }

        async fn user_orders(&self, _token: &SecretString) -> Result<Vec<Order>, ApiError> {
            if self.expired() {
                return Err(ApiError::Unauthorized { message: None });
            }
            Ok(Vec::new())
        }
    }

    async fn signed_in() -> Storefront<MemorySessionStore, FakeApi> {
        let session = AuthSession::restore(MemorySessionStore::new()).unwrap();
        let mut storefront = Storefront::new(FakeApi::default(), session);
        assert_eq!(storefront.screen(), Screen::Landing);
        storefront.login("ana@example.com", "secret").await.unwrap();
        storefront
    }

    fn fill(flow: &mut CheckoutFlow) {
        let shipping = flow.shipping_mut();
        shipping.phone = "5512345678".to_string();
        shipping.address = "Av. Reforma 222".to_string();
        shipping.city = "CDMX".to_string();
        shipping.state = "CDMX".to_string();
        shipping.postal_code = "06600".to_string();
        flow.advance();
        flow.payment_mut().method = PaymentMethod::Paypal;
        flow.advance();
    }

    #[tokio::test]
    async fn test_checkout_through_facade() {
        let mut storefront = signed_in().await;
        let scope = FlowScope::new("checkout");
        let listing = storefront.load_listing(&scope).await.unwrap();
        storefront.add_to_cart(&listing.products()[0]);

        let mut flow = storefront.open_checkout();
        fill(&mut flow);
        assert_eq!(flow.step(), CheckoutStep::Review);

        let confirmation = storefront.submit_checkout(&mut flow, &scope).await.unwrap();
        assert_eq!(confirmation.total_amount, Money::parse("151.78").unwrap());
        assert!(storefront.cart().is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_submit_signs_out() {
        let mut storefront = signed_in().await;
        storefront.add_to_cart(&product());
        let mut flow = storefront.open_checkout();
        fill(&mut flow);
        *storefront.api().expired.lock().unwrap() = true;

        let err = storefront
            .submit_checkout(&mut flow, &FlowScope::new("checkout"))
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert!(!storefront.session().is_authenticated());
        assert_eq!(storefront.screen(), Screen::Landing);
        assert_eq!(storefront.cart().item_count(), 1);
        assert_eq!(flow.step(), CheckoutStep::Review);
    }

    #[tokio::test]
    async fn test_unauthorized_history_clears_persisted_session() {
        let mut storefront = signed_in().await;
        *storefront.api().expired.lock().unwrap() = true;

        storefront
            .order_history(&FlowScope::new("orders"))
            .await
            .unwrap_err();
        assert_eq!(storefront.screen(), Screen::Landing);
        assert!(storefront.session().token().is_none());
    }

    #[tokio::test]
    async fn test_restored_session_starts_on_catalog() {
        let mut store = MemorySessionStore::new();
        store.set(keys::TOKEN, "tok").unwrap();
        store
            .set(keys::USER, r#"{"name":"Ana","email":"ana@example.com","role":"USER"}"#)
            .unwrap();
        let storefront = Storefront::new(FakeApi::default(), AuthSession::restore(store).unwrap());
        assert_eq!(storefront.screen(), Screen::Catalog);
    }
}
