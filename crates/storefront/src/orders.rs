//! Order history for the signed-in user.

use tracing::{info, instrument};

use crate::api::{Order, OrderGateway};
use crate::error::{AppError, Flow};
use crate::scope::FlowScope;
use crate::session::{AuthSession, SessionStore};

/// Fetch the signed-in user's orders, newest first as the API lists them.
///
/// No request is made without a session.
///
/// # Errors
///
/// Returns `AppError::NotSignedIn` without a session, or `AppError::Api`
/// if the request fails.
#[instrument(skip_all)]
pub async fn fetch_order_history<S: SessionStore, G: OrderGateway>(
    session: &AuthSession<S>,
    gateway: &G,
    scope: &FlowScope,
) -> Result<Vec<Order>, AppError> {
    let token = match session.token() {
        Some(token) if session.is_authenticated() => token,
        _ => return Err(AppError::NotSignedIn),
    };

    let orders = scope
        .run(gateway.user_orders(token))
        .await
        .map_err(|e| AppError::api(Flow::Orders, e))?;

    info!(orders = orders.len(), "Order history loaded");
    Ok(orders)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use secrecy::{ExposeSecret, SecretString};
    use shopfront_core::{Money, OrderId, OrderStatus, UserRole};
    use uuid::Uuid;

    use super::*;
    use crate::api::{
        ApiError, AuthGateway, AuthResponse, CheckoutRequest, OrderConfirmation, UserProfile,
    };
    use crate::session::MemorySessionStore;

    struct FakeOrders {
        calls: AtomicUsize,
        expire: bool,
    }

    impl OrderGateway for FakeOrders {
        async fn submit_order(
            &self,
            _token: &SecretString,
            _request: &CheckoutRequest,
            _request_id: Uuid,
        ) -> Result<OrderConfirmation, ApiError> {
            Err(ApiError::Cancelled)
        }

        async fn user_orders(&self, token: &SecretString) -> Result<Vec<Order>, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(token.expose_secret(), "tok");
            if self.expire {
                return Err(ApiError::Unauthorized { message: None });
            }
            let order: Order = serde_json::from_value(serde_json::json!({
                "id": 1,
                "orderNumber": "ORD-1",
                "status": "SHIPPED",
                "totalAmount": "151.78"
            }))
            .unwrap();
            Ok(vec![order])
        }
    }

    struct Accept;

    impl AuthGateway for Accept {
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
            _email: &str,
            _password: &str,
        ) -> Result<AuthResponse, ApiError> {
            unreachable!("not used")
        }
    }

    #[tokio::test]
    async fn test_no_session_makes_no_request() {
        let session = AuthSession::restore(MemorySessionStore::new()).unwrap();
        let gateway = FakeOrders {
            calls: AtomicUsize::new(0),
            expire: false,
        };
        let err = fetch_order_history(&session, &gateway, &FlowScope::new("orders"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotSignedIn));
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetches_with_token() {
        let mut session = AuthSession::restore(MemorySessionStore::new()).unwrap();
        session.login(&Accept, "ana@example.com", "x").await.unwrap();
        let gateway = FakeOrders {
            calls: AtomicUsize::new(0),
            expire: false,
        };

        let orders = fetch_order_history(&session, &gateway, &FlowScope::new("orders"))
            .await
            .unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id, OrderId::new(1));
        assert_eq!(orders[0].status, OrderStatus::Shipped);
        assert_eq!(orders[0].total_amount, Money::parse("151.78").unwrap());
    }

    #[tokio::test]
    async fn test_expired_token_is_flagged() {
        let mut session = AuthSession::restore(MemorySessionStore::new()).unwrap();
        session.login(&Accept, "ana@example.com", "x").await.unwrap();
        let gateway = FakeOrders {
            calls: AtomicUsize::new(0),
            expire: true,
        };

        let err = fetch_order_history(&session, &gateway, &FlowScope::new("orders"))
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
    }
}
