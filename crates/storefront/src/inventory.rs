//! Admin inventory alerts.

use tracing::{info, instrument};

use crate::api::{CatalogGateway, Product};
use crate::error::{AppError, Flow};
use crate::scope::FlowScope;
use crate::session::{AuthSession, SessionStore};

/// Products that need restocking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryReport {
    pub low_stock: Vec<Product>,
    pub out_of_stock: Vec<Product>,
}

impl InventoryReport {
    #[must_use]
    pub fn low_stock_count(&self) -> usize {
        self.low_stock.len()
    }

    #[must_use]
    pub fn out_of_stock_count(&self) -> usize {
        self.out_of_stock.len()
    }

    /// Nothing to restock.
    #[must_use]
    pub fn is_clear(&self) -> bool {
        self.low_stock.is_empty() && self.out_of_stock.is_empty()
    }
}

/// Load both alert lists concurrently. Admins only.
///
/// # Errors
///
/// Returns `AppError::NotSignedIn` or `AppError::Forbidden` before any
/// request is made, or `AppError::Api` if either fetch fails.
#[instrument(skip_all)]
pub async fn load_inventory_report<S: SessionStore, G: CatalogGateway>(
    session: &AuthSession<S>,
    gateway: &G,
    scope: &FlowScope,
) -> Result<InventoryReport, AppError> {
    if !session.is_authenticated() {
        return Err(AppError::NotSignedIn);
    }
    if !session.is_admin() {
        return Err(AppError::Forbidden("inventory alerts require the ADMIN role"));
    }

    let (low_stock, out_of_stock) =
        futures::try_join!(scope.run(gateway.low_stock()), scope.run(gateway.out_of_stock()))
            .map_err(|e| AppError::api(Flow::Inventory, e))?;

    info!(
        low_stock = low_stock.len(),
        out_of_stock = out_of_stock.len(),
        "Inventory report loaded"
    );
    Ok(InventoryReport {
        low_stock,
        out_of_stock,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopfront_core::{Money, ProductId, UserRole};

    use super::*;
    use crate::api::{ApiError, AuthGateway, AuthResponse, UserProfile};
    use crate::session::MemorySessionStore;

    fn product(id: i64, stock: i32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: String::new(),
            price: Money::from_cents(1000),
            stock,
            image_url: None,
            category: None,
        }
    }

    struct FakeInventory {
        fail_out_of_stock: bool,
    }

    impl CatalogGateway for FakeInventory {
        async fn products(&self) -> Result<Vec<Product>, ApiError> {
            Ok(Vec::new())
        }

        async fn categories(&self) -> Result<Vec<String>, ApiError> {
            Ok(Vec::new())
        }

        async fn low_stock(&self) -> Result<Vec<Product>, ApiError> {
            Ok(vec![product(1, 2), product(2, 4)])
        }

        async fn out_of_stock(&self) -> Result<Vec<Product>, ApiError> {
            if self.fail_out_of_stock {
                return Err(ApiError::Status {
                    status: 500,
                    message: None,
                });
            }
            Ok(vec![product(3, 0)])
        }
    }

    struct RoleAuth(&'static str);

    impl AuthGateway for RoleAuth {
        async fn login(&self, email: &str, _password: &str) -> Result<AuthResponse, ApiError> {
            Ok(AuthResponse {
                token: Some("tok".to_string()),
                user: Some(UserProfile {
                    id: None,
                    name: "Admin".to_string(),
                    email: email.to_string(),
                    role: UserRole::from(self.0.to_string()),
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

    async fn session_with_role(role: &'static str) -> AuthSession<MemorySessionStore> {
        let mut session = AuthSession::restore(MemorySessionStore::new()).unwrap();
        session
            .login(&RoleAuth(role), "admin@example.com", "x")
            .await
            .unwrap();
        session
    }

    #[tokio::test]
    async fn test_admin_gets_both_lists() {
        let session = session_with_role("ADMIN").await;
        let report = load_inventory_report(
            &session,
            &FakeInventory {
                fail_out_of_stock: false,
            },
            &FlowScope::new("inventory"),
        )
        .await
        .unwrap();
        assert_eq!(report.low_stock_count(), 2);
        assert_eq!(report.out_of_stock_count(), 1);
        assert!(!report.is_clear());
    }

    #[tokio::test]
    async fn test_miscased_admin_is_forbidden() {
        let session = session_with_role("admin").await;
        let err = load_inventory_report(
            &session,
            &FakeInventory {
                fail_out_of_stock: false,
            },
            &FlowScope::new("inventory"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_either_failure_gives_one_message() {
        let session = session_with_role("ADMIN").await;
        let err = load_inventory_report(
            &session,
            &FakeInventory {
                fail_out_of_stock: true,
            },
            &FlowScope::new("inventory"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.user_message(), "Could not load inventory data");
    }
}
