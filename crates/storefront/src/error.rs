//! Unified error handling with Sentry integration.
//!
//! Every flow surfaces failures as one general message chosen here;
//! [`AppError::user_message`] never shows transport or parse details. Faults
//! on the API side are captured to Sentry by [`AppError::report`].

use thiserror::Error;

use crate::api::ApiError;
use crate::checkout::{EMPTY_CART_MESSAGE, SIGN_IN_REQUIRED_MESSAGE, SubmitError};
use crate::config::ConfigError;
use crate::session::{AuthError, StoreError};

const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";
const CONNECTION_MESSAGE: &str = "Connection error. Check that the server is running.";
const CANCELLED_MESSAGE: &str = "Request cancelled";

/// The user-facing flow an API call was made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Catalog,
    Checkout,
    Orders,
    Inventory,
}

impl Flow {
    /// Message shown when the API fails without saying why.
    #[must_use]
    pub const fn failure_message(self) -> &'static str {
        match self {
            Self::Catalog => "Could not load products",
            Self::Checkout => "Could not process the order",
            Self::Orders => "Could not load your orders",
            Self::Inventory => "Could not load inventory data",
        }
    }
}

/// The one message a flow shows for a failed API call.
#[must_use]
pub fn general_message(flow: Flow, error: &ApiError) -> String {
    match error {
        ApiError::Unauthorized { .. } => SESSION_EXPIRED_MESSAGE.to_string(),
        ApiError::Cancelled => CANCELLED_MESSAGE.to_string(),
        ApiError::Http(_) => CONNECTION_MESSAGE.to_string(),
        other => other
            .server_message()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| flow.failure_message())
            .to_string(),
    }
}

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// An API call failed.
    #[error("{flow:?} request failed: {source}")]
    Api {
        flow: Flow,
        #[source]
        source: ApiError,
    },

    /// The API client could not be built.
    #[error("Could not initialize the API client: {0}")]
    Startup(#[source] ApiError),

    /// Sign-in or registration failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Checkout submission failed or was refused.
    #[error("Checkout error: {0}")]
    Submit(#[from] SubmitError),

    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// The persisted session could not be read.
    #[error("Session storage error: {0}")]
    Store(#[from] StoreError),

    /// The action needs a signed-in user.
    #[error("Not signed in")]
    NotSignedIn,

    /// The signed-in user lacks the required role.
    #[error("Forbidden: {0}")]
    Forbidden(&'static str),
}

impl AppError {
    /// Wrap an API failure for `flow`.
    #[must_use]
    pub const fn api(flow: Flow, source: ApiError) -> Self {
        Self::Api { flow, source }
    }

    /// Whether the API reported the session as expired.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        match self {
            Self::Api { source, .. } | Self::Submit(SubmitError::Api(source)) => {
                source.is_unauthorized()
            }
            _ => false,
        }
    }

    /// Message safe to show the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { flow, source } => general_message(*flow, source),
            Self::Auth(err) => err.user_message(),
            Self::Submit(err) => match err {
                SubmitError::Api(source) => general_message(Flow::Checkout, source),
                SubmitError::NotSignedIn => SIGN_IN_REQUIRED_MESSAGE.to_string(),
                SubmitError::EmptyCart => EMPTY_CART_MESSAGE.to_string(),
                SubmitError::InFlight => "Your order is already being submitted".to_string(),
                SubmitError::NotInReview => "Review your order before submitting".to_string(),
            },
            Self::Config(_) | Self::Startup(_) => "Configuration error".to_string(),
            Self::Store(_) => "Could not access the saved session".to_string(),
            Self::NotSignedIn => "Please sign in first".to_string(),
            Self::Forbidden(_) => "You do not have access to this page".to_string(),
        }
    }

    /// Log the error, capturing faults on the API side to Sentry.
    pub fn report(&self) {
        let server_fault = match self {
            Self::Api { source, .. } | Self::Submit(SubmitError::Api(source)) => {
                source.is_server_fault()
            }
            Self::Store(_) => true,
            _ => false,
        };

        if server_fault {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::warn!(error = %self, "Request failed");
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: Option<&impl ToString>, email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: user_id.map(ToString::to_string),
            email: Some(email.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "3")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
