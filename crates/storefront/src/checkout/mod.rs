//! Multi-step checkout.
//!
//! # Steps
//!
//! ```text
//! Shipping -> Payment -> Review -> Confirmed
//!    ^           |  ^        |
//!    +-----------+  +--------+   (back)
//! ```
//!
//! Opening the flow without a signed-in session lands in the terminal
//! [`CheckoutStep::AuthenticationRequired`] step instead.
//!
//! The flow only owns its form state. The cart, the session and the order
//! gateway are passed into each call that needs them, and totals are derived
//! from the cart on every request so the review screen and the submitted
//! order always agree.
//!
//! Submission runs in three phases so a front end can keep rendering while
//! the request is in flight: [`CheckoutFlow::begin_submit`] freezes the
//! draft and marks the flow as submitting, [`PendingSubmission::send`] talks
//! to the API without borrowing the flow, and [`CheckoutFlow::finish_submit`]
//! applies the outcome. [`CheckoutFlow::submit_order`] chains the three.
//! The flow counts as submitting for as long as the pending submission or
//! its outcome is alive, so dropping either one ends the submission.

use std::sync::{Arc, Weak};

mod totals;
mod validation;

pub use totals::{OrderTotals, PricingPolicy};
pub use validation::{DEFAULT_COUNTRY, Field, FieldErrors, PaymentInfo, ShippingInfo};

use secrecy::SecretString;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::{
    ApiError, CheckoutItem, CheckoutPayment, CheckoutRequest, OrderConfirmation, OrderGateway,
};
use crate::cart::{CartLine, CartStore};
use crate::error::{Flow, general_message};
use crate::scope::FlowScope;
use crate::session::{AuthSession, SessionStore};

/// General message for a submit attempted without a session.
pub const SIGN_IN_REQUIRED_MESSAGE: &str = "You must sign in to complete the purchase";

/// General message for a submit attempted with an empty cart.
pub const EMPTY_CART_MESSAGE: &str = "Your cart is empty";

/// Where the checkout currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckoutStep {
    /// Opened without a session. Terminal.
    AuthenticationRequired,
    Shipping,
    Payment,
    Review,
    /// Order accepted. Terminal.
    Confirmed,
}

impl CheckoutStep {
    /// 1-based position in the wizard, if the step is one of the four stages.
    #[must_use]
    pub const fn number(self) -> Option<u8> {
        match self {
            Self::Shipping => Some(1),
            Self::Payment => Some(2),
            Self::Review => Some(3),
            Self::Confirmed => Some(4),
            Self::AuthenticationRequired => None,
        }
    }
}

/// Why a submission was refused or failed.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("orders can only be submitted from the review step")]
    NotInReview,

    #[error("a submission is already in flight")]
    InFlight,

    #[error("not signed in")]
    NotSignedIn,

    #[error("cart is empty")]
    EmptyCart,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Everything that goes into an order, assembled at submission time.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub lines: Vec<CartLine>,
    pub shipping: ShippingInfo,
    pub payment: PaymentInfo,
    pub totals: OrderTotals,
}

impl OrderDraft {
    /// Wire body for `POST /orders/checkout`.
    #[must_use]
    pub fn to_request(&self) -> CheckoutRequest {
        CheckoutRequest {
            cart_items: self
                .lines
                .iter()
                .map(|line| CheckoutItem {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    price: line.unit_price,
                })
                .collect(),
            shipping_info: self.shipping.clone(),
            payment_info: CheckoutPayment {
                info: self.payment.clone(),
                total_amount: self.totals.total,
            },
        }
    }
}

/// A frozen order on its way to the API.
#[must_use = "a pending submission does nothing until sent and finished"]
#[derive(Debug)]
pub struct PendingSubmission {
    request_id: Uuid,
    token: SecretString,
    request: CheckoutRequest,
    in_flight: Arc<()>,
}

impl PendingSubmission {
    /// Id sent as `X-Request-Id`.
    pub const fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub const fn request(&self) -> &CheckoutRequest {
        &self.request
    }

    /// Send the order. Never touches the flow or the cart.
    pub async fn send<G: OrderGateway>(self, gateway: &G, scope: &FlowScope) -> SubmissionOutcome {
        let result = scope
            .run(gateway.submit_order(&self.token, &self.request, self.request_id))
            .await;
        SubmissionOutcome {
            request_id: self.request_id,
            result,
            in_flight: self.in_flight,
        }
    }
}

/// What the API made of a [`PendingSubmission`].
#[derive(Debug)]
pub struct SubmissionOutcome {
    pub request_id: Uuid,
    pub result: Result<OrderConfirmation, ApiError>,
    in_flight: Arc<()>,
}

// =============================================================================
// CheckoutFlow
// =============================================================================

/// State of one checkout.
#[derive(Debug, Clone)]
pub struct CheckoutFlow {
    step: CheckoutStep,
    shipping: ShippingInfo,
    payment: PaymentInfo,
    errors: FieldErrors,
    general_error: Option<String>,
    /// Alive while a [`PendingSubmission`] or its outcome is.
    in_flight: Weak<()>,
    confirmation: Option<OrderConfirmation>,
    pricing: PricingPolicy,
}

impl CheckoutFlow {
    /// Open the flow for `session`, prefilling name and email from the
    /// signed-in user.
    pub fn open<S: SessionStore>(session: &AuthSession<S>) -> Self {
        let mut shipping = ShippingInfo::default();
        let step = match session.user() {
            Some(user) if session.is_authenticated() => {
                shipping.name.clone_from(&user.name);
                shipping.email.clone_from(&user.email);
                CheckoutStep::Shipping
            }
            _ => CheckoutStep::AuthenticationRequired,
        };
        info!(step = ?step, "Checkout opened");

        Self {
            step,
            shipping,
            payment: PaymentInfo::default(),
            errors: FieldErrors::default(),
            general_error: None,
            in_flight: Weak::new(),
            confirmation: None,
            pricing: PricingPolicy::default(),
        }
    }

    /// Use a different shipping cost and tax rate.
    #[must_use]
    pub const fn with_pricing(mut self, pricing: PricingPolicy) -> Self {
        self.pricing = pricing;
        self
    }

    // =========================================================================
    // Form state
    // =========================================================================

    #[must_use]
    pub const fn step(&self) -> CheckoutStep {
        self.step
    }

    #[must_use]
    pub const fn shipping(&self) -> &ShippingInfo {
        &self.shipping
    }

    pub const fn shipping_mut(&mut self) -> &mut ShippingInfo {
        &mut self.shipping
    }

    #[must_use]
    pub const fn payment(&self) -> &PaymentInfo {
        &self.payment
    }

    pub const fn payment_mut(&mut self) -> &mut PaymentInfo {
        &mut self.payment
    }

    /// Field errors from the last step validation.
    #[must_use]
    pub const fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// The single flow-level message (failed submit, missing session, ...).
    #[must_use]
    pub fn general_error(&self) -> Option<&str> {
        self.general_error.as_deref()
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.in_flight.strong_count() > 0
    }

    #[must_use]
    pub const fn confirmation(&self) -> Option<&OrderConfirmation> {
        self.confirmation.as_ref()
    }

    #[must_use]
    pub const fn pricing(&self) -> &PricingPolicy {
        &self.pricing
    }

    /// Totals for the cart as it is now.
    #[must_use]
    pub fn totals(&self, cart: &CartStore) -> OrderTotals {
        OrderTotals::compute(cart, &self.pricing)
    }

    /// Assemble the order from the cart and the form.
    #[must_use]
    pub fn draft(&self, cart: &CartStore) -> OrderDraft {
        OrderDraft {
            lines: cart.lines().to_vec(),
            shipping: self.shipping.clone(),
            payment: self.payment.clone(),
            totals: self.totals(cart),
        }
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Validate the current step and move forward if it passes.
    ///
    /// Returns the step the flow is in afterwards. Failures are left in
    /// [`CheckoutFlow::errors`]. Review only moves on through a submit.
    pub fn advance(&mut self) -> CheckoutStep {
        let (errors, next) = match self.step {
            CheckoutStep::Shipping => (self.shipping.validate(), CheckoutStep::Payment),
            CheckoutStep::Payment => (self.payment.validate(), CheckoutStep::Review),
            other => return other,
        };

        if errors.is_empty() {
            info!(from = ?self.step, to = ?next, "Checkout step advanced");
            self.step = next;
        } else {
            info!(step = ?self.step, failed = errors.len(), "Checkout step validation failed");
        }
        self.errors = errors;
        self.step
    }

    /// Go back one step. Only Payment and Review have a previous step.
    pub fn back(&mut self) -> CheckoutStep {
        let previous = match self.step {
            CheckoutStep::Payment => CheckoutStep::Shipping,
            CheckoutStep::Review if !self.is_submitting() => CheckoutStep::Payment,
            other => return other,
        };
        self.step = previous;
        self.errors = FieldErrors::default();
        self.step
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Freeze the current draft for sending and mark the flow as submitting.
    ///
    /// # Errors
    ///
    /// Returns `SubmitError::InFlight` while another submission is pending,
    /// `SubmitError::NotInReview` outside the review step,
    /// `SubmitError::NotSignedIn` if the session was lost (the gateway is
    /// never reached) and `SubmitError::EmptyCart` for an empty cart.
    pub fn begin_submit<S: SessionStore>(
        &mut self,
        cart: &CartStore,
        session: &AuthSession<S>,
    ) -> Result<PendingSubmission, SubmitError> {
        if self.is_submitting() {
            return Err(SubmitError::InFlight);
        }
        if self.step != CheckoutStep::Review {
            return Err(SubmitError::NotInReview);
        }

        let token = match session.token() {
            Some(token) if session.is_authenticated() => token.clone(),
            _ => {
                self.general_error = Some(SIGN_IN_REQUIRED_MESSAGE.to_string());
                return Err(SubmitError::NotSignedIn);
            }
        };
        if cart.is_empty() {
            self.general_error = Some(EMPTY_CART_MESSAGE.to_string());
            return Err(SubmitError::EmptyCart);
        }

        let request_id = Uuid::new_v4();
        let request = self.draft(cart).to_request();
        info!(%request_id, items = request.cart_items.len(), "Submitting order");

        self.general_error = None;
        let in_flight = Arc::new(());
        self.in_flight = Arc::downgrade(&in_flight);
        Ok(PendingSubmission {
            request_id,
            token,
            request,
            in_flight,
        })
    }

    /// Apply the outcome of a submission.
    ///
    /// On success the flow moves to Confirmed and the cart is cleared. On
    /// failure the flow stays in Review with one general message and the
    /// cart is left alone, so submitting again retries the same order.
    ///
    /// # Errors
    ///
    /// Returns `SubmitError::Api` carrying the failure.
    pub fn finish_submit(
        &mut self,
        cart: &mut CartStore,
        outcome: SubmissionOutcome,
    ) -> Result<&OrderConfirmation, SubmitError> {
        let SubmissionOutcome {
            request_id, result, ..
        } = outcome;
        self.in_flight = Weak::new();

        match result {
            Ok(confirmation) => {
                info!(
                    %request_id,
                    order_number = %confirmation.order_number,
                    total = %confirmation.total_amount,
                    "Order confirmed"
                );
                cart.clear();
                self.step = CheckoutStep::Confirmed;
                self.general_error = None;
                Ok(&*self.confirmation.insert(confirmation))
            }
            Err(e) => {
                warn!(%request_id, error = %e, "Order submission failed");
                self.general_error = Some(general_message(Flow::Checkout, &e));
                Err(SubmitError::Api(e))
            }
        }
    }

    /// Submit the order and apply the outcome.
    ///
    /// # Errors
    ///
    /// See [`CheckoutFlow::begin_submit`] and [`CheckoutFlow::finish_submit`].
    pub async fn submit_order<S: SessionStore, G: OrderGateway>(
        &mut self,
        cart: &mut CartStore,
        session: &AuthSession<S>,
        gateway: &G,
        scope: &FlowScope,
    ) -> Result<&OrderConfirmation, SubmitError> {
        let pending = self.begin_submit(cart, session)?;
        let outcome = pending.send(gateway, scope).await;
        self.finish_submit(cart, outcome)
    }

    /// End the flow, returning the confirmation if the order went through.
    #[must_use]
    pub fn close(self) -> Option<OrderConfirmation> {
        info!(step = ?self.step, "Checkout closed");
        self.confirmation
    }
}
