//! Checkout form data and field validation.
//!
//! [`Field`] and [`FieldErrors`] are shared with the registration form.
//!
//! Validation reports every violation at once as [`FieldErrors`]: data, not
//! an `Err`. Patterns use ASCII digit classes so only `0-9` count as digits.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use shopfront_core::{Email, PaymentMethod};

/// Country used when the form leaves it unset.
pub const DEFAULT_COUNTRY: &str = "México";

static POSTAL_CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{5}$").expect("Invalid regex"));
static CARD_NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{16}$").expect("Invalid regex"));
static CVV_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{3,4}$").expect("Invalid regex"));

// =============================================================================
// Fields and errors
// =============================================================================

/// A validated form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    Email,
    Password,
    ConfirmPassword,
    Phone,
    Address,
    City,
    State,
    PostalCode,
    CardNumber,
    CardHolderName,
    ExpiryMonth,
    ExpiryYear,
    Cvv,
}

impl Field {
    /// Wire/form key of the field (e.g. `postalCode`).
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Password => "password",
            Self::ConfirmPassword => "confirmPassword",
            Self::Phone => "phone",
            Self::Address => "address",
            Self::City => "city",
            Self::State => "state",
            Self::PostalCode => "postalCode",
            Self::CardNumber => "cardNumber",
            Self::CardHolderName => "cardHolderName",
            Self::ExpiryMonth => "expiryMonth",
            Self::ExpiryYear => "expiryYear",
            Self::Cvv => "cvv",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Validation messages keyed by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Message for `field`, if it failed.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    /// Failed fields in form order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    pub(crate) fn insert(&mut self, field: Field, message: &str) {
        self.0.insert(field, message.to_string());
    }

    pub(crate) fn require(&mut self, field: Field, value: &str, message: &str) {
        if value.trim().is_empty() {
            self.insert(field, message);
        }
    }
}

// =============================================================================
// Shipping
// =============================================================================

/// Delivery address and contact details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl Default for ShippingInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            phone: String::new(),
            address: String::new(),
            city: String::new(),
            state: String::new(),
            postal_code: String::new(),
            country: DEFAULT_COUNTRY.to_string(),
        }
    }
}

impl ShippingInfo {
    /// Check every shipping field.
    #[must_use]
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();

        errors.require(Field::Name, &self.name, "Name is required");

        if self.email.trim().is_empty() {
            errors.insert(Field::Email, "Email is required");
        } else if !Email::matches_pattern(&self.email) {
            errors.insert(Field::Email, "Email is invalid");
        }

        errors.require(Field::Phone, &self.phone, "Phone is required");
        errors.require(Field::Address, &self.address, "Address is required");
        errors.require(Field::City, &self.city, "City is required");
        errors.require(Field::State, &self.state, "State is required");

        if self.postal_code.trim().is_empty() {
            errors.insert(Field::PostalCode, "Postal code is required");
        } else if !POSTAL_CODE_PATTERN.is_match(&self.postal_code) {
            errors.insert(Field::PostalCode, "Postal code must be 5 digits");
        }

        errors
    }
}

// =============================================================================
// Payment
// =============================================================================

/// Payment method and card details.
///
/// Never charged; the card fields are only checked for shape.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentInfo {
    #[serde(rename = "paymentMethod")]
    pub method: PaymentMethod,
    pub card_number: String,
    pub card_holder_name: String,
    pub expiry_month: String,
    pub expiry_year: String,
    pub cvv: String,
}

impl fmt::Debug for PaymentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentInfo")
            .field("method", &self.method)
            .field("card_number", &"[REDACTED]")
            .field("card_holder_name", &self.card_holder_name)
            .field("expiry_month", &self.expiry_month)
            .field("expiry_year", &self.expiry_year)
            .field("cvv", &"[REDACTED]")
            .finish()
    }
}

impl PaymentInfo {
    /// Check the card fields. PayPal needs nothing.
    #[must_use]
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        if !self.method.is_card() {
            return errors;
        }

        let digits: String = self
            .card_number
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if digits.is_empty() {
            errors.insert(Field::CardNumber, "Card number is required");
        } else if !CARD_NUMBER_PATTERN.is_match(&digits) {
            errors.insert(Field::CardNumber, "Card number must be 16 digits");
        }

        errors.require(
            Field::CardHolderName,
            &self.card_holder_name,
            "Cardholder name is required",
        );
        errors.require(Field::ExpiryMonth, &self.expiry_month, "Select an expiry month");
        errors.require(Field::ExpiryYear, &self.expiry_year, "Select an expiry year");

        if self.cvv.trim().is_empty() {
            errors.insert(Field::Cvv, "CVV is required");
        } else if !CVV_PATTERN.is_match(&self.cvv) {
            errors.insert(Field::Cvv, "CVV must be 3 or 4 digits");
        }

        errors
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn valid_shipping() -> ShippingInfo {
        ShippingInfo {
            name: "Ana López".to_string(),
            email: "ana@example.com".to_string(),
            phone: "5512345678".to_string(),
            address: "Av. Reforma 222".to_string(),
            city: "Ciudad de México".to_string(),
            state: "CDMX".to_string(),
            postal_code: "06600".to_string(),
            ..ShippingInfo::default()
        }
    }

    fn card(number: &str) -> PaymentInfo {
        PaymentInfo {
            method: PaymentMethod::CreditCard,
            card_number: number.to_string(),
            card_holder_name: "ANA LOPEZ".to_string(),
            expiry_month: "08".to_string(),
            expiry_year: "2028".to_string(),
            cvv: "123".to_string(),
        }
    }

    #[test]
    fn test_shipping_default_country() {
        assert_eq!(ShippingInfo::default().country, "México");
    }

    #[test]
    fn test_valid_shipping_passes() {
        assert!(valid_shipping().validate().is_empty());
    }

    #[test]
    fn test_empty_shipping_reports_every_field() {
        let errors = ShippingInfo::default().validate();
        for field in [
            Field::Name,
            Field::Email,
            Field::Phone,
            Field::Address,
            Field::City,
            Field::State,
            Field::PostalCode,
        ] {
            assert!(errors.contains(field), "missing error for {field}");
        }
        assert_eq!(errors.len(), 7);
    }

    #[test]
    fn test_whitespace_only_is_empty() {
        let shipping = ShippingInfo {
            city: "   ".to_string(),
            ..valid_shipping()
        };
        assert_eq!(shipping.validate().get(Field::City), Some("City is required"));
    }

    #[test]
    fn test_postal_code() {
        let short = ShippingInfo {
            postal_code: "1234".to_string(),
            ..valid_shipping()
        };
        assert!(short.validate().contains(Field::PostalCode));

        let ok = ShippingInfo {
            postal_code: "12345".to_string(),
            ..valid_shipping()
        };
        assert!(ok.validate().is_empty());

        // Non-ASCII digits are not accepted.
        let arabic = ShippingInfo {
            postal_code: "١٢٣٤٥".to_string(),
            ..valid_shipping()
        };
        assert!(arabic.validate().contains(Field::PostalCode));
    }

    #[test]
    fn test_email_shape() {
        let bad = ShippingInfo {
            email: "ana@localhost".to_string(),
            ..valid_shipping()
        };
        assert_eq!(bad.validate().get(Field::Email), Some("Email is invalid"));
    }

    #[test]
    fn test_card_number_spaces_stripped() {
        assert!(card("4111 1111 1111 1111").validate().is_empty());
        assert!(card("4111111111111111").validate().is_empty());
    }

    #[test]
    fn test_card_number_rejected() {
        let errors = card("4111-1111-1111").validate();
        assert_eq!(
            errors.get(Field::CardNumber),
            Some("Card number must be 16 digits")
        );
    }

    #[test]
    fn test_cvv_length() {
        let mut payment = card("4111111111111111");
        payment.cvv = "1234".to_string();
        assert!(payment.validate().is_empty());
        payment.cvv = "12".to_string();
        assert!(payment.validate().contains(Field::Cvv));
    }

    #[test]
    fn test_paypal_requires_nothing() {
        let payment = PaymentInfo {
            method: PaymentMethod::Paypal,
            ..PaymentInfo::default()
        };
        assert!(payment.validate().is_empty());
    }

    #[test]
    fn test_debit_card_requires_card_fields() {
        let payment = PaymentInfo {
            method: PaymentMethod::DebitCard,
            ..PaymentInfo::default()
        };
        assert_eq!(payment.validate().len(), 5);
    }

    #[test]
    fn test_payment_debug_redacts_card() {
        let debug = format!("{:?}", card("4111111111111111"));
        assert!(!debug.contains("4111"));
        assert!(!debug.contains("123"));
    }

    #[test]
    fn test_payment_wire_names() {
        let json = serde_json::to_value(card("4111111111111111")).unwrap();
        assert_eq!(json["paymentMethod"], "CREDIT_CARD");
        assert_eq!(json["cardHolderName"], "ANA LOPEZ");
        assert!(json.get("method").is_none());
    }
}
