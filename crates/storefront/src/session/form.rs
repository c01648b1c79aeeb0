//! Registration form.

use std::fmt;

use shopfront_core::Email;

use crate::checkout::{Field, FieldErrors};

const MIN_NAME_CHARS: usize = 2;
const MIN_PASSWORD_CHARS: usize = 6;

/// What a new customer fills in to create an account.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl fmt::Debug for RegisterForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("confirm_password", &"[REDACTED]")
            .finish()
    }
}

impl RegisterForm {
    #[must_use]
    pub fn new(name: &str, email: &str, password: &str, confirm_password: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm_password.to_string(),
        }
    }

    /// Check every field. Lengths count characters; the name is trimmed
    /// first, the password is not.
    #[must_use]
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();

        let name = self.name.trim();
        if name.is_empty() {
            errors.insert(Field::Name, "Name is required");
        } else if name.chars().count() < MIN_NAME_CHARS {
            errors.insert(Field::Name, "Name must be at least 2 characters");
        }

        if self.email.trim().is_empty() {
            errors.insert(Field::Email, "Email is required");
        } else if !Email::matches_pattern(&self.email) {
            errors.insert(Field::Email, "Email is invalid");
        }

        if self.password.trim().is_empty() {
            errors.insert(Field::Password, "Password is required");
        } else if self.password.chars().count() < MIN_PASSWORD_CHARS {
            errors.insert(Field::Password, "Password must be at least 6 characters");
        }

        if self.confirm_password.is_empty() {
            errors.insert(Field::ConfirmPassword, "Confirm your password");
        } else if self.confirm_password != self.password {
            errors.insert(Field::ConfirmPassword, "Passwords do not match");
        }

        errors
    }
}
