//! Authentication error types.

use thiserror::Error;

use crate::api::ApiError;
use crate::checkout::FieldErrors;

/// Which auth action failed, for picking a fallback message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlow {
    Login,
    Register,
}

impl AuthFlow {
    /// Message shown when the API refuses without saying why.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::Login => "Could not sign in",
            Self::Register => "Could not register",
        }
    }
}

/// Errors that can occur during sign-in or registration.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] shopfront_core::EmailError),

    /// A required input was left empty.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// The registration form failed validation.
    #[error("registration form has {} invalid field(s)", .0.len())]
    Invalid(FieldErrors),

    /// The API refused the credentials or the registration.
    #[error("{0}")]
    Rejected(String),

    /// The API answered success without a token or user.
    #[error("auth response is missing the token or user")]
    IncompleteResponse(AuthFlow),

    /// The request itself failed.
    #[error("auth request failed: {0}")]
    Api(#[from] ApiError),
}

impl AuthError {
    /// Message safe to show the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(_) => "Enter a valid email address".to_string(),
            Self::MissingField(field) => format!("{} is required", capitalize(field)),
            Self::Invalid(errors) => errors
                .iter()
                .map(|(_, message)| message)
                .collect::<Vec<_>>()
                .join("; "),
            Self::Rejected(message) => message.clone(),
            Self::IncompleteResponse(flow) => flow.default_message().to_string(),
            Self::Api(ApiError::Cancelled) => "Request cancelled".to_string(),
            Self::Api(_) => "Connection error. Check that the server is running.".to_string(),
        }
    }

    /// Classify a failed auth call: answers from the API become
    /// [`AuthError::Rejected`], anything else stays a transport error.
    pub(crate) fn from_api(flow: AuthFlow, error: ApiError) -> Self {
        match error {
            ApiError::Unauthorized { message }
            | ApiError::Status { message, .. }
            | ApiError::Rejected(message) => {
                Self::Rejected(message.unwrap_or_else(|| flow.default_message().to_string()))
            }
            other => Self::Api(other),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
