//! Subcommand implementations.

pub mod account;
pub mod catalog;
pub mod checkout;
pub mod orders;

use shopfront_core::ProductId;
use shopfront_storefront::error::AppError;
use thiserror::Error;

/// Errors that can end a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// A storefront flow failed.
    #[error(transparent)]
    App(#[from] AppError),

    /// The order file could not be read.
    #[error("Could not read order file: {0}")]
    Io(#[from] std::io::Error),

    /// The order file is not valid YAML for an order.
    #[error("Invalid order file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The order file names a product the catalog does not have.
    #[error("Unknown product: {0}")]
    UnknownProduct(ProductId),

    /// A form or order did not pass validation.
    #[error("{0} field(s) need fixing")]
    Invalid(usize),
}

impl CliError {
    /// Message to print for the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::App(e) => e.user_message(),
            other => other.to_string(),
        }
    }

    /// Log the error; storefront faults go through [`AppError::report`].
    pub fn report(&self) {
        match self {
            Self::App(e) => e.report(),
            other => tracing::error!("Command failed: {other}"),
        }
    }
}
