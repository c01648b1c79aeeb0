//! Abort signals bound to a flow's lifetime.
//!
//! Every fetch a flow issues runs through [`FlowScope::run`]. Aborting the
//! scope, directly or through an [`AbortHandle`], resolves all of its
//! pending requests to [`ApiError::Cancelled`] without touching any state
//! they would have written.
//!
//! `run` borrows the scope, so a scope is only dropped once its requests
//! are done. Dropping it marks every outstanding [`AbortHandle`] as aborted.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use crate::api::ApiError;

/// Cancellation scope for one flow (a listing load, a checkout, ...).
#[derive(Debug)]
pub struct FlowScope {
    name: &'static str,
    aborted: Arc<watch::Sender<bool>>,
}

/// Handle that aborts a [`FlowScope`] from elsewhere (e.g. a Ctrl-C task).
#[derive(Debug, Clone)]
pub struct AbortHandle {
    aborted: Arc<watch::Sender<bool>>,
}

impl AbortHandle {
    pub fn abort(&self) {
        self.aborted.send_replace(true);
    }

    /// The scope was aborted or dropped.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        *self.aborted.borrow()
    }
}

impl FlowScope {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        let (aborted, _) = watch::channel(false);
        Self {
            name,
            aborted: Arc::new(aborted),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            aborted: Arc::clone(&self.aborted),
        }
    }

    /// Abort every pending and future request in this scope.
    pub fn abort(&self) {
        tracing::debug!(scope = self.name, "Aborting flow scope");
        self.aborted.send_replace(true);
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        *self.aborted.borrow()
    }

    /// Run `request` unless the scope is aborted first.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Cancelled` if the scope is aborted before the
    /// request completes, otherwise the request's own result.
    pub async fn run<T, F>(&self, request: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let mut signal = self.aborted.subscribe();
        tokio::select! {
            biased;
            _ = signal.wait_for(|aborted| *aborted) => {
                tracing::debug!(scope = self.name, "Request cancelled");
                Err(ApiError::Cancelled)
            }
            result = request => result,
        }
    }
}

/// Marks the scope's handles as aborted.
impl Drop for FlowScope {
    fn drop(&mut self) {
        self.aborted.send_replace(true);
    }
}
