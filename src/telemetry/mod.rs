//! Telemetry
//!
//! Observability sink for classified lifecycle errors and refresh
//! outcomes. Every classified error is reported here once, with account
//! context, before being returned to the caller.

use std::sync::Mutex;

use crate::error::{ErrorKind, LifecycleError};
use crate::types::AccountId;

/// Recorded error event.
#[derive(Debug, Clone)]
pub struct ErrorEvent {
    pub account: AccountId,
    pub kind: ErrorKind,
    pub message: String,
}

/// Recorded refresh outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshEvent {
    pub account: AccountId,
    pub success: bool,
}

/// Observer interface for lifecycle events.
pub trait LifecycleObserver: Send + Sync {
    /// Record a classified error for an account.
    fn record_error(&self, account: &AccountId, error: &LifecycleError);

    /// Record the outcome of a refresh attempt.
    fn record_refresh(&self, account: &AccountId, success: bool);
}

/// No-op observer implementation.
pub struct NoOpObserver;

impl LifecycleObserver for NoOpObserver {
    fn record_error(&self, _account: &AccountId, _error: &LifecycleError) {}
    fn record_refresh(&self, _account: &AccountId, _success: bool) {}
}

/// In-memory observer for tests and diagnostics.
#[derive(Default)]
pub struct InMemoryObserver {
    errors: Mutex<Vec<ErrorEvent>>,
    refreshes: Mutex<Vec<RefreshEvent>>,
}

impl InMemoryObserver {
    /// Create a new in-memory observer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded error events.
    pub fn errors(&self) -> Vec<ErrorEvent> {
        self.errors.lock().unwrap().clone()
    }

    /// Get error events for one account.
    pub fn errors_for(&self, account: &AccountId) -> Vec<ErrorEvent> {
        self.errors
            .lock()
            .unwrap()
            .iter()
            .filter(|e| &e.account == account)
            .cloned()
            .collect()
    }

    /// Get all recorded refresh outcomes.
    pub fn refreshes(&self) -> Vec<RefreshEvent> {
        self.refreshes.lock().unwrap().clone()
    }

    /// Clear recorded events.
    pub fn clear(&self) {
        self.errors.lock().unwrap().clear();
        self.refreshes.lock().unwrap().clear();
    }
}

impl LifecycleObserver for InMemoryObserver {
    fn record_error(&self, account: &AccountId, error: &LifecycleError) {
        self.errors.lock().unwrap().push(ErrorEvent {
            account: account.clone(),
            kind: error.kind(),
            message: error.to_string(),
        });
    }

    fn record_refresh(&self, account: &AccountId, success: bool) {
        self.refreshes.lock().unwrap().push(RefreshEvent {
            account: account.clone(),
            success,
        });
    }
}

/// Observer emitting structured `tracing` events.
pub struct TracingObserver;

impl LifecycleObserver for TracingObserver {
    fn record_error(&self, account: &AccountId, error: &LifecycleError) {
        tracing::error!(
            account = %account,
            kind = error.kind().as_str(),
            error = %error,
            "token lifecycle error"
        );
    }

    fn record_refresh(&self, account: &AccountId, success: bool) {
        if success {
            tracing::debug!(account = %account, "access token refreshed");
        } else {
            tracing::warn!(account = %account, "access token refresh failed");
        }
    }
}
