//! Provider Adapters
//!
//! Per-provider capability for minting and validating access tokens.
//! Adapters are registered against a provider tag at construction time
//! and resolved per account.

pub mod http;

pub use http::HttpProviderAdapter;

use async_trait::async_trait;
use secrecy::SecretString;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{ConfigError, LifecycleError};
use crate::types::{MintedToken, Provider};

/// Provider adapter interface.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Exchange a refresh token for a fresh access token.
    async fn new_token(
        &self,
        refresh_token: &str,
        client_id: &str,
        client_secret: &SecretString,
    ) -> Result<MintedToken, LifecycleError>;

    /// Check an access token's current liveness with the provider.
    async fn validate_token(&self, access_token: &str) -> Result<bool, LifecycleError>;
}

/// Registry mapping provider tags to adapters.
#[derive(Default)]
pub struct ProviderRegistry {
    adapters: HashMap<Provider, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter for a provider tag.
    pub fn register(mut self, provider: Provider, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.insert(provider, adapter);
        self
    }

    /// Resolve the adapter serving a provider tag.
    pub fn resolve(&self, provider: &Provider) -> Result<Arc<dyn ProviderAdapter>, LifecycleError> {
        self.adapters.get(provider).cloned().ok_or_else(|| {
            ConfigError::UnknownProvider {
                provider: provider.to_string(),
            }
            .into()
        })
    }
}

/// Recorded mint request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MintRequest {
    pub refresh_token: String,
    pub client_id: String,
}

/// Mock provider adapter for testing.
#[derive(Default)]
pub struct MockProviderAdapter {
    mint_results: Mutex<VecDeque<Result<MintedToken, LifecycleError>>>,
    validate_results: Mutex<VecDeque<Result<bool, LifecycleError>>>,
    mint_history: Mutex<Vec<MintRequest>>,
    validate_history: Mutex<Vec<String>>,
    mint_delay: Mutex<Option<Duration>>,
}

impl MockProviderAdapter {
    /// Create a new mock adapter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a mint result; defaults to a fresh hour-long token.
    pub fn push_mint(&self, result: Result<MintedToken, LifecycleError>) -> &Self {
        self.mint_results.lock().unwrap().push_back(result);
        self
    }

    /// Queue a validation result; defaults to `Ok(true)`.
    pub fn push_validate(&self, result: Result<bool, LifecycleError>) -> &Self {
        self.validate_results.lock().unwrap().push_back(result);
        self
    }

    /// Delay each mint, to widen concurrency windows in tests.
    pub fn set_mint_delay(&self, delay: Duration) -> &Self {
        *self.mint_delay.lock().unwrap() = Some(delay);
        self
    }

    /// Get mint request history.
    pub fn mint_history(&self) -> Vec<MintRequest> {
        self.mint_history.lock().unwrap().clone()
    }

    /// Number of mint calls observed.
    pub fn mint_calls(&self) -> usize {
        self.mint_history.lock().unwrap().len()
    }

    /// Get validation history.
    pub fn validate_history(&self) -> Vec<String> {
        self.validate_history.lock().unwrap().clone()
    }

    /// Number of validation calls observed.
    pub fn validate_calls(&self) -> usize {
        self.validate_history.lock().unwrap().len()
    }
}

#[async_trait]
impl ProviderAdapter for MockProviderAdapter {
    async fn new_token(
        &self,
        refresh_token: &str,
        client_id: &str,
        _client_secret: &SecretString,
    ) -> Result<MintedToken, LifecycleError> {
        let serial = {
            let mut history = self.mint_history.lock().unwrap();
            history.push(MintRequest {
                refresh_token: refresh_token.to_string(),
                client_id: client_id.to_string(),
            });
            history.len()
        };

        let delay = *self.mint_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.mint_results.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(MintedToken::new(format!("minted-token-{}", serial), 3600)),
        }
    }

    async fn validate_token(&self, access_token: &str) -> Result<bool, LifecycleError> {
        self.validate_history
            .lock()
            .unwrap()
            .push(access_token.to_string());

        match self.validate_results.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(true),
        }
    }
}
