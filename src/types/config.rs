//! Configuration Types
//!
//! Provider adapter configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::types::Provider;

/// Configuration for an HTTP provider adapter.
#[derive(Clone, Debug)]
pub struct AdapterConfig {
    /// Provider this adapter serves.
    pub provider: Provider,
    /// Token endpoint URL.
    pub token_endpoint: Url,
    /// Token introspection endpoint (optional).
    pub introspection_endpoint: Option<Url>,
    /// Client authentication method.
    pub auth_method: ClientAuthMethod,
    /// HTTP timeout, passed through to the transport.
    pub timeout: Duration,
}

/// Client authentication method.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
    /// client_id and client_secret in the request body.
    ClientSecretPost,
    /// HTTP Basic Authentication header.
    ClientSecretBasic,
}

impl Default for ClientAuthMethod {
    fn default() -> Self {
        Self::ClientSecretBasic
    }
}

/// Default HTTP timeout for provider requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
