//! Error Types
//!
//! Classified error hierarchy for the token lifecycle manager.

use std::time::Duration;
use thiserror::Error;

use crate::secrets::SecretId;

/// Root error type for token lifecycle operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("secret store error: {0}")]
    Secret(#[from] SecretError),

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error(
        "minted token expired on arrival: reported lifetime {lifetime_secs}s \
         does not outlive the {margin_secs}s safety margin"
    )]
    ExpiredOnArrival { lifetime_secs: u64, margin_secs: u64 },
}

/// Classification tag reported alongside each error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connection,
    InvalidGrant,
    Validation,
    Provider,
    InvalidSecret,
    NotFound,
    ExpiredOnArrival,
    Configuration,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::InvalidGrant => "invalid_grant",
            Self::Validation => "validation",
            Self::Provider => "provider",
            Self::InvalidSecret => "invalid_secret",
            Self::NotFound => "not_found",
            Self::ExpiredOnArrival => "expired_on_arrival",
            Self::Configuration => "configuration",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LifecycleError {
    /// Classification used for reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(_) => ErrorKind::Connection,
            Self::Provider(ProviderError::InvalidGrant { .. }) => ErrorKind::InvalidGrant,
            Self::Provider(ProviderError::Validation { .. }) => ErrorKind::Validation,
            Self::Provider(_) => ErrorKind::Provider,
            Self::Secret(SecretError::InvalidSecret { .. }) => ErrorKind::InvalidSecret,
            Self::Secret(SecretError::NotFound { .. }) => ErrorKind::NotFound,
            Self::ExpiredOnArrival { .. } => ErrorKind::ExpiredOnArrival,
            Self::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// Check if a higher layer may retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection(_)
                | Self::Provider(ProviderError::ServerError { .. })
                | Self::Provider(ProviderError::TemporarilyUnavailable { .. })
        )
    }

    /// Check if the account's grant is unusable until re-authorized.
    ///
    /// Once this returns true the account must not be retried
    /// automatically; the caller has to trigger a new consent flow.
    pub fn needs_reauthorization(&self) -> bool {
        matches!(self, Self::Provider(ProviderError::InvalidGrant { .. }))
    }

    /// Check if the current access token was rejected as invalid.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Provider(ProviderError::Validation { .. }))
    }

    /// Get retry-after duration if the provider supplied one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Provider(ProviderError::TemporarilyUnavailable { retry_after }) => *retry_after,
            _ => None,
        }
    }
}

/// Transport failure reaching the provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("connection failed: {message}")]
    Failed { message: String },

    #[error("request timed out after {timeout:?}")]
    Timeout { timeout: Duration },
}

/// Provider-reported failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("invalid grant: {message}")]
    InvalidGrant { message: String },

    #[error("invalid client credentials")]
    InvalidClient { message: Option<String> },

    #[error("token validation failed: {message}")]
    Validation { message: String },

    #[error("provider rejected request: {error}")]
    Rejected {
        error: String,
        description: Option<String>,
    },

    #[error("provider server error: {message}")]
    ServerError { message: String },

    #[error("provider temporarily unavailable")]
    TemporarilyUnavailable { retry_after: Option<Duration> },

    #[error("malformed provider response: {message}")]
    Malformed { message: String },
}

/// Secret store failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecretError {
    #[error("no secret record for id {id}")]
    NotFound { id: SecretId },

    #[error("invalid secret: {reason}")]
    InvalidSecret { reason: String },
}

/// Configuration error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no adapter registered for provider \"{provider}\"")]
    UnknownProvider { provider: String },

    #[error("introspection endpoint not configured for provider \"{provider}\"")]
    MissingIntrospectionEndpoint { provider: String },

    #[error("invalid endpoint URL: {url}")]
    InvalidEndpoint { url: String },

    #[error("missing required field: {field}")]
    MissingRequired { field: String },
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// OAuth2 error response body from a provider.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct OAuthErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Map a token-endpoint error response to an error type.
pub fn map_token_error(response: &OAuthErrorResponse) -> ProviderError {
    match response.error.as_str() {
        "invalid_grant" => ProviderError::InvalidGrant {
            message: response
                .error_description
                .clone()
                .unwrap_or_else(|| "invalid grant".to_string()),
        },
        "invalid_client" => ProviderError::InvalidClient {
            message: response.error_description.clone(),
        },
        "server_error" => ProviderError::ServerError {
            message: response
                .error_description
                .clone()
                .unwrap_or_else(|| "server error".to_string()),
        },
        "temporarily_unavailable" => ProviderError::TemporarilyUnavailable { retry_after: None },
        _ => ProviderError::Rejected {
            error: response.error.clone(),
            description: response.error_description.clone(),
        },
    }
}

/// Parse an error response from an HTTP body.
pub fn parse_error_response(body: &str) -> Option<OAuthErrorResponse> {
    serde_json::from_str(body).ok()
}

/// Create an error from a non-success token-endpoint response.
pub fn create_error_from_response(status: u16, body: &str) -> LifecycleError {
    if let Some(response) = parse_error_response(body) {
        return LifecycleError::Provider(map_token_error(&response));
    }

    let error = match status {
        401 => ProviderError::InvalidClient {
            message: Some("unauthorized".to_string()),
        },
        429 => ProviderError::TemporarilyUnavailable {
            retry_after: Some(Duration::from_secs(60)),
        },
        _ => ProviderError::ServerError {
            message: format!("HTTP {}", status),
        },
    };

    LifecycleError::Provider(error)
}
