//! Token Lifecycle Integration
//!
//! Access-token lifecycle management for accounts tied to third-party
//! OAuth2 providers: obtaining tokens, caching them safely with expiry,
//! validating them, and transparently renewing them on expiry or
//! revocation.
//!
//! # Features
//!
//! - Per-account access-token cache with a fixed clock-skew safety margin
//! - Singleflight refresh: concurrent misses collapse into one exchange
//! - Token Refresh (RFC 6749 Section 6) via pluggable provider adapters
//! - Token liveness checks (RFC 7662 introspection)
//! - Immutable, rotatable refresh-token records
//! - Bounded re-mint on rejected tokens; fatal invalid-grant surfacing
//! - Classified error reporting with account context
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use token_lifecycle::{
//!     adapter_config, Account, AccountId, HttpProviderAdapter, InMemorySecretStore,
//!     Provider, ProviderRegistry, SecretKind, SecretStore, TokenCache,
//!     TokenLifecycleManager, TracingObserver,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = adapter_config()
//!         .provider(Provider::new("gmail"))
//!         .token_endpoint("https://oauth2.googleapis.com/token")
//!         .introspection_endpoint("https://oauth2.googleapis.com/tokeninfo")
//!         .build()?;
//!     let providers = ProviderRegistry::new().register(
//!         Provider::new("gmail"),
//!         Arc::new(HttpProviderAdapter::with_default_transport(config)),
//!     );
//!
//!     let secrets = Arc::new(InMemorySecretStore::new());
//!     let refresh_id = secrets.put(b"refresh-token", SecretKind::Token).await?;
//!
//!     let manager = TokenLifecycleManager::new(
//!         providers,
//!         secrets,
//!         Arc::new(TokenCache::new()),
//!         Arc::new(TracingObserver),
//!     );
//!
//!     let account = Account::new(
//!         AccountId::new("acct-1"),
//!         Provider::new("gmail"),
//!         "client-id",
//!         "client-secret",
//!         refresh_id,
//!     );
//!
//!     let token = manager.get_access_token(&account).await?;
//!     println!("access token: {}", token);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! The crate is organized into several sub-modules:
//!
//! - `types`: accounts, tokens, and adapter configuration
//! - `error`: classified error hierarchy with wire-error mapping
//! - `core`: HTTP transport abstraction
//! - `secrets`: immutable, rotatable secret records
//! - `provider`: per-provider adapters and the adapter registry
//! - `token`: the token cache and the lifecycle manager
//! - `builders`: fluent builders for configuration
//! - `telemetry`: observability sink for errors and refresh outcomes

pub mod builders;
pub mod core;
pub mod error;
pub mod provider;
pub mod secrets;
pub mod telemetry;
pub mod token;
pub mod types;

// Re-export builders
pub use builders::{adapter_config, AdapterConfigBuilder};

// Re-export errors
pub use error::{
    create_error_from_response, map_token_error, parse_error_response, ConfigError,
    ConnectionError, ErrorKind, LifecycleError, LifecycleResult, OAuthErrorResponse,
    ProviderError, SecretError,
};

// Re-export types
pub use types::{
    Account, AccountId, AdapterConfig, CachedToken, ClientAuthMethod, IntrospectionResponse,
    MintedToken, Provider, TokenResponse, DEFAULT_TIMEOUT,
};

// Re-export core components
pub use self::core::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockHttpTransport,
    ReqwestHttpTransport,
};

// Re-export secret storage
pub use secrets::{
    validate_secret_bytes, InMemorySecretStore, MockSecretStore, SecretId, SecretKind,
    SecretRecord, SecretStore,
};

// Re-export provider adapters
pub use provider::{
    HttpProviderAdapter, MintRequest, MockProviderAdapter, ProviderAdapter, ProviderRegistry,
};

// Re-export token lifecycle
pub use token::{TokenCache, TokenLifecycleManager, SAFETY_MARGIN_SECS};

// Re-export telemetry
pub use telemetry::{
    ErrorEvent, InMemoryObserver, LifecycleObserver, NoOpObserver, RefreshEvent,
    TracingObserver,
};
