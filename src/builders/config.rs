//! Configuration Builder
//!
//! Fluent builder for provider adapter configuration.

use std::time::Duration;
use url::Url;

use crate::error::{ConfigError, LifecycleError};
use crate::types::{AdapterConfig, ClientAuthMethod, Provider, DEFAULT_TIMEOUT};

/// Adapter configuration builder.
pub struct AdapterConfigBuilder {
    provider: Option<Provider>,
    token_endpoint: Option<String>,
    introspection_endpoint: Option<String>,
    auth_method: ClientAuthMethod,
    timeout: Duration,
}

impl AdapterConfigBuilder {
    /// Create a new configuration builder.
    pub fn new() -> Self {
        Self {
            provider: None,
            token_endpoint: None,
            introspection_endpoint: None,
            auth_method: ClientAuthMethod::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the provider tag.
    pub fn provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the token endpoint.
    pub fn token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.token_endpoint = Some(endpoint.into());
        self
    }

    /// Set the introspection endpoint.
    pub fn introspection_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.introspection_endpoint = Some(endpoint.into());
        self
    }

    /// Set the client authentication method.
    pub fn auth_method(mut self, method: ClientAuthMethod) -> Self {
        self.auth_method = method;
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<AdapterConfig, LifecycleError> {
        let provider = self.provider.ok_or(ConfigError::MissingRequired {
            field: "provider".to_string(),
        })?;

        let token_endpoint = self.token_endpoint.ok_or(ConfigError::MissingRequired {
            field: "token_endpoint".to_string(),
        })?;
        let token_endpoint = parse_endpoint(&token_endpoint)?;

        let introspection_endpoint = self
            .introspection_endpoint
            .map(|endpoint| parse_endpoint(&endpoint))
            .transpose()?;

        Ok(AdapterConfig {
            provider,
            token_endpoint,
            introspection_endpoint,
            auth_method: self.auth_method,
            timeout: self.timeout,
        })
    }
}

impl Default for AdapterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, LifecycleError> {
    Url::parse(endpoint).map_err(|_| {
        ConfigError::InvalidEndpoint {
            url: endpoint.to_string(),
        }
        .into()
    })
}

/// Create a new adapter configuration builder.
pub fn adapter_config() -> AdapterConfigBuilder {
    AdapterConfigBuilder::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_build_complete_config() {
        let config = adapter_config()
            .provider(Provider::new("gmail"))
            .token_endpoint("https://provider.test/token")
            .introspection_endpoint("https://provider.test/introspect")
            .auth_method(ClientAuthMethod::ClientSecretPost)
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();

        assert_eq!(config.provider, Provider::new("gmail"));
        assert_eq!(config.token_endpoint.as_str(), "https://provider.test/token");
        assert!(config.introspection_endpoint.is_some());
        assert_eq!(config.auth_method, ClientAuthMethod::ClientSecretPost);
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_token_endpoint_required() {
        let err = adapter_config()
            .provider(Provider::new("gmail"))
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let err = adapter_config()
            .provider(Provider::new("gmail"))
            .token_endpoint("not a url")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            LifecycleError::Configuration(ConfigError::InvalidEndpoint {
                url: "not a url".to_string()
            })
        );
    }
}
