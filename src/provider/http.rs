//! HTTP Provider Adapter
//!
//! Generic adapter speaking the refresh-token grant (RFC 6749 §6) and
//! token introspection (RFC 7662) against a provider's endpoints.

use async_trait::async_trait;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{HttpMethod, HttpRequest, HttpTransport, ReqwestHttpTransport};
use crate::error::{create_error_from_response, ConfigError, LifecycleError, ProviderError};
use crate::provider::ProviderAdapter;
use crate::types::{
    AdapterConfig, ClientAuthMethod, IntrospectionResponse, MintedToken, TokenResponse,
};

/// Provider adapter backed by an HTTP transport.
pub struct HttpProviderAdapter<T: HttpTransport> {
    config: AdapterConfig,
    transport: Arc<T>,
}

impl HttpProviderAdapter<ReqwestHttpTransport> {
    /// Create an adapter with the default reqwest transport.
    pub fn with_default_transport(config: AdapterConfig) -> Self {
        let transport = Arc::new(ReqwestHttpTransport::with_options(config.timeout, 1048576));
        Self::new(config, transport)
    }
}

impl<T: HttpTransport> HttpProviderAdapter<T> {
    /// Create an adapter over a transport.
    pub fn new(config: AdapterConfig, transport: Arc<T>) -> Self {
        Self { config, transport }
    }

    fn refresh_request_body(
        &self,
        refresh_token: &str,
        client_id: &str,
        client_secret: &SecretString,
    ) -> String {
        let mut form = url::form_urlencoded::Serializer::new(String::new());
        form.append_pair("grant_type", "refresh_token");
        form.append_pair("refresh_token", refresh_token);

        // Client credentials in body if using post method
        if self.config.auth_method == ClientAuthMethod::ClientSecretPost {
            form.append_pair("client_id", client_id);
            form.append_pair("client_secret", client_secret.expose_secret());
        }

        form.finish()
    }

    fn refresh_request_headers(
        &self,
        client_id: &str,
        client_secret: &SecretString,
    ) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert(
            "content-type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );
        headers.insert("accept".to_string(), "application/json".to_string());

        // Add Basic auth header if using that method
        if self.config.auth_method == ClientAuthMethod::ClientSecretBasic {
            let credentials = format!("{}:{}", client_id, client_secret.expose_secret());
            let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
            headers.insert("authorization".to_string(), format!("Basic {}", encoded));
        }

        headers
    }
}

#[async_trait]
impl<T: HttpTransport> ProviderAdapter for HttpProviderAdapter<T> {
    async fn new_token(
        &self,
        refresh_token: &str,
        client_id: &str,
        client_secret: &SecretString,
    ) -> Result<MintedToken, LifecycleError> {
        let http_request = HttpRequest {
            method: HttpMethod::Post,
            url: self.config.token_endpoint.to_string(),
            headers: self.refresh_request_headers(client_id, client_secret),
            body: Some(self.refresh_request_body(refresh_token, client_id, client_secret)),
            timeout: Some(self.config.timeout),
        };

        let response = self.transport.send(http_request).await?;

        if response.status != 200 {
            return Err(create_error_from_response(response.status, &response.body));
        }

        let token_response: TokenResponse =
            serde_json::from_str(&response.body).map_err(|e| {
                LifecycleError::Provider(ProviderError::Malformed {
                    message: e.to_string(),
                })
            })?;

        let lifetime_secs = token_response.expires_in.ok_or_else(|| {
            LifecycleError::Provider(ProviderError::Malformed {
                message: "token response missing expires_in".to_string(),
            })
        })?;

        Ok(MintedToken::new(token_response.access_token, lifetime_secs))
    }

    async fn validate_token(&self, access_token: &str) -> Result<bool, LifecycleError> {
        let introspection_endpoint =
            self.config.introspection_endpoint.as_ref().ok_or_else(|| {
                LifecycleError::Configuration(ConfigError::MissingIntrospectionEndpoint {
                    provider: self.config.provider.to_string(),
                })
            })?;

        let body = {
            let mut form = url::form_urlencoded::Serializer::new(String::new());
            form.append_pair("token", access_token);
            form.finish()
        };

        let mut headers = HashMap::new();
        headers.insert(
            "content-type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );
        headers.insert("accept".to_string(), "application/json".to_string());

        let http_request = HttpRequest {
            method: HttpMethod::Post,
            url: introspection_endpoint.to_string(),
            headers,
            body: Some(body),
            timeout: Some(self.config.timeout),
        };

        let response = self.transport.send(http_request).await?;

        if response.status != 200 {
            return Err(LifecycleError::Provider(ProviderError::Validation {
                message: format!("introspection returned HTTP {}", response.status),
            }));
        }

        let introspection: IntrospectionResponse =
            serde_json::from_str(&response.body).map_err(|e| {
                LifecycleError::Provider(ProviderError::Malformed {
                    message: e.to_string(),
                })
            })?;

        Ok(introspection.active)
    }
}
