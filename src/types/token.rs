//! Token Types
//!
//! Minted, cached, and wire-level token definitions.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Access token freshly minted by a provider adapter.
#[derive(Clone, PartialEq, Eq)]
pub struct MintedToken {
    /// Opaque access token.
    pub access_token: String,
    /// Reported lifetime in seconds.
    pub lifetime_secs: u64,
}

impl MintedToken {
    pub fn new(access_token: impl Into<String>, lifetime_secs: u64) -> Self {
        Self {
            access_token: access_token.into(),
            lifetime_secs,
        }
    }
}

impl std::fmt::Debug for MintedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MintedToken")
            .field("access_token", &"[REDACTED]")
            .field("lifetime_secs", &self.lifetime_secs)
            .finish()
    }
}

/// Volatile cache entry for an account's access token.
#[derive(Clone, PartialEq, Eq)]
pub struct CachedToken {
    /// Opaque access token.
    pub access_token: String,
    /// Absolute expiry instant, safety margin already applied.
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedToken")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Token response from a provider's token endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenResponse {
    /// Access token.
    pub access_token: String,
    /// Token type (usually "Bearer").
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Expires in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Rotated refresh token, if the provider issued one.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Introspection response from a provider (RFC 7662).
#[derive(Clone, Debug, Deserialize)]
pub struct IntrospectionResponse {
    /// Whether the token is currently live.
    pub active: bool,
    /// Granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
    /// Client the token was issued to.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Expiry as a Unix timestamp.
    #[serde(default)]
    pub exp: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_parsing() {
        let json = r#"{
            "access_token": "tok-1",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "refresh-1",
            "scope": "mail.read"
        }"#;

        let response: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.access_token, "tok-1");
        assert_eq!(response.expires_in, Some(3600));
        assert_eq!(response.refresh_token, Some("refresh-1".to_string()));
    }

    #[test]
    fn test_token_response_defaults() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token": "tok-2"}"#).unwrap();
        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.expires_in, None);
    }

    #[test]
    fn test_introspection_response_parsing() {
        let response: IntrospectionResponse =
            serde_json::from_str(r#"{"active": true, "scope": "mail.read"}"#).unwrap();
        assert!(response.active);

        let response: IntrospectionResponse =
            serde_json::from_str(r#"{"active": false}"#).unwrap();
        assert!(!response.active);
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let minted = MintedToken::new("super-secret-token", 3600);
        assert!(!format!("{:?}", minted).contains("super-secret-token"));

        let cached = CachedToken {
            access_token: "super-secret-token".to_string(),
            expires_at: Utc::now(),
        };
        assert!(!format!("{:?}", cached).contains("super-secret-token"));
    }
}
