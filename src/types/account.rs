//! Account Types
//!
//! Identity the lifecycle manager operates on.

use secrecy::SecretString;

use crate::secrets::SecretId;

/// Account identifier, used as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Provider tag selecting which adapter serves an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Provider(String);

impl Provider {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Provider {
    fn from(tag: &str) -> Self {
        Self(tag.to_string())
    }
}

/// Account tied to a third-party provider.
///
/// Owned externally; the manager reads these fields and repoints
/// `refresh_token_id` on rotation.
#[derive(Clone)]
pub struct Account {
    /// Account identity.
    pub id: AccountId,
    /// Provider tag.
    pub provider: Provider,
    /// Provider app client id.
    pub client_id: String,
    /// Provider app client secret.
    pub client_secret: SecretString,
    /// Reference to the current refresh-token record.
    pub refresh_token_id: SecretId,
}

impl Account {
    /// Create a new account.
    pub fn new(
        id: AccountId,
        provider: Provider,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token_id: SecretId,
    ) -> Self {
        Self {
            id,
            provider,
            client_id: client_id.into(),
            client_secret: SecretString::new(client_secret.into()),
            refresh_token_id,
        }
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("provider", &self.provider)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("refresh_token_id", &self.refresh_token_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_client_secret() {
        let account = Account::new(
            AccountId::new("acct-1"),
            Provider::new("gmail"),
            "client-id",
            "very-secret",
            SecretId(1),
        );

        let debug = format!("{:?}", account);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("very-secret"));
    }

    #[test]
    fn test_display() {
        assert_eq!(AccountId::new("acct-1").to_string(), "acct-1");
        assert_eq!(Provider::new("outlook").to_string(), "outlook");
    }
}
