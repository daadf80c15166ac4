//! Secret Store
//!
//! Persistence of opaque credential material as immutable, rotatable
//! records. Rotation writes a new record; existing records are never
//! mutated in place.

use async_trait::async_trait;
use secrecy::SecretString;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::{LifecycleError, SecretError};

/// Identifier of a stored secret record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SecretId(pub u64);

impl std::fmt::Display for SecretId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind tag of a stored secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    /// Refresh token material.
    Token,
}

impl SecretKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Token => "token",
        }
    }
}

/// Immutable secret record.
#[derive(Debug, Clone)]
pub struct SecretRecord {
    pub id: SecretId,
    pub secret: SecretString,
    pub kind: SecretKind,
}

/// Validate secret bytes: must be valid UTF-8 without a NUL byte.
///
/// Violations are rejected before any persistence, never truncated.
pub fn validate_secret_bytes(bytes: &[u8]) -> Result<&str, LifecycleError> {
    let value = std::str::from_utf8(bytes).map_err(|_| SecretError::InvalidSecret {
        reason: "not a valid UTF-8 byte sequence".to_string(),
    })?;

    if value.contains('\0') {
        return Err(SecretError::InvalidSecret {
            reason: "contains a null byte".to_string(),
        }
        .into());
    }

    Ok(value)
}

/// Secret store interface.
///
/// Durability guarantees are delegated to the backing store; no retry
/// policy of its own.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Retrieve the record for an id.
    async fn get(&self, id: SecretId) -> Result<SecretRecord, LifecycleError>;

    /// Validate and write a brand-new record, returning its id.
    async fn put(&self, secret: &[u8], kind: SecretKind) -> Result<SecretId, LifecycleError>;
}

/// In-memory secret store implementation.
pub struct InMemorySecretStore {
    records: Mutex<HashMap<SecretId, SecretRecord>>,
    next_id: AtomicU64,
}

impl InMemorySecretStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of records ever written.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }
}

impl Default for InMemorySecretStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get(&self, id: SecretId) -> Result<SecretRecord, LifecycleError> {
        self.records
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| SecretError::NotFound { id }.into())
    }

    async fn put(&self, secret: &[u8], kind: SecretKind) -> Result<SecretId, LifecycleError> {
        let value = validate_secret_bytes(secret)?.to_string();

        let id = SecretId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let record = SecretRecord {
            id,
            secret: SecretString::new(value),
            kind,
        };

        self.records.lock().unwrap().insert(id, record);
        Ok(id)
    }
}

/// Mock secret store for testing.
#[derive(Default)]
pub struct MockSecretStore {
    inner: InMemorySecretStore,
    get_history: Mutex<Vec<SecretId>>,
    put_history: Mutex<Vec<SecretKind>>,
    next_error: Mutex<Option<LifecycleError>>,
}

impl MockSecretStore {
    /// Create a new mock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the next error to return.
    pub fn set_next_error(&self, error: LifecycleError) -> &Self {
        *self.next_error.lock().unwrap() = Some(error);
        self
    }

    /// Get retrieval history.
    pub fn get_history(&self) -> Vec<SecretId> {
        self.get_history.lock().unwrap().clone()
    }

    /// Get write history.
    pub fn put_history(&self) -> Vec<SecretKind> {
        self.put_history.lock().unwrap().clone()
    }

    fn check_error(&self) -> Result<(), LifecycleError> {
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Err(error);
        }
        Ok(())
    }
}

#[async_trait]
impl SecretStore for MockSecretStore {
    async fn get(&self, id: SecretId) -> Result<SecretRecord, LifecycleError> {
        self.check_error()?;
        self.get_history.lock().unwrap().push(id);
        self.inner.get(id).await
    }

    async fn put(&self, secret: &[u8], kind: SecretKind) -> Result<SecretId, LifecycleError> {
        self.check_error()?;
        self.put_history.lock().unwrap().push(kind);
        self.inner.put(secret, kind).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use secrecy::ExposeSecret;

    #[tokio::test]
    async fn test_put_and_get_roundtrip() {
        let store = InMemorySecretStore::new();

        let id = store.put(b"refresh-token-value", SecretKind::Token).await.unwrap();
        let record = store.get(id).await.unwrap();

        assert_eq!(record.id, id);
        assert_eq!(record.secret.expose_secret(), "refresh-token-value");
        assert_eq!(record.kind, SecretKind::Token);
    }

    #[tokio::test]
    async fn test_get_missing_record() {
        let store = InMemorySecretStore::new();

        let err = store.get(SecretId(42)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_rotation_writes_new_record() {
        let store = InMemorySecretStore::new();

        let first = store.put(b"old-refresh", SecretKind::Token).await.unwrap();
        let second = store.put(b"new-refresh", SecretKind::Token).await.unwrap();

        assert_ne!(first, second);
        // The old record stays retrievable, untouched.
        assert_eq!(
            store.get(first).await.unwrap().secret.expose_secret(),
            "old-refresh"
        );
        assert_eq!(
            store.get(second).await.unwrap().secret.expose_secret(),
            "new-refresh"
        );
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_null_byte_rejected() {
        let store = InMemorySecretStore::new();

        let err = store.put(b"bad\x00token", SecretKind::Token).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSecret);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_utf8_rejected() {
        let store = InMemorySecretStore::new();

        let err = store.put(&[0xff, 0xfe, 0x41], SecretKind::Token).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSecret);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_mock_histories_and_error_injection() {
        let store = MockSecretStore::new();

        let id = store.put(b"value", SecretKind::Token).await.unwrap();
        store.get(id).await.unwrap();

        assert_eq!(store.put_history(), vec![SecretKind::Token]);
        assert_eq!(store.get_history(), vec![id]);

        store.set_next_error(SecretError::NotFound { id: SecretId(9) }.into());
        assert!(store.get(id).await.is_err());
        // Error consumed; next call succeeds again.
        assert!(store.get(id).await.is_ok());
    }
}
