//! Token Lifecycle Manager
//!
//! Orchestrates access-token acquisition per account: cache fast path,
//! refresh-token exchange and validation on the slow path, bounded
//! re-mint on rejection, and refresh-token rotation.

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use std::sync::Arc;

use crate::error::{LifecycleError, ProviderError};
use crate::provider::{ProviderAdapter, ProviderRegistry};
use crate::secrets::{SecretId, SecretKind, SecretStore};
use crate::telemetry::LifecycleObserver;
use crate::token::TokenCache;
use crate::types::{Account, AccountId, CachedToken};

/// Token lifecycle orchestrator.
///
/// Accounts are independent units of concurrency: concurrent calls for
/// one account collapse into a single refresh, unrelated accounts never
/// serialize. Every classified error is reported to the observer once,
/// with account context, before being returned.
pub struct TokenLifecycleManager<S: SecretStore> {
    providers: ProviderRegistry,
    secrets: Arc<S>,
    cache: Arc<TokenCache>,
    observer: Arc<dyn LifecycleObserver>,
}

impl<S: SecretStore> TokenLifecycleManager<S> {
    /// Create a new manager.
    pub fn new(
        providers: ProviderRegistry,
        secrets: Arc<S>,
        cache: Arc<TokenCache>,
        observer: Arc<dyn LifecycleObserver>,
    ) -> Self {
        Self {
            providers,
            secrets,
            cache,
            observer,
        }
    }

    /// Get a live access token for the account, minting one on cache
    /// miss or expiry.
    pub async fn get_access_token(&self, account: &Account) -> Result<String, LifecycleError> {
        if let Some(cached) = self.cache.lookup(&account.id) {
            return Ok(cached.access_token);
        }

        Ok(self.obtain(account).await?.access_token)
    }

    /// Get the cached token's expiry instant, minting first if absent.
    pub async fn get_expiry(&self, account: &Account) -> Result<DateTime<Utc>, LifecycleError> {
        if let Some(cached) = self.cache.lookup(&account.id) {
            return Ok(cached.expires_at);
        }

        Ok(self.obtain(account).await?.expires_at)
    }

    /// Discard any cached token and mint a fresh one.
    ///
    /// For callers that independently know the cached token is stale,
    /// e.g. after a 401 from the provider's own API.
    pub async fn renew_access_token(&self, account: &Account) -> Result<String, LifecycleError> {
        self.cache.invalidate(&account.id);
        Ok(self.obtain(account).await?.access_token)
    }

    /// Validate whatever token is currently applicable.
    ///
    /// A cached, unexpired token is validated directly; when the
    /// provider rejects it, the entry is evicted and re-minted exactly
    /// once (the mint path re-validates). A failure after that single
    /// re-mint is surfaced, never retried further. With no cached token,
    /// one is minted first and its validity returned.
    pub async fn verify(&self, account: &Account) -> Result<bool, LifecycleError> {
        let mut reminted = false;
        loop {
            let Some(cached) = self.cache.lookup(&account.id) else {
                self.obtain(account).await?;
                return Ok(true);
            };

            let adapter = self.adapter_for(account)?;
            let verdict = self.report(
                &account.id,
                adapter.validate_token(&cached.access_token).await,
            );

            match verdict {
                Ok(true) => return Ok(true),
                Ok(false) => {
                    self.cache.invalidate(&account.id);
                    if reminted {
                        return Ok(false);
                    }
                    reminted = true;
                }
                Err(err) if err.is_auth_failure() && !reminted => {
                    self.cache.invalidate(&account.id);
                    reminted = true;
                }
                Err(err) => {
                    if err.is_auth_failure() {
                        self.cache.invalidate(&account.id);
                    }
                    return Err(err);
                }
            }
        }
    }

    /// Rotate the account's refresh token.
    ///
    /// The value is validated, written as a brand-new immutable record,
    /// and the account's reference repointed. Existing records are never
    /// mutated; on failure the account's reference is left unchanged.
    pub async fn rotate_refresh_token(
        &self,
        account: &mut Account,
        value: impl AsRef<[u8]>,
    ) -> Result<SecretId, LifecycleError> {
        let id = self.report(
            &account.id,
            self.secrets.put(value.as_ref(), SecretKind::Token).await,
        )?;

        account.refresh_token_id = id;
        Ok(id)
    }

    async fn obtain(&self, account: &Account) -> Result<CachedToken, LifecycleError> {
        self.cache
            .singleflight(&account.id, || self.mint(account))
            .await
    }

    async fn mint(&self, account: &Account) -> Result<CachedToken, LifecycleError> {
        let result = self.mint_inner(account).await;
        self.observer.record_refresh(&account.id, result.is_ok());
        result
    }

    async fn mint_inner(&self, account: &Account) -> Result<CachedToken, LifecycleError> {
        let adapter = self.adapter_for(account)?;

        let record = self.report(
            &account.id,
            self.secrets.get(account.refresh_token_id).await,
        )?;

        let minted = self.report(
            &account.id,
            adapter
                .new_token(
                    record.secret.expose_secret(),
                    &account.client_id,
                    &account.client_secret,
                )
                .await,
        )?;

        // Confirm liveness with the provider before caching; a token
        // failing immediate validation is discarded.
        let live = self.report(
            &account.id,
            adapter.validate_token(&minted.access_token).await,
        )?;
        if !live {
            let err = LifecycleError::Provider(ProviderError::Validation {
                message: "freshly minted token reported inactive".to_string(),
            });
            self.observer.record_error(&account.id, &err);
            return Err(err);
        }

        self.report(&account.id, self.cache.store(&account.id, &minted))
    }

    fn adapter_for(&self, account: &Account) -> Result<Arc<dyn ProviderAdapter>, LifecycleError> {
        self.report(&account.id, self.providers.resolve(&account.provider))
    }

    fn report<T>(
        &self,
        account: &AccountId,
        result: Result<T, LifecycleError>,
    ) -> Result<T, LifecycleError> {
        if let Err(err) = &result {
            self.observer.record_error(account, err);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConnectionError, ErrorKind};
    use crate::provider::MockProviderAdapter;
    use crate::secrets::InMemorySecretStore;
    use crate::telemetry::InMemoryObserver;
    use crate::types::{MintedToken, Provider};
    use chrono::Duration;

    struct Fixture {
        manager: Arc<TokenLifecycleManager<InMemorySecretStore>>,
        adapter: Arc<MockProviderAdapter>,
        secrets: Arc<InMemorySecretStore>,
        observer: Arc<InMemoryObserver>,
        cache: Arc<TokenCache>,
        account: Account,
    }

    async fn fixture() -> Fixture {
        let secrets = Arc::new(InMemorySecretStore::new());
        let refresh_id = secrets
            .put(b"refresh-secret", SecretKind::Token)
            .await
            .unwrap();

        let adapter = Arc::new(MockProviderAdapter::new());
        let providers =
            ProviderRegistry::new().register(Provider::new("gmail"), adapter.clone());

        let cache = Arc::new(TokenCache::new());
        let observer = Arc::new(InMemoryObserver::new());
        let manager = Arc::new(TokenLifecycleManager::new(
            providers,
            secrets.clone(),
            cache.clone(),
            observer.clone(),
        ));

        let account = Account::new(
            AccountId::new("acct-1"),
            Provider::new("gmail"),
            "client-1",
            "app-secret",
            refresh_id,
        );

        Fixture {
            manager,
            adapter,
            secrets,
            observer,
            cache,
            account,
        }
    }

    #[tokio::test]
    async fn test_mints_on_first_use() {
        let f = fixture().await;

        let token = f.manager.get_access_token(&f.account).await.unwrap();

        assert_eq!(token, "minted-token-1");
        assert_eq!(f.adapter.mint_calls(), 1);
        // The mint used the stored refresh token and account credentials.
        let request = &f.adapter.mint_history()[0];
        assert_eq!(request.refresh_token, "refresh-secret");
        assert_eq!(request.client_id, "client-1");
        // Validated before caching.
        assert_eq!(f.adapter.validate_history(), vec!["minted-token-1"]);
        assert!(f.observer.errors().is_empty());
    }

    #[tokio::test]
    async fn test_cache_hit_skips_provider() {
        let f = fixture().await;

        let first = f.manager.get_access_token(&f.account).await.unwrap();
        let second = f.manager.get_access_token(&f.account).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(f.adapter.mint_calls(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_triggers_single_new_mint() {
        let f = fixture().await;
        let stale_mint_time = Utc::now() - Duration::seconds(4000);
        f.cache
            .store_at(
                stale_mint_time,
                &f.account.id,
                &MintedToken::new("stale-token", 3600),
            )
            .unwrap();

        let token = f.manager.get_access_token(&f.account).await.unwrap();

        assert_eq!(token, "minted-token-1");
        assert_eq!(f.adapter.mint_calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_collapse_into_one_mint() {
        let f = fixture().await;
        f.adapter
            .set_mint_delay(std::time::Duration::from_millis(50));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = f.manager.clone();
            let account = f.account.clone();
            handles.push(tokio::spawn(async move {
                manager.get_access_token(&account).await
            }));
        }

        let mut tokens = Vec::new();
        for handle in handles {
            tokens.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(f.adapter.mint_calls(), 1);
        assert!(tokens.iter().all(|t| t == &tokens[0]));
    }

    #[tokio::test]
    async fn test_invalid_grant_is_fatal_and_reported_once() {
        let f = fixture().await;
        f.adapter.push_mint(Err(LifecycleError::Provider(
            ProviderError::InvalidGrant {
                message: "token revoked".to_string(),
            },
        )));

        let err = f.manager.get_access_token(&f.account).await.unwrap_err();

        assert!(err.needs_reauthorization());
        let events = f.observer.errors_for(&f.account.id);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ErrorKind::InvalidGrant);
        assert_eq!(
            f.observer.refreshes().last().map(|r| r.success),
            Some(false)
        );
    }

    #[tokio::test]
    async fn test_inactive_minted_token_is_not_cached() {
        let f = fixture().await;
        f.adapter.push_validate(Ok(false));

        let err = f.manager.get_access_token(&f.account).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(f.cache.lookup(&f.account.id).is_none());
    }

    #[tokio::test]
    async fn test_short_lived_mint_rejected_on_arrival() {
        let f = fixture().await;
        f.adapter.push_mint(Ok(MintedToken::new("brief-token", 10)));

        let err = f.manager.get_access_token(&f.account).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ExpiredOnArrival);
        assert!(f.cache.lookup(&f.account.id).is_none());
        assert_eq!(
            f.observer.errors_for(&f.account.id)[0].kind,
            ErrorKind::ExpiredOnArrival
        );
    }

    #[tokio::test]
    async fn test_missing_secret_record_propagates() {
        let f = fixture().await;
        let mut account = f.account.clone();
        account.refresh_token_id = SecretId(999);

        let err = f.manager.get_access_token(&account).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(f.adapter.mint_calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_provider_is_configuration_error() {
        let f = fixture().await;
        let mut account = f.account.clone();
        account.provider = Provider::new("unregistered");

        let err = f.manager.get_access_token(&account).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_get_expiry_mints_when_absent() {
        let f = fixture().await;

        let expiry = f.manager.get_expiry(&f.account).await.unwrap();

        assert_eq!(f.adapter.mint_calls(), 1);
        assert!(expiry > Utc::now() + Duration::seconds(3500));

        // Subsequent call reads the cached expiry.
        assert_eq!(f.manager.get_expiry(&f.account).await.unwrap(), expiry);
        assert_eq!(f.adapter.mint_calls(), 1);
    }

    #[tokio::test]
    async fn test_renew_discards_cached_token() {
        let f = fixture().await;

        let first = f.manager.get_access_token(&f.account).await.unwrap();
        let renewed = f.manager.renew_access_token(&f.account).await.unwrap();

        assert_eq!(first, "minted-token-1");
        assert_eq!(renewed, "minted-token-2");
        assert_eq!(f.adapter.mint_calls(), 2);
    }

    #[tokio::test]
    async fn test_verify_valid_cached_token() {
        let f = fixture().await;
        f.manager.get_access_token(&f.account).await.unwrap();

        assert!(f.manager.verify(&f.account).await.unwrap());
        assert_eq!(f.adapter.mint_calls(), 1);
    }

    #[tokio::test]
    async fn test_verify_mints_when_no_cached_token() {
        let f = fixture().await;

        assert!(f.manager.verify(&f.account).await.unwrap());
        assert_eq!(f.adapter.mint_calls(), 1);
    }

    #[tokio::test]
    async fn test_verify_remints_exactly_once_on_rejection() {
        let f = fixture().await;
        f.manager.get_access_token(&f.account).await.unwrap();

        f.adapter.push_validate(Err(LifecycleError::Provider(
            ProviderError::Validation {
                message: "token no longer active".to_string(),
            },
        )));

        assert!(f.manager.verify(&f.account).await.unwrap());
        assert_eq!(f.adapter.mint_calls(), 2);
        assert_eq!(
            f.cache.lookup(&f.account.id).unwrap().access_token,
            "minted-token-2"
        );
    }

    #[tokio::test]
    async fn test_verify_surfaces_error_after_single_remint() {
        let f = fixture().await;
        f.manager.get_access_token(&f.account).await.unwrap();

        // Cached token rejected, then the re-minted token as well.
        f.adapter.push_validate(Err(LifecycleError::Provider(
            ProviderError::Validation {
                message: "rejected".to_string(),
            },
        )));
        f.adapter.push_validate(Err(LifecycleError::Provider(
            ProviderError::Validation {
                message: "still rejected".to_string(),
            },
        )));

        let err = f.manager.verify(&f.account).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(f.adapter.mint_calls(), 2);
    }

    #[tokio::test]
    async fn test_verify_remints_on_inactive_verdict() {
        let f = fixture().await;
        f.manager.get_access_token(&f.account).await.unwrap();

        f.adapter.push_validate(Ok(false));

        assert!(f.manager.verify(&f.account).await.unwrap());
        assert_eq!(f.adapter.mint_calls(), 2);
    }

    #[tokio::test]
    async fn test_verify_propagates_connection_error_without_remint() {
        let f = fixture().await;
        f.manager.get_access_token(&f.account).await.unwrap();

        f.adapter.push_validate(Err(LifecycleError::Connection(
            ConnectionError::Failed {
                message: "provider unreachable".to_string(),
            },
        )));

        let err = f.manager.verify(&f.account).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Connection);
        assert_eq!(f.adapter.mint_calls(), 1);
        // The cached token survives a transient validation outage.
        assert!(f.cache.lookup(&f.account.id).is_some());
    }

    #[tokio::test]
    async fn test_rotation_writes_new_record_and_repoints() {
        let f = fixture().await;
        let mut account = f.account.clone();
        let old_id = account.refresh_token_id;

        let new_id = f
            .manager
            .rotate_refresh_token(&mut account, b"next-refresh")
            .await
            .unwrap();

        assert_ne!(new_id, old_id);
        assert_eq!(account.refresh_token_id, new_id);

        // The previous record is untouched and still retrievable.
        let old_record = f.secrets.get(old_id).await.unwrap();
        assert_eq!(old_record.secret.expose_secret(), "refresh-secret");

        // The next mint uses the rotated value.
        f.manager.get_access_token(&account).await.unwrap();
        assert_eq!(f.adapter.mint_history()[0].refresh_token, "next-refresh");
    }

    #[tokio::test]
    async fn test_rotation_rejects_invalid_bytes() {
        let f = fixture().await;
        let mut account = f.account.clone();
        let old_id = account.refresh_token_id;

        let err = f
            .manager
            .rotate_refresh_token(&mut account, b"bad\x00token")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSecret);
        assert_eq!(account.refresh_token_id, old_id);

        let err = f
            .manager
            .rotate_refresh_token(&mut account, &[0xff, 0xfe][..])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSecret);
        assert_eq!(account.refresh_token_id, old_id);

        assert_eq!(f.observer.errors_for(&account.id).len(), 2);
    }
}
