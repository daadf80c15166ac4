//! Token Cache
//!
//! Process-wide volatile store mapping account identity to a cached
//! access token with absolute expiry. Entries are striped across shard
//! locks so unrelated accounts never serialize, and concurrent misses
//! for one account collapse into a single in-flight refresh.

use chrono::{DateTime, Duration, Utc};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

use crate::error::LifecycleError;
use crate::types::{AccountId, CachedToken, MintedToken};

/// Seconds subtracted from a token's reported lifetime, absorbing clock
/// and propagation skew between this process and the provider.
pub const SAFETY_MARGIN_SECS: i64 = 10;

const SHARD_COUNT: usize = 16;

type Flight = Arc<OnceCell<Result<CachedToken, LifecycleError>>>;

/// Concurrency-safe access-token cache.
pub struct TokenCache {
    shards: Vec<Mutex<HashMap<AccountId, CachedToken>>>,
    flights: Mutex<HashMap<AccountId, Flight>>,
}

impl TokenCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT)
                .map(|_| Mutex::new(HashMap::new()))
                .collect(),
            flights: Mutex::new(HashMap::new()),
        }
    }

    fn shard(&self, account: &AccountId) -> &Mutex<HashMap<AccountId, CachedToken>> {
        let mut hasher = DefaultHasher::new();
        account.hash(&mut hasher);
        &self.shards[hasher.finish() as usize % SHARD_COUNT]
    }

    /// Look up the live token for an account.
    ///
    /// An entry whose expiry has passed is a miss and is evicted as part
    /// of the lookup; entries are never proactively swept.
    pub fn lookup(&self, account: &AccountId) -> Option<CachedToken> {
        self.lookup_at(Utc::now(), account)
    }

    pub(crate) fn lookup_at(&self, now: DateTime<Utc>, account: &AccountId) -> Option<CachedToken> {
        let mut shard = self.shard(account).lock().unwrap();
        match shard.get(account) {
            Some(entry) if entry.expires_at <= now => {
                shard.remove(account);
                None
            }
            Some(entry) => Some(entry.clone()),
            None => None,
        }
    }

    /// Store a freshly minted token, applying the safety margin.
    ///
    /// A token whose effective lifetime after the margin is non-positive
    /// is rejected with `ExpiredOnArrival` and nothing is stored.
    pub fn store(
        &self,
        account: &AccountId,
        minted: &MintedToken,
    ) -> Result<CachedToken, LifecycleError> {
        self.store_at(Utc::now(), account, minted)
    }

    pub(crate) fn store_at(
        &self,
        now: DateTime<Utc>,
        account: &AccountId,
        minted: &MintedToken,
    ) -> Result<CachedToken, LifecycleError> {
        let effective_secs = minted.lifetime_secs as i64 - SAFETY_MARGIN_SECS;
        if effective_secs <= 0 {
            return Err(LifecycleError::ExpiredOnArrival {
                lifetime_secs: minted.lifetime_secs,
                margin_secs: SAFETY_MARGIN_SECS as u64,
            });
        }

        let entry = CachedToken {
            access_token: minted.access_token.clone(),
            expires_at: now + Duration::seconds(effective_secs),
        };

        self.shard(account)
            .lock()
            .unwrap()
            .insert(account.clone(), entry.clone());
        Ok(entry)
    }

    /// Force eviction of an account's token.
    pub fn invalidate(&self, account: &AccountId) -> bool {
        self.shard(account)
            .lock()
            .unwrap()
            .remove(account)
            .is_some()
    }

    /// Run `refresh` unless an identical refresh is already in flight.
    ///
    /// Concurrent misses for the same account share a single refresh;
    /// every waiter observes its result, success or error. Dropping a
    /// waiter never cancels the shared refresh: if the caller driving it
    /// goes away, a waiting caller takes over with its own `refresh`.
    /// The flight is retired once finished, so a later miss starts anew.
    pub async fn singleflight<F, Fut>(
        &self,
        account: &AccountId,
        refresh: F,
    ) -> Result<CachedToken, LifecycleError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CachedToken, LifecycleError>>,
    {
        if let Some(hit) = self.lookup(account) {
            return Ok(hit);
        }

        let flight = {
            let mut flights = self.flights.lock().unwrap();
            flights.entry(account.clone()).or_default().clone()
        };

        let result = flight
            .get_or_init(|| async {
                // A finished flight may have repopulated the entry
                // between our miss and winning the initialization.
                if let Some(hit) = self.lookup(account) {
                    return Ok(hit);
                }
                refresh().await
            })
            .await
            .clone();

        let mut flights = self.flights.lock().unwrap();
        if let Some(current) = flights.get(account) {
            if Arc::ptr_eq(current, &flight) {
                flights.remove(account);
            }
        }

        result
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}
