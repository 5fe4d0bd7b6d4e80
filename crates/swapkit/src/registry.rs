//! Token/chain registry cache.
//!
//! Holds the last known [`RegistrySnapshot`], reloads it from durable
//! storage at startup and refreshes it from an [`SdkInfoSource`] when it
//! goes stale. Refreshes are single-flight: callers arriving while a refresh
//! is running share its outcome.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::error::RegistryError;
use crate::ordering;
use crate::storage::Storage;
use crate::types::chain::Chain;
use crate::types::snapshot::{RegistrySnapshot, SdkInfo};
use crate::types::token::{Token, TokenKey};

/// Storage key of the persisted snapshot.
pub const REGISTRY_STORAGE_KEY: &str = "swapkit.registry.v1";

/// Where the token and chain lists come from (`GET /v2/sdk-info`).
#[async_trait]
pub trait SdkInfoSource: Send + Sync {
    async fn fetch_sdk_info(&self) -> Result<SdkInfo, RegistryError>;
}

type RefreshOutcome = Result<Arc<RegistrySnapshot>, RegistryError>;

pub struct RegistryCache {
    source: Arc<dyn SdkInfoSource>,
    storage: Arc<dyn Storage>,
    ttl_secs: u64,
    snapshot: RwLock<Arc<RegistrySnapshot>>,
    /// Serializes refreshes and remembers the outcome of the last one.
    refresh_lock: Mutex<Option<RefreshOutcome>>,
    /// Number of completed refresh attempts.
    refreshes: AtomicU64,
}

impl RegistryCache {
    /// Build the cache and load any persisted snapshot.
    pub fn init(
        source: Arc<dyn SdkInfoSource>,
        storage: Arc<dyn Storage>,
        config: &Config,
    ) -> Self {
        let snapshot = load_snapshot(storage.as_ref());
        tracing::debug!(
            "registry loaded {} tokens, {} chains (fetched at {})",
            snapshot.tokens.len(),
            snapshot.chains.len(),
            snapshot.fetched_at_epoch_seconds
        );
        Self {
            source,
            storage,
            ttl_secs: config.registry_ttl_secs,
            snapshot: RwLock::new(Arc::new(snapshot)),
            refresh_lock: Mutex::new(None),
            refreshes: AtomicU64::new(0),
        }
    }

    /// Last known snapshot. Empty if nothing was ever fetched.
    pub fn current_snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_stale(&self) -> bool {
        self.current_snapshot()
            .is_stale(now_epoch_seconds(), self.ttl_secs)
    }

    /// Refresh if the snapshot is stale or has never been fetched.
    pub async fn ensure_fresh(&self) -> Result<Arc<RegistrySnapshot>, RegistryError> {
        self.refresh(false).await
    }

    /// Fetch a new snapshot. Without `force`, a fresh snapshot is returned
    /// as is.
    pub async fn refresh(&self, force: bool) -> Result<Arc<RegistrySnapshot>, RegistryError> {
        let seen = self.refreshes.load(Ordering::SeqCst);
        let mut last = self.refresh_lock.lock().await;

        // Another caller refreshed while we were waiting: share its outcome.
        if self.refreshes.load(Ordering::SeqCst) != seen {
            if let Some(outcome) = last.as_ref() {
                return outcome.clone();
            }
        }

        if !force {
            let current = self.current_snapshot();
            if !current.is_stale(now_epoch_seconds(), self.ttl_secs) {
                return Ok(current);
            }
        }

        tracing::debug!("refreshing token registry (force={})", force);
        let outcome = match self.source.fetch_sdk_info().await {
            Ok(info) => {
                let snapshot = Arc::new(info.into_snapshot(now_epoch_seconds()));
                tracing::info!(
                    "registry refreshed: {} tokens, {} chains",
                    snapshot.tokens.len(),
                    snapshot.chains.len()
                );
                self.persist(&snapshot);
                *self.snapshot.write().unwrap_or_else(|e| e.into_inner()) = snapshot.clone();
                Ok(snapshot)
            }
            Err(e) => {
                tracing::warn!("registry refresh failed: {}", e);
                Err(e)
            }
        };

        *last = Some(outcome.clone());
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        outcome
    }

    /// Tokens on `chain_id`, native placeholder excluded, in display order.
    pub fn tokens_for_chain(&self, chain_id: &str) -> Vec<Token> {
        let snapshot = self.current_snapshot();
        let mut tokens: Vec<Token> = snapshot
            .tokens
            .iter()
            .filter(|t| t.chain_id == chain_id && !t.is_native())
            .cloned()
            .collect();
        ordering::sort_tokens(&mut tokens);
        tokens
    }

    pub fn chains(&self) -> Vec<Chain> {
        self.current_snapshot().chains.clone()
    }

    /// Look up a chain by its numeric chain id.
    pub fn chain(&self, chain_id: &str) -> Option<Chain> {
        self.current_snapshot()
            .chains
            .iter()
            .find(|c| c.chain_id == chain_id)
            .cloned()
    }

    /// Look up a token by `(chain_id, address)`, address in any case.
    pub fn find_token(&self, chain_id: &str, address: &str) -> Option<Token> {
        let key = TokenKey::new(chain_id, address);
        self.current_snapshot()
            .tokens
            .iter()
            .find(|t| t.key() == key)
            .cloned()
    }

    /// Persist the current snapshot one last time.
    pub fn teardown(&self) {
        let snapshot = self.current_snapshot();
        if !snapshot.is_empty() {
            self.persist(&snapshot);
        }
    }

    fn persist(&self, snapshot: &RegistrySnapshot) {
        let result = serde_json::to_string(snapshot)
            .map_err(Into::into)
            .and_then(|json| self.storage.set(REGISTRY_STORAGE_KEY, &json));
        if let Err(e) = result {
            tracing::warn!("failed to persist registry snapshot: {}", e);
        }
    }
}

fn load_snapshot(storage: &dyn Storage) -> RegistrySnapshot {
    match storage.get(REGISTRY_STORAGE_KEY) {
        Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
            tracing::warn!("discarding corrupt registry snapshot: {}", e);
            RegistrySnapshot::default()
        }),
        Ok(None) => RegistrySnapshot::default(),
        Err(e) => {
            tracing::warn!("failed to read registry snapshot: {}", e);
            RegistrySnapshot::default()
        }
    }
}

pub(crate) fn now_epoch_seconds() -> u64 {
    time::OffsetDateTime::now_utc().unix_timestamp().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::storage::MemoryStorage;
    use crate::types::chain::NativeCurrency;
    use crate::types::token::NATIVE_TOKEN_ADDRESS;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn token(chain_id: &str, address: &str, symbol: &str) -> Token {
        Token {
            address: address.to_string(),
            chain_id: chain_id.to_string(),
            coingecko_id: None,
            decimals: 18,
            logo_uri: None,
            name: symbol.to_string(),
            symbol: symbol.to_string(),
        }
    }

    fn sample_info() -> SdkInfo {
        SdkInfo {
            tokens: vec![
                token("1", "0x01", "WETH"),
                token("1", NATIVE_TOKEN_ADDRESS, "ETH"),
                token("1", "0x02", "USDC"),
                token("56", "0x03", "USDT"),
            ],
            chains: vec![Chain {
                id: "ethereum".to_string(),
                chain_id: "1".to_string(),
                network_name: "Ethereum".to_string(),
                chain_icon_uri: None,
                native_currency: NativeCurrency {
                    name: "Ether".to_string(),
                    symbol: "ETH".to_string(),
                },
                is_testnet: false,
            }],
        }
    }

    struct MockSource {
        calls: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    impl MockSource {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::from_millis(50),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SdkInfoSource for MockSource {
        async fn fetch_sdk_info(&self) -> Result<SdkInfo, RegistryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                Err(RegistryError::Status { status: 502 })
            } else {
                Ok(sample_info())
            }
        }
    }

    struct BrokenStorage;

    impl Storage for BrokenStorage {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(std::io::Error::other("disk on fire").into())
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(std::io::Error::other("disk on fire").into())
        }
        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    fn seeded_storage(fetched_at: u64) -> Arc<MemoryStorage> {
        let storage = Arc::new(MemoryStorage::new());
        let snapshot = sample_info().into_snapshot(fetched_at);
        storage
            .set(REGISTRY_STORAGE_KEY, &serde_json::to_string(&snapshot).unwrap())
            .unwrap();
        storage
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_refresh_fetches_and_persists() {
        let source = Arc::new(MockSource::new());
        let storage = Arc::new(MemoryStorage::new());
        let cache = RegistryCache::init(source.clone(), storage.clone(), &Config::default());

        assert!(cache.current_snapshot().is_empty());
        assert!(cache.is_stale());

        let snapshot = cache.ensure_fresh().await.unwrap();
        assert_eq!(snapshot.tokens.len(), 4);
        assert_eq!(source.calls(), 1);

        let persisted = storage.get(REGISTRY_STORAGE_KEY).unwrap().unwrap();
        let persisted: RegistrySnapshot = serde_json::from_str(&persisted).unwrap();
        assert_eq!(&persisted, snapshot.as_ref());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_snapshot_skips_fetch_unless_forced() {
        let source = Arc::new(MockSource::new());
        let storage = seeded_storage(now_epoch_seconds() - 3_600);
        let cache = RegistryCache::init(source.clone(), storage, &Config::default());

        cache.ensure_fresh().await.unwrap();
        assert_eq!(source.calls(), 0);

        cache.refresh(true).await.unwrap();
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_snapshot_concurrent_callers_share_one_fetch() {
        let source = Arc::new(MockSource::new());
        let storage = seeded_storage(now_epoch_seconds() - 25 * 3_600);
        let cache = RegistryCache::init(source.clone(), storage, &Config::default());
        assert!(cache.is_stale());

        let (a, b) = tokio::join!(cache.ensure_fresh(), cache.ensure_fresh());
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(source.calls(), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!cache.is_stale());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_is_shared_and_keeps_snapshot() {
        let source = Arc::new(MockSource::failing());
        let fetched_at = now_epoch_seconds() - 25 * 3_600;
        let storage = seeded_storage(fetched_at);
        let cache = RegistryCache::init(source.clone(), storage, &Config::default());

        let (a, b) = tokio::join!(cache.ensure_fresh(), cache.ensure_fresh());
        assert_eq!(a, Err(RegistryError::Status { status: 502 }));
        assert_eq!(b, Err(RegistryError::Status { status: 502 }));
        assert_eq!(source.calls(), 1);
        assert_eq!(cache.current_snapshot().fetched_at_epoch_seconds, fetched_at);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_stale_refresh_fetches_again() {
        let source = Arc::new(MockSource::failing());
        let cache = RegistryCache::init(
            source.clone(),
            Arc::new(MemoryStorage::new()),
            &Config::default(),
        );
        assert!(cache.ensure_fresh().await.is_err());
        assert!(cache.ensure_fresh().await.is_err());
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn test_corrupt_storage_reads_as_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(REGISTRY_STORAGE_KEY, "{not json").unwrap();
        let cache = RegistryCache::init(Arc::new(MockSource::new()), storage, &Config::default());
        assert!(cache.current_snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_storage_failures_are_not_fatal() {
        let source = Arc::new(MockSource::new());
        let cache = RegistryCache::init(source.clone(), Arc::new(BrokenStorage), &Config::default());
        assert!(cache.current_snapshot().is_empty());

        let snapshot = cache.ensure_fresh().await.unwrap();
        assert_eq!(snapshot.chains.len(), 1);
        cache.teardown();
    }

    #[test]
    fn test_tokens_for_chain_filters_and_sorts() {
        let storage = seeded_storage(now_epoch_seconds());
        let cache = RegistryCache::init(Arc::new(MockSource::new()), storage, &Config::default());

        let tokens = cache.tokens_for_chain("1");
        let symbols: Vec<&str> = tokens.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["USDC", "WETH"]);
        assert!(tokens.iter().all(|t| !t.is_native()));
        assert!(cache.tokens_for_chain("999").is_empty());
    }

    #[test]
    fn test_lookups() {
        let storage = seeded_storage(now_epoch_seconds());
        let cache = RegistryCache::init(Arc::new(MockSource::new()), storage, &Config::default());

        assert_eq!(cache.chain("1").unwrap().network_name, "Ethereum");
        assert!(cache.chain("56").is_none());
        assert_eq!(cache.chains().len(), 1);
        assert_eq!(cache.find_token("56", "0X03").unwrap().symbol, "USDT");
        assert!(cache.find_token("1", "0x03").is_none());
    }
}
