// End-to-end tests for the cache and refresh coordinator against a mock
// chain reader.

use async_trait::async_trait;
use chain::{RetryConfig, TokenReader};
use num_bigint::BigUint;
use portfolio::{BalanceTracker, Criteria, MetadataCache};
use shared::config::MetadataConfig;
use shared::models::TokenDescriptor;
use shared::{Error, PriceFeedService, Result};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

const OWNER: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const OTHER_OWNER: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
const USDC: &str = "0x1000000000000000000000000000000000000001";
const WETH: &str = "0x1000000000000000000000000000000000000002";
const NOT_A_TOKEN: &str = "0x1000000000000000000000000000000000000003";
const FLAKY: &str = "0x1000000000000000000000000000000000000004";

#[derive(Default)]
struct MockReader {
    metadata_calls: AtomicU32,
    descriptors: HashMap<String, TokenDescriptor>,
    balances: HashMap<(String, String), BigUint>,
    native: HashMap<String, BigUint>,
    no_code: HashSet<String>,
    flaky: HashSet<String>,
    metadata_delay: Duration,
    slow_owners: HashSet<String>,
}

impl MockReader {
    fn with_token(mut self, contract: &str, symbol: &str, decimals: u8) -> Self {
        self.descriptors.insert(
            contract.to_string(),
            TokenDescriptor {
                contract: contract.to_string(),
                name: format!("{} Token", symbol),
                symbol: symbol.to_string(),
                decimals,
            },
        );
        self
    }

    fn with_balance(mut self, contract: &str, owner: &str, raw: u128) -> Self {
        self.balances
            .insert((contract.to_string(), owner.to_string()), BigUint::from(raw));
        self
    }

    fn with_native(mut self, owner: &str, raw: u128) -> Self {
        self.native.insert(owner.to_string(), BigUint::from(raw));
        self
    }

    fn with_no_code(mut self, contract: &str) -> Self {
        self.no_code.insert(contract.to_string());
        self
    }

    fn with_flaky(mut self, contract: &str) -> Self {
        self.flaky.insert(contract.to_string());
        self
    }

    fn with_metadata_delay(mut self, delay: Duration) -> Self {
        self.metadata_delay = delay;
        self
    }

    fn with_slow_owner(mut self, owner: &str) -> Self {
        self.slow_owners.insert(owner.to_string());
        self
    }

    async fn owner_latency(&self, owner: &str) {
        if self.slow_owners.contains(owner) {
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
    }

    fn metadata_call_count(&self) -> u32 {
        self.metadata_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenReader for MockReader {
    async fn native_balance(&self, owner: &str) -> Result<BigUint> {
        self.owner_latency(owner).await;
        self.native
            .get(owner)
            .cloned()
            .ok_or_else(|| Error::UnreachableProvider("native lookup failed".to_string()))
    }

    async fn token_metadata(&self, contract: &str) -> Result<TokenDescriptor> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.metadata_delay).await;

        if self.no_code.contains(contract) {
            return Err(Error::ContractCall("no code at address".to_string()));
        }
        if self.flaky.contains(contract) {
            return Err(Error::UnreachableProvider("connection reset".to_string()));
        }
        self.descriptors
            .get(contract)
            .cloned()
            .ok_or_else(|| Error::ContractCall("no code at address".to_string()))
    }

    async fn token_balance(&self, contract: &str, owner: &str) -> Result<BigUint> {
        self.owner_latency(owner).await;
        if self.no_code.contains(contract) {
            return Err(Error::ContractCall("no code at address".to_string()));
        }
        Ok(self
            .balances
            .get(&(contract.to_string(), owner.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(50),
        backoff_multiplier: 2.0,
    }
}

fn cache_for(reader: &Arc<MockReader>) -> Arc<MetadataCache> {
    Arc::new(MetadataCache::new(
        reader.clone() as Arc<dyn TokenReader>,
        Duration::from_millis(1),
        fast_retry(),
    ))
}

fn tracker_for(reader: &Arc<MockReader>, cache: &Arc<MetadataCache>) -> Arc<BalanceTracker> {
    Arc::new(BalanceTracker::new(
        reader.clone() as Arc<dyn TokenReader>,
        cache.clone(),
        PriceFeedService::new(),
    ))
}

#[tokio::test]
async fn test_cache_hit_issues_no_network_calls() {
    let reader = Arc::new(MockReader::default().with_token(USDC, "USDC", 6));
    let cache = cache_for(&reader);

    let first = cache.resolve(USDC).await.unwrap();
    assert_eq!(first.symbol, "USDC");
    assert_eq!(reader.metadata_call_count(), 1);
    assert!(cache.contains(USDC).await);

    let second = cache.resolve(USDC).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(reader.metadata_call_count(), 1);
}

#[tokio::test]
async fn test_concurrent_resolves_coalesce_into_one_fetch() {
    let reader = Arc::new(
        MockReader::default()
            .with_token(USDC, "USDC", 6)
            .with_metadata_delay(Duration::from_millis(100)),
    );
    let cache = cache_for(&reader);

    let a = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.resolve(USDC).await })
    };
    let b = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.resolve(USDC).await })
    };

    assert!(a.await.unwrap().is_ok());
    assert!(b.await.unwrap().is_ok());
    assert_eq!(reader.metadata_call_count(), 1);
}

#[tokio::test]
async fn test_metadata_retries_exhausted_reports_unavailable() {
    let reader = Arc::new(MockReader::default().with_flaky(FLAKY));
    let cache = cache_for(&reader);

    let result = cache.resolve(FLAKY).await;
    assert!(matches!(result, Err(Error::MetadataUnavailable(_))));
    assert_eq!(reader.metadata_call_count(), 3);
    assert!(!cache.contains(FLAKY).await);
}

#[tokio::test]
async fn test_non_token_address_is_not_retried() {
    let reader = Arc::new(MockReader::default().with_no_code(NOT_A_TOKEN));
    let cache = cache_for(&reader);

    let result = cache.resolve(NOT_A_TOKEN).await;
    assert!(matches!(result, Err(Error::ContractCall(_))));
    assert_eq!(reader.metadata_call_count(), 1);
}

#[tokio::test]
async fn test_cache_from_config_bounds_retry_attempts() {
    let reader = Arc::new(MockReader::default().with_flaky(FLAKY));
    let config = MetadataConfig {
        min_request_interval_ms: 1,
        max_attempts: 2,
        retry_initial_delay_ms: 5,
    };
    let cache = MetadataCache::from_config(reader.clone() as Arc<dyn TokenReader>, &config);

    let result = cache.resolve(FLAKY).await;
    assert!(matches!(result, Err(Error::MetadataUnavailable(_))));
    assert_eq!(reader.metadata_call_count(), 2);
}

#[tokio::test]
async fn test_cache_clear_forces_refetch() {
    let reader = Arc::new(MockReader::default().with_token(USDC, "USDC", 6));
    let cache = cache_for(&reader);

    cache.resolve(USDC).await.unwrap();
    cache.clear().await;
    assert!(!cache.contains(USDC).await);

    cache.resolve(USDC).await.unwrap();
    assert_eq!(reader.metadata_call_count(), 2);
}

#[tokio::test]
async fn test_refresh_omits_non_token_without_failing_batch() {
    let reader = Arc::new(
        MockReader::default()
            .with_token(USDC, "USDC", 6)
            .with_balance(USDC, OWNER, 2_500_000)
            .with_native(OWNER, 1_000_000_000_000_000_000)
            .with_no_code(NOT_A_TOKEN),
    );
    let cache = cache_for(&reader);
    let tracker = tracker_for(&reader, &cache);
    let rx = tracker.subscribe();

    tracker
        .refresh(
            OWNER,
            &[USDC.to_string(), NOT_A_TOKEN.to_string()],
            &Criteria::default(),
        )
        .await;

    let state = rx.borrow().clone();
    assert!(!state.loading);
    assert_eq!(state.error, None);

    let symbols: Vec<_> = state.rows.iter().map(|r| r.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["USDC", "ETH"]);
    assert!(state.rows.iter().all(|r| r.error.is_none()));
    assert!(!state.rows.iter().any(|r| r.contract == NOT_A_TOKEN));
}

#[tokio::test]
async fn test_refresh_reports_unresolved_token_as_row_error() {
    let reader = Arc::new(
        MockReader::default()
            .with_token(WETH, "WETH", 18)
            .with_balance(WETH, OWNER, 3_000_000_000_000_000_000)
            .with_native(OWNER, 500_000_000_000_000_000)
            .with_flaky(FLAKY),
    );
    let cache = cache_for(&reader);
    let tracker = tracker_for(&reader, &cache);
    let rx = tracker.subscribe();

    tracker
        .refresh(
            OWNER,
            &[WETH.to_string(), FLAKY.to_string()],
            &Criteria::default(),
        )
        .await;

    let state = rx.borrow().clone();
    assert_eq!(state.error, None);
    assert_eq!(state.rows.len(), 3);

    let flaky_row = state.rows.iter().find(|r| r.contract == FLAKY).unwrap();
    assert!(flaky_row.error.is_some());

    let weth_row = state.rows.iter().find(|r| r.symbol == "WETH").unwrap();
    assert_eq!(weth_row.amount, "3");
    assert!(weth_row.error.is_none());
}

#[tokio::test]
async fn test_total_outage_publishes_single_view_error() {
    // No native entry and only a flaky token: nothing resolves
    let reader = Arc::new(MockReader::default().with_flaky(FLAKY));
    let cache = cache_for(&reader);
    let tracker = tracker_for(&reader, &cache);
    let rx = tracker.subscribe();

    tracker
        .refresh(OWNER, &[FLAKY.to_string()], &Criteria::default())
        .await;

    let state = rx.borrow().clone();
    assert!(!state.loading);
    assert!(state.error.is_some());
    assert!(state.rows.is_empty());
}

#[tokio::test]
async fn test_superseded_refresh_is_discarded() {
    let reader = Arc::new(
        MockReader::default()
            .with_token(USDC, "USDC", 6)
            .with_balance(USDC, OWNER, 9_000_000)
            .with_balance(USDC, OTHER_OWNER, 1_000_000)
            .with_native(OWNER, 1_000_000_000_000_000_000)
            .with_native(OTHER_OWNER, 2_000_000_000_000_000_000)
            .with_slow_owner(OWNER),
    );
    let cache = cache_for(&reader);
    let tracker = tracker_for(&reader, &cache);
    let rx = tracker.subscribe();

    // First refresh for the slow owner, superseded mid-flight
    let slow = {
        let tracker = tracker.clone();
        tokio::spawn(async move {
            tracker
                .refresh(OWNER, &[USDC.to_string()], &Criteria::default())
                .await;
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    tracker
        .refresh(OTHER_OWNER, &[USDC.to_string()], &Criteria::default())
        .await;
    slow.await.unwrap();

    // Only the second refresh's results may be visible
    let state = rx.borrow().clone();
    let eth_row = state.rows.iter().find(|r| r.symbol == "ETH").unwrap();
    assert_eq!(eth_row.amount, "2");
    let usdc_row = state.rows.iter().find(|r| r.symbol == "USDC").unwrap();
    assert_eq!(usdc_row.amount, "1");
}

#[tokio::test]
async fn test_reset_discards_inflight_refresh() {
    let reader = Arc::new(
        MockReader::default()
            .with_token(USDC, "USDC", 6)
            .with_balance(USDC, OWNER, 9_000_000)
            .with_native(OWNER, 1_000_000_000_000_000_000)
            .with_slow_owner(OWNER),
    );
    let cache = cache_for(&reader);
    let tracker = tracker_for(&reader, &cache);
    let rx = tracker.subscribe();

    let slow = {
        let tracker = tracker.clone();
        tokio::spawn(async move {
            tracker
                .refresh(OWNER, &[USDC.to_string()], &Criteria::default())
                .await;
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    tracker.reset().await;
    slow.await.unwrap();

    // The disconnect's empty view must not be overwritten by the
    // in-flight refresh landing afterwards
    let state = rx.borrow().clone();
    assert!(!state.loading);
    assert_eq!(state.error, None);
    assert!(state.rows.is_empty());
}

#[tokio::test]
async fn test_refresh_attaches_known_prices() {
    let usdc_mainnet = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
    let reader = Arc::new(
        MockReader::default()
            .with_token(usdc_mainnet, "USDC", 6)
            .with_balance(usdc_mainnet, OWNER, 2_500_000)
            .with_native(OWNER, 1_000_000_000_000_000_000),
    );
    let cache = cache_for(&reader);
    let tracker = tracker_for(&reader, &cache);
    let rx = tracker.subscribe();

    tracker
        .refresh(OWNER, &[usdc_mainnet.to_string()], &Criteria::default())
        .await;

    let state = rx.borrow().clone();
    let usdc_row = state.rows.iter().find(|r| r.symbol == "USDC").unwrap();
    assert_eq!(usdc_row.value_usd.as_deref(), Some("$2.50"));
    let eth_row = state.rows.iter().find(|r| r.symbol == "ETH").unwrap();
    assert_eq!(eth_row.value_usd.as_deref(), Some("$2500.00"));
}
