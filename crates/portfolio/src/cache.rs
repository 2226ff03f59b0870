use chain::{retry_with_backoff, RetryConfig, TokenReader};
use shared::config::MetadataConfig;
use shared::models::TokenDescriptor;
use shared::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

type Slot = Arc<Mutex<Option<TokenDescriptor>>>;

/// Session-scoped token metadata cache.
///
/// Token metadata is immutable on-chain, so entries are written once and
/// never mutated. Misses go through the rate-limit gate and a bounded
/// retry; concurrent misses for the same contract coalesce into a single
/// outbound fetch via a per-key slot lock.
pub struct MetadataCache {
    reader: Arc<dyn TokenReader>,
    gate: crate::gate::RequestGate,
    retry_config: RetryConfig,
    slots: Mutex<HashMap<String, Slot>>,
}

impl MetadataCache {
    pub fn new(
        reader: Arc<dyn TokenReader>,
        min_request_interval: Duration,
        retry_config: RetryConfig,
    ) -> Self {
        Self {
            reader,
            gate: crate::gate::RequestGate::new(min_request_interval),
            retry_config,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Build a cache from the environment-backed metadata settings.
    pub fn from_config(reader: Arc<dyn TokenReader>, config: &MetadataConfig) -> Self {
        Self::new(
            reader,
            Duration::from_millis(config.min_request_interval_ms),
            RetryConfig {
                max_attempts: config.max_attempts,
                initial_delay: Duration::from_millis(config.retry_initial_delay_ms),
                ..RetryConfig::default()
            },
        )
    }

    /// Resolve metadata for a contract address.
    ///
    /// A hit returns immediately with no network call. A miss fetches
    /// through the gate, retrying transient failures; when retries are
    /// exhausted the token is reported unresolved via
    /// `MetadataUnavailable`, never aborting the caller's batch.
    /// `ContractCall` (target is not a token) passes through unchanged.
    pub async fn resolve(&self, contract: &str) -> Result<TokenDescriptor> {
        let key = contract.to_lowercase();

        let slot = {
            let mut slots = self.slots.lock().await;
            slots.entry(key.clone()).or_default().clone()
        };

        // Whoever holds the slot lock does the fetch; everyone else
        // waits here and finds the entry filled in
        let mut entry = slot.lock().await;
        if let Some(descriptor) = entry.as_ref() {
            debug!("Metadata cache hit for {}", key);
            return Ok(descriptor.clone());
        }

        let fetched = retry_with_backoff("token_metadata", &self.retry_config, || async {
            self.gate.acquire().await;
            self.reader.token_metadata(&key).await
        })
        .await;

        match fetched {
            Ok(descriptor) => {
                debug!(
                    "Cached metadata for {} ({}, {} decimals)",
                    key, descriptor.symbol, descriptor.decimals
                );
                *entry = Some(descriptor.clone());
                Ok(descriptor)
            }
            Err(e @ Error::ContractCall(_)) => Err(e),
            Err(e) => {
                warn!("Metadata retries exhausted for {}: {}", key, e);
                Err(Error::MetadataUnavailable(format!("{}: {}", key, e)))
            }
        }
    }

    /// Drop all cached entries. Called on wallet disconnect.
    pub async fn clear(&self) {
        self.slots.lock().await.clear();
        debug!("Metadata cache cleared");
    }

    /// Whether a resolved entry exists for the contract.
    pub async fn contains(&self, contract: &str) -> bool {
        let key = contract.to_lowercase();
        let slot = {
            let slots = self.slots.lock().await;
            match slots.get(&key) {
                Some(slot) => slot.clone(),
                None => return false,
            }
        };
        let entry = slot.lock().await;
        entry.is_some()
    }
}
