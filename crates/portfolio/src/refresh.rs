use chain::TokenReader;
use futures_util::future::join_all;
use shared::models::{DisplayRow, TokenBalance, TokenDescriptor, ViewState};
use shared::price_feed::NATIVE_TOKEN;
use shared::{Error, PriceFeedService, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::cache::MetadataCache;
use crate::normalize::normalize;
use crate::presenter::{present_with_prices, Criteria};

enum TokenOutcome {
    Resolved(TokenBalance),
    /// Target has no code or the call reverted: not a token, omitted
    Skipped(String),
    /// Could not be resolved this refresh: shown as a per-row error
    Unresolved(String, Error),
}

/// Coordinates balance refreshes and publishes [`ViewState`] to the UI
/// renderer through a watch channel.
///
/// Every refresh takes the next value of a monotonically increasing
/// epoch; results are compared against the current epoch at write-back
/// and discarded when a newer refresh has started (last-started-wins),
/// so stale data never overwrites fresher data.
pub struct BalanceTracker {
    reader: Arc<dyn TokenReader>,
    cache: Arc<MetadataCache>,
    price_feed: PriceFeedService,
    epoch: AtomicU64,
    state_tx: watch::Sender<ViewState>,
    publish_lock: Mutex<()>,
}

impl BalanceTracker {
    pub fn new(
        reader: Arc<dyn TokenReader>,
        cache: Arc<MetadataCache>,
        price_feed: PriceFeedService,
    ) -> Self {
        let (state_tx, _) = watch::channel(ViewState::default());
        Self {
            reader,
            cache,
            price_feed,
            epoch: AtomicU64::new(0),
            state_tx,
            publish_lock: Mutex::new(()),
        }
    }

    /// Subscribe to published view states.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state_tx.subscribe()
    }

    /// Refresh the native balance plus every tracked token for `account`
    /// and publish the presented result.
    ///
    /// Per-token failures are isolated: a non-token address is omitted,
    /// an unresolved token becomes an error row. Only when nothing at
    /// all resolves does the whole view carry a single error state.
    pub async fn refresh(&self, account: &str, tokens: &[String], criteria: &Criteria) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Starting balance refresh #{} for {}", epoch, account);
        self.publish(epoch, ViewState::loading()).await;

        let token_futures = tokens.iter().map(|t| self.fetch_token(t, account));
        let (native, outcomes) = tokio::join!(self.fetch_native(account), join_all(token_futures));

        let mut balances = Vec::new();
        let mut unresolved = Vec::new();

        match native {
            Ok(balance) => balances.push(balance),
            Err(e) => {
                warn!("Native balance lookup failed for {}: {}", account, e);
                unresolved.push((NATIVE_TOKEN.to_string(), e));
            }
        }

        for outcome in outcomes {
            match outcome {
                TokenOutcome::Resolved(balance) => balances.push(balance),
                TokenOutcome::Skipped(contract) => {
                    debug!("Omitting {}: not a token contract", contract);
                }
                TokenOutcome::Unresolved(contract, e) => {
                    warn!("Token {} unresolved: {}", contract, e);
                    unresolved.push((contract, e));
                }
            }
        }

        if balances.is_empty() && !unresolved.is_empty() {
            let (_, first_error) = &unresolved[0];
            self.publish(
                epoch,
                ViewState {
                    loading: false,
                    error: Some(format!("Balance refresh failed: {}", first_error)),
                    rows: Vec::new(),
                },
            )
            .await;
            return;
        }

        let contracts: Vec<String> = balances.iter().map(|b| b.token.contract.clone()).collect();
        let prices = self
            .price_feed
            .get_token_prices(&contracts)
            .await
            .unwrap_or_default();

        let mut rows = present_with_prices(&balances, criteria, &prices);
        for (contract, error) in unresolved {
            rows.push(DisplayRow {
                contract,
                symbol: String::new(),
                name: String::new(),
                amount: "0".to_string(),
                value_usd: None,
                error: Some(error.to_string()),
            });
        }

        info!(
            "Balance refresh #{} complete: {} rows for {}",
            epoch,
            rows.len(),
            account
        );
        self.publish(
            epoch,
            ViewState {
                loading: false,
                error: None,
                rows,
            },
        )
        .await;
    }

    /// Bump the epoch so in-flight refreshes are discarded, and publish
    /// an empty view. Called on wallet disconnect.
    pub async fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let _guard = self.publish_lock.lock().await;
        let _ = self.state_tx.send(ViewState::default());
    }

    async fn fetch_native(&self, owner: &str) -> Result<TokenBalance> {
        let raw = self.reader.native_balance(owner).await?;
        let token = TokenDescriptor {
            contract: NATIVE_TOKEN.to_string(),
            name: "Ether".to_string(),
            symbol: "ETH".to_string(),
            decimals: 18,
        };
        let normalized = normalize(&raw, token.decimals);
        Ok(TokenBalance {
            token,
            raw,
            normalized,
        })
    }

    async fn fetch_token(&self, contract: &str, owner: &str) -> TokenOutcome {
        let descriptor = match self.cache.resolve(contract).await {
            Ok(descriptor) => descriptor,
            Err(Error::ContractCall(_)) => return TokenOutcome::Skipped(contract.to_string()),
            Err(e) => return TokenOutcome::Unresolved(contract.to_string(), e),
        };

        match self.reader.token_balance(&descriptor.contract, owner).await {
            Ok(raw) => {
                let normalized = normalize(&raw, descriptor.decimals);
                TokenOutcome::Resolved(TokenBalance {
                    token: descriptor,
                    raw,
                    normalized,
                })
            }
            Err(Error::ContractCall(_)) => TokenOutcome::Skipped(contract.to_string()),
            Err(e) => TokenOutcome::Unresolved(contract.to_string(), e),
        }
    }

    // The epoch check and the send happen under one lock so a newer
    // refresh's publish cannot land in between them
    async fn publish(&self, epoch: u64, state: ViewState) {
        let _guard = self.publish_lock.lock().await;
        if self.epoch.load(Ordering::SeqCst) == epoch {
            let _ = self.state_tx.send(state);
        } else {
            debug!("Discarding results from superseded refresh #{}", epoch);
        }
    }
}
