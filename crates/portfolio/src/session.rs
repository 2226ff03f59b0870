use chain::TokenReader;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::cache::MetadataCache;
use crate::presenter::Criteria;
use crate::refresh::BalanceTracker;
use shared::config::Config;
use shared::models::ViewState;
use shared::PriceFeedService;

/// Events delivered by the wallet connector collaborator.
///
/// This component only ever consumes the read-only account address and
/// chain id; it never requests signing authority of any kind.
#[derive(Debug, Clone)]
pub enum WalletEvent {
    Connected { address: String, chain_id: u64 },
    AccountChanged { address: String },
    ChainChanged { chain_id: u64 },
    Disconnected,
}

/// Per-connection session tying the metadata cache lifecycle to wallet
/// events: populated while connected, cleared on disconnect.
pub struct WalletSession {
    tracker: Arc<BalanceTracker>,
    cache: Arc<MetadataCache>,
    tracked_tokens: Vec<String>,
    criteria: Criteria,
    account: Option<String>,
    chain_id: Option<u64>,
}

impl WalletSession {
    pub fn new(
        tracker: Arc<BalanceTracker>,
        cache: Arc<MetadataCache>,
        tracked_tokens: Vec<String>,
        criteria: Criteria,
    ) -> Self {
        Self {
            tracker,
            cache,
            tracked_tokens,
            criteria,
            account: None,
            chain_id: None,
        }
    }

    /// Assemble the full aggregation stack from environment-backed
    /// settings: metadata cache, balance tracker, tracked token list and
    /// display criteria.
    pub fn from_config(
        config: &Config,
        reader: Arc<dyn TokenReader>,
        price_feed: PriceFeedService,
    ) -> Self {
        let cache = Arc::new(MetadataCache::from_config(reader.clone(), &config.metadata));
        let tracker = Arc::new(BalanceTracker::new(reader, cache.clone(), price_feed));
        Self::new(
            tracker,
            cache,
            config.display.tracked_tokens.clone(),
            Criteria::from_config(&config.display),
        )
    }

    /// Subscribe to the view states this session publishes.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.tracker.subscribe()
    }

    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    /// Consume wallet events until the sender side is dropped, which is
    /// the connector's teardown/unsubscribe signal.
    pub async fn run(mut self, mut events: mpsc::Receiver<WalletEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        debug!("Wallet event stream closed, tearing down session");
        self.disconnect().await;
    }

    pub async fn handle_event(&mut self, event: WalletEvent) {
        match event {
            WalletEvent::Connected { address, chain_id } => {
                info!("Wallet connected: {} on chain {}", address, chain_id);
                self.account = Some(address);
                self.chain_id = Some(chain_id);
                self.spawn_refresh();
            }
            WalletEvent::AccountChanged { address } => {
                info!("Account changed: {}", address);
                self.account = Some(address);
                self.spawn_refresh();
            }
            WalletEvent::ChainChanged { chain_id } => {
                info!("Chain changed: {}", chain_id);
                self.chain_id = Some(chain_id);
                // Metadata is keyed per chain, so a chain switch starts
                // from an empty cache
                self.cache.clear().await;
                self.spawn_refresh();
            }
            WalletEvent::Disconnected => {
                info!("Wallet disconnected");
                self.disconnect().await;
            }
        }
    }

    /// Start a refresh without blocking event handling; a newer event
    /// supersedes it through the tracker's epoch guard.
    fn spawn_refresh(&self) {
        let Some(account) = self.account.clone() else {
            return;
        };
        let tracker = self.tracker.clone();
        let tokens = self.tracked_tokens.clone();
        let criteria = self.criteria.clone();
        tokio::spawn(async move {
            tracker.refresh(&account, &tokens, &criteria).await;
        });
    }

    async fn disconnect(&mut self) {
        self.account = None;
        self.chain_id = None;
        self.cache.clear().await;
        self.tracker.reset().await;
    }
}
