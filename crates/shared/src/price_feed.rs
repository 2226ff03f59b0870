use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Contract address used to key the native coin in price lookups.
pub const NATIVE_TOKEN: &str = "0x0000000000000000000000000000000000000000";

/// Price feed service for fetching USD values of tokens
///
/// This is a simplified implementation that can be extended to use
/// real price APIs like CoinGecko or Ethplorer. Prices affect display
/// formatting only; nothing transactional depends on them.
#[derive(Clone)]
pub struct PriceFeedService {
    mock_prices: HashMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPrice {
    pub contract: String,
    pub symbol: String,
    pub price_usd: f64,
    pub last_updated: chrono::DateTime<chrono::Utc>,
}

impl PriceFeedService {
    /// Create a new price feed service
    pub fn new() -> Self {
        let mut mock_prices = HashMap::new();

        // Well-known mainnet contracts (mock data); a production deployment
        // swaps this table for a real price API client
        mock_prices.insert(NATIVE_TOKEN.to_string(), 2500.0); // ETH
        mock_prices.insert(
            "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".to_string(), // USDC
            1.0,
        );
        mock_prices.insert(
            "0xdac17f958d2ee523a2206206994597c13d831ec7".to_string(), // USDT
            1.0,
        );
        mock_prices.insert(
            "0x6b175474e89094c44da98b954eedeac495271d0f".to_string(), // DAI
            1.0,
        );

        Self { mock_prices }
    }

    /// Get the USD price for a token by its contract address
    pub async fn get_token_price(&self, contract: &str) -> Result<Option<f64>> {
        let key = contract.to_lowercase();
        debug!("Fetching price for token: {}", key);

        if let Some(&price) = self.mock_prices.get(&key) {
            return Ok(Some(price));
        }

        warn!("No price found for token {}", key);
        Ok(None)
    }

    /// Get prices for multiple tokens at once
    pub async fn get_token_prices(&self, contracts: &[String]) -> Result<HashMap<String, f64>> {
        let mut prices = HashMap::new();

        for contract in contracts {
            match self.get_token_price(contract).await {
                Ok(Some(price)) => {
                    prices.insert(contract.to_lowercase(), price);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Failed to get price for {}: {}", contract, e);
                }
            }
        }

        Ok(prices)
    }

    /// Calculate USD value for a token amount
    pub async fn calculate_usd_value(&self, contract: &str, amount: f64) -> Result<Option<f64>> {
        let price = self.get_token_price(contract).await?;
        Ok(price.map(|p| amount * p))
    }
}

impl Default for PriceFeedService {
    fn default() -> Self {
        Self::new()
    }
}
