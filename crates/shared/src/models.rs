use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Immutable ERC20 metadata, cached per contract address after first fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDescriptor {
    pub contract: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// A resolved balance for one token. Recomputed per query, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBalance {
    pub token: TokenDescriptor,
    pub raw: BigUint,
    /// Exact decimal representation, `raw / 10^decimals`
    pub normalized: String,
}

/// One row of presented output for the UI renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRow {
    pub contract: String,
    pub symbol: String,
    pub name: String,
    pub amount: String,
    pub value_usd: Option<String>,
    /// Set for tokens that could not be resolved this refresh
    pub error: Option<String>,
}

/// State published to the UI renderer after each refresh.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewState {
    pub loading: bool,
    pub error: Option<String>,
    pub rows: Vec<DisplayRow>,
}

impl ViewState {
    pub fn loading() -> Self {
        Self {
            loading: true,
            error: None,
            rows: Vec::new(),
        }
    }
}
