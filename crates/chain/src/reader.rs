use async_trait::async_trait;
use num_bigint::BigUint;
use serde_json::json;
use shared::models::TokenDescriptor;
use shared::{Error, Result};
use std::sync::Arc;
use tracing::debug;

use crate::abi;
use crate::provider::RpcProvider;

/// Read-only view of on-chain balances and ERC20 metadata.
///
/// The seam between the RPC layer and the aggregation layer; tests
/// substitute a mock implementation.
#[async_trait]
pub trait TokenReader: Send + Sync {
    /// Native coin balance of `owner`, in wei.
    async fn native_balance(&self, owner: &str) -> Result<BigUint>;

    /// ERC20 `name`/`symbol`/`decimals` of `contract`.
    async fn token_metadata(&self, contract: &str) -> Result<TokenDescriptor>;

    /// ERC20 `balanceOf(owner)` on `contract`, in base units.
    async fn token_balance(&self, contract: &str, owner: &str) -> Result<BigUint>;
}

/// `TokenReader` backed by JSON-RPC `eth_getBalance`/`eth_call`.
pub struct ChainReader {
    provider: Arc<RpcProvider>,
}

impl ChainReader {
    pub fn new(provider: Arc<RpcProvider>) -> Self {
        Self { provider }
    }

    async fn eth_call(&self, to: &str, data: &str) -> Result<String> {
        let result = self
            .provider
            .request("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await?;

        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::ContractCall("non-string eth_call result".to_string()))
    }
}

#[async_trait]
impl TokenReader for ChainReader {
    async fn native_balance(&self, owner: &str) -> Result<BigUint> {
        let owner = abi::validate_address(owner)?;
        debug!("Fetching native balance for {}", owner);

        let result = self
            .provider
            .request("eth_getBalance", json!([owner, "latest"]))
            .await?;

        let hex_balance = result
            .as_str()
            .ok_or_else(|| Error::ContractCall("non-string balance result".to_string()))?;
        abi::decode_uint(hex_balance)
    }

    async fn token_metadata(&self, contract: &str) -> Result<TokenDescriptor> {
        let contract = abi::validate_address(contract)?;
        debug!("Fetching token metadata for {}", contract);

        let (name, symbol, decimals) = tokio::try_join!(
            self.eth_call(&contract, abi::SELECTOR_NAME),
            self.eth_call(&contract, abi::SELECTOR_SYMBOL),
            self.eth_call(&contract, abi::SELECTOR_DECIMALS),
        )?;

        Ok(TokenDescriptor {
            name: abi::decode_string(&name)?,
            symbol: abi::decode_string(&symbol)?,
            decimals: abi::decode_u8(&decimals)?,
            contract,
        })
    }

    async fn token_balance(&self, contract: &str, owner: &str) -> Result<BigUint> {
        let contract = abi::validate_address(contract)?;
        let calldata = abi::encode_balance_of(owner)?;
        debug!("Fetching token balance on {} for {}", contract, owner);

        let result = self.eth_call(&contract, &calldata).await?;
        abi::decode_uint(&result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_reader_is_object_safe() {
        let provider = Arc::new(
            RpcProvider::new("https://eth.llamarpc.com".to_string(), None, Duration::from_secs(5))
                .unwrap(),
        );
        let _reader: Arc<dyn TokenReader> = Arc::new(ChainReader::new(provider));
    }
}
