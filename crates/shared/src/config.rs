use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub rpc: RpcConfig,
    pub metadata: MetadataConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    pub url: String,
    pub fallback_url: Option<String>,
    pub chain_id: u64,
    /// Bounded wait for every outbound call, in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetadataConfig {
    /// Minimum spacing between consecutive outbound metadata fetches
    pub min_request_interval_ms: u64,
    /// Bounded retry attempts for transient failures
    pub max_attempts: u32,
    pub retry_initial_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    /// Tracked ERC20 contract addresses, comma-separated in the environment
    pub tracked_tokens: Vec<String>,
    pub min_balance: String,
    pub excluded_symbols: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Ok(Config {
            rpc: RpcConfig {
                url: env::var("RPC_URL")?,
                fallback_url: env::var("RPC_FALLBACK_URL").ok(),
                chain_id: env::var("CHAIN_ID")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()?,
                timeout_secs: env::var("RPC_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
            },
            metadata: MetadataConfig {
                min_request_interval_ms: env::var("METADATA_MIN_REQUEST_INTERVAL_MS")
                    .unwrap_or_else(|_| "1000".to_string())
                    .parse()?,
                max_attempts: env::var("METADATA_MAX_ATTEMPTS")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()?,
                retry_initial_delay_ms: env::var("METADATA_RETRY_INITIAL_DELAY_MS")
                    .unwrap_or_else(|_| "100".to_string())
                    .parse()?,
            },
            display: DisplayConfig {
                tracked_tokens: parse_list(env::var("TRACKED_TOKENS").ok()),
                min_balance: env::var("MIN_DISPLAY_BALANCE")
                    .unwrap_or_else(|_| "0".to_string()),
                excluded_symbols: parse_list(env::var("EXCLUDED_SYMBOLS").ok()),
            },
        })
    }
}

fn parse_list(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_empty() {
        assert!(parse_list(None).is_empty());
        assert!(parse_list(Some("".to_string())).is_empty());
        assert!(parse_list(Some(" , ".to_string())).is_empty());
    }

    #[test]
    fn test_parse_list_trims_entries() {
        let parsed = parse_list(Some("0xabc, 0xdef ,0x123".to_string()));
        assert_eq!(parsed, vec!["0xabc", "0xdef", "0x123"]);
    }
}
