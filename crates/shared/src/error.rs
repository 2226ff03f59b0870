use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Provider unreachable: {0}")]
    UnreachableProvider(String),

    #[error("Contract call failed: {0}")]
    ContractCall(String),

    #[error("Token metadata unavailable: {0}")]
    MetadataUnavailable(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid wallet address: {0}")]
    InvalidWalletAddress(String),

    #[error("Circuit breaker open: {0}")]
    CircuitBreakerOpen(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Transient errors are worth retrying; everything else fails fast.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::UnreachableProvider(_) | Error::RateLimitExceeded
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
