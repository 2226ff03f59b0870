pub mod abi;
pub mod circuit_breaker;
pub mod provider;
pub mod reader;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use provider::RpcProvider;
pub use reader::{ChainReader, TokenReader};
pub use retry::{retry_with_backoff, RetryConfig};
