use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests flow normally
    Closed,
    /// Requests are rejected until the open timeout elapses
    Open,
    /// Probing whether the endpoint recovered
    HalfOpen,
}

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// Successes in half-open state before closing
    pub success_threshold: u32,
    /// Time to wait in open state before probing
    pub timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    opened_at: Option<Instant>,
}

/// Per-endpoint circuit breaker guarding the RPC provider.
///
/// Keeps a whole-view outage from turning into an unbounded stream of
/// doomed outbound calls: once an endpoint trips, callers get a fast
/// `CircuitBreakerOpen` until the probe window opens.
pub struct CircuitBreaker {
    inner: Mutex<BreakerInner>,
    config: CircuitBreakerConfig,
    name: String,
}

impl CircuitBreaker {
    pub fn new(name: String, config: CircuitBreakerConfig) -> Self {
        info!(
            "Initializing circuit breaker '{}' with failure_threshold={}, success_threshold={}, timeout={:?}",
            name, config.failure_threshold, config.success_threshold, config.timeout
        );

        Self {
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                opened_at: None,
            }),
            config,
            name,
        }
    }

    /// Check whether a request may go out right now.
    pub async fn is_request_allowed(&self) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= self.config.timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.success_count = 0;
                    info!("Circuit breaker '{}': Transitioned to HALF_OPEN state", self.name);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful operation
    pub async fn record_success(&self) {
        let mut inner = self.inner.lock().await;
        match inner.state {
            CircuitState::Closed => {
                inner.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                debug!(
                    "Circuit breaker '{}': Success in half-open state ({}/{})",
                    self.name, inner.success_count, self.config.success_threshold
                );
                if inner.success_count >= self.config.success_threshold {
                    inner.state = CircuitState::Closed;
                    inner.failure_count = 0;
                    inner.success_count = 0;
                    inner.opened_at = None;
                    info!("Circuit breaker '{}': Transitioned to CLOSED state", self.name);
                }
            }
            CircuitState::Open => {
                warn!("Circuit breaker '{}': Success recorded in open state", self.name);
            }
        }
    }

    /// Record a failed operation
    pub async fn record_failure(&self) {
        let mut inner = self.inner.lock().await;
        match inner.state {
            CircuitState::Closed => {
                inner.failure_count += 1;
                debug!(
                    "Circuit breaker '{}': Failure recorded ({}/{})",
                    self.name, inner.failure_count, self.config.failure_threshold
                );
                if inner.failure_count >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    warn!("Circuit breaker '{}': Transitioned to OPEN state", self.name);
                }
            }
            // Any failure while probing immediately re-opens the circuit
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                warn!("Circuit breaker '{}': Transitioned to OPEN state", self.name);
            }
            CircuitState::Open => {
                inner.opened_at = Some(Instant::now());
            }
        }
    }

    /// Current state of the circuit breaker
    pub async fn get_state(&self) -> CircuitState {
        self.inner.lock().await.state
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
