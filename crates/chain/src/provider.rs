use serde_json::{json, Value};
use shared::config::RpcConfig;
use shared::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::retry::{retry_with_backoff, RetryConfig};

struct Endpoint {
    url: String,
    breaker: Arc<CircuitBreaker>,
}

/// JSON-RPC provider with a primary endpoint and optional fallback.
///
/// Every outbound call is bounded by the HTTP client timeout, retried
/// with exponential backoff on transient failures, and guarded by a
/// per-endpoint circuit breaker. Only read-only methods are issued
/// through this provider; it has no signing capability.
pub struct RpcProvider {
    http: reqwest::Client,
    primary: Endpoint,
    fallback: Option<Endpoint>,
    retry_config: RetryConfig,
}

impl RpcProvider {
    /// Create a provider with default retry and circuit breaker settings.
    pub fn new(url: String, fallback_url: Option<String>, timeout: Duration) -> Result<Self> {
        Self::new_with_config(
            url,
            fallback_url,
            timeout,
            RetryConfig::default(),
            CircuitBreakerConfig::default(),
        )
    }

    /// Create a provider from the environment-backed RPC settings.
    pub fn from_config(config: &RpcConfig) -> Result<Self> {
        Self::new(
            config.url.clone(),
            config.fallback_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Create a provider with custom retry and circuit breaker configurations.
    pub fn new_with_config(
        url: String,
        fallback_url: Option<String>,
        timeout: Duration,
        retry_config: RetryConfig,
        circuit_breaker_config: CircuitBreakerConfig,
    ) -> Result<Self> {
        info!("Initializing RPC provider with primary endpoint: {}", url);

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let primary = Endpoint {
            breaker: Arc::new(CircuitBreaker::new(
                format!("primary-rpc-{}", url),
                circuit_breaker_config.clone(),
            )),
            url,
        };

        let fallback = fallback_url.map(|url| {
            info!("Configuring fallback endpoint: {}", url);
            Endpoint {
                breaker: Arc::new(CircuitBreaker::new(
                    format!("fallback-rpc-{}", url),
                    circuit_breaker_config,
                )),
                url,
            }
        });

        Ok(Self {
            http,
            primary,
            fallback,
            retry_config,
        })
    }

    /// Issue a JSON-RPC request, failing over to the fallback endpoint
    /// when the primary cannot be reached.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        match self.request_endpoint(&self.primary, method, &params).await {
            Ok(value) => Ok(value),
            // A contract-level rejection is the same on any endpoint;
            // only transport-level failures are worth failing over
            Err(e) if !e.is_transient() && !matches!(e, Error::CircuitBreakerOpen(_)) => Err(e),
            Err(e) => match &self.fallback {
                Some(fallback) => {
                    warn!("Primary RPC failed for {}: {}, trying fallback", method, e);
                    self.request_endpoint(fallback, method, &params).await
                }
                None => Err(e),
            },
        }
    }

    async fn request_endpoint(
        &self,
        endpoint: &Endpoint,
        method: &str,
        params: &Value,
    ) -> Result<Value> {
        if !endpoint.breaker.is_request_allowed().await {
            return Err(Error::CircuitBreakerOpen(format!(
                "'{}' rejected for {}",
                endpoint.breaker.name(),
                method
            )));
        }

        let result = retry_with_backoff(method, &self.retry_config, || {
            self.send(endpoint, method, params)
        })
        .await;

        // A reverted call still proves the endpoint is reachable
        match &result {
            Err(e) if e.is_transient() => endpoint.breaker.record_failure().await,
            _ => endpoint.breaker.record_success().await,
        }

        result
    }

    async fn send(&self, endpoint: &Endpoint, method: &str, params: &Value) -> Result<Value> {
        debug!("RPC {} -> {}", method, endpoint.url);

        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let response = self
            .http
            .post(&endpoint.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::UnreachableProvider(format!("Request timed out: {}", e))
                } else {
                    Error::UnreachableProvider(format!("Failed to send RPC request: {}", e))
                }
            })?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimitExceeded);
        }

        if !response.status().is_success() {
            return Err(Error::UnreachableProvider(format!(
                "RPC request failed with status: {}",
                response.status()
            )));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| Error::UnreachableProvider(format!("Failed to parse RPC response: {}", e)))?;

        if let Some(error) = response_json.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown error");
            // Read calls never mutate state, so an error object means the
            // call itself was rejected (revert, bad target), not the provider
            return Err(Error::ContractCall(format!("RPC error: {}", message)));
        }

        response_json
            .get("result")
            .cloned()
            .ok_or_else(|| Error::UnreachableProvider("Missing result in RPC response".to_string()))
    }
}
