//! Retry with exponential backoff and a per-source circuit breaker.
//!
//! Every upstream client goes through [`ResilientClient`], so all sources
//! share the same failure behaviour: transient errors are retried a bounded
//! number of times, and a source that keeps failing stops being called until
//! its cooldown has elapsed.

use std::future::Future;
use std::time::{Duration, Instant};

use pathmind_common::entities::{SourceHealth, SourceStatus};
use pathmind_common::sandbox::SandboxClient;
use pathmind_common::{PathmindError, SourceError};
use pathmind_config::SourcesConfig;
use reqwest::{RequestBuilder, Response};
use tokio::sync::Mutex;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 2, initial_backoff_ms: 1_000, backoff_multiplier: 3.0, max_backoff_ms: 10_000 }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &SourcesConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff_ms: config.initial_backoff_ms,
            backoff_multiplier: config.backoff_multiplier,
            max_backoff_ms: config.max_backoff_ms,
        }
    }

    /// Delay before retry number `attempt + 1`.
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        let base = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        base.min(self.max_backoff_ms as f64) as u64
    }
}

/// Runs `operation` until it succeeds, fails permanently, or retries run out.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, source_name: &str, operation: F) -> Result<T, SourceError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if !e.is_retryable() || attempt >= policy.max_retries {
                    return Err(e);
                }
                let backoff_ms = policy.backoff_ms(attempt);
                warn!(
                    source = source_name,
                    attempt = attempt + 1,
                    max = policy.max_retries,
                    backoff_ms,
                    error = %e,
                    "Retrying after transient upstream error"
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                attempt += 1;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Circuit Breaker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CircuitState {
    Closed,
    Open { since: Instant },
    /// Cooldown elapsed; the next call is a probe.
    HalfOpen,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    state: CircuitState,
    failure_count: u32,
    failure_threshold: u32,
    recovery_timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self { state: CircuitState::Closed, failure_count: 0, failure_threshold, recovery_timeout }
    }

    pub fn is_call_permitted(&mut self) -> bool {
        match self.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open { since } => {
                if since.elapsed() >= self.recovery_timeout {
                    debug!("Circuit breaker transitioning to half-open");
                    self.state = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&mut self) {
        self.failure_count = 0;
        if self.state == CircuitState::HalfOpen {
            debug!("Circuit breaker closing after successful probe");
        }
        self.state = CircuitState::Closed;
    }

    pub fn record_failure(&mut self) {
        self.failure_count += 1;
        let reopen = self.state == CircuitState::HalfOpen;
        if reopen || self.failure_count >= self.failure_threshold {
            if !matches!(self.state, CircuitState::Open { .. }) {
                warn!(failures = self.failure_count, "Circuit breaker opened");
            }
            self.state = CircuitState::Open { since: Instant::now() };
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Allowlisted HTTP client with retry and a circuit breaker for one source.
#[derive(Debug)]
pub struct ResilientClient {
    name: String,
    http: SandboxClient,
    retry: RetryPolicy,
    breaker: Mutex<CircuitBreaker>,
}

impl ResilientClient {
    pub fn new(name: &str, http: SandboxClient, retry: RetryPolicy, breaker: CircuitBreaker) -> Self {
        Self { name: name.to_string(), http, retry, breaker: Mutex::new(breaker) }
    }

    /// Builds a client for `name` whose base URL host is added to the allowlist.
    pub fn from_config(name: &str, base_url: &str, config: &SourcesConfig) -> Result<Self, PathmindError> {
        let mut http = SandboxClient::new(config.http_timeout())?;
        http.allow_url_host(base_url);
        Ok(Self::new(
            name,
            http,
            RetryPolicy::from_config(config),
            CircuitBreaker::new(config.failure_threshold, config.recovery_timeout()),
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn http(&self) -> &SandboxClient {
        &self.http
    }

    pub async fn circuit_state(&self) -> CircuitState {
        self.breaker.lock().await.state()
    }

    /// Runs `call` under the retry policy. The breaker is consulted before
    /// every attempt, so a circuit that opens mid-retry stops further calls.
    pub async fn guarded<F, Fut, T>(&self, call: F) -> Result<T, SourceError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let call = &call;
        let this = self;
        with_retry(&self.retry, &self.name, move || async move {
            if !this.breaker.lock().await.is_call_permitted() {
                return Err(SourceError::CircuitOpen { source_name: this.name.clone() });
            }
            let result = call().await;
            this.record(&result).await;
            result
        })
        .await
    }

    /// Sends the request produced by `build`, retrying transient failures.
    /// Non-success statuses become [`SourceError::Status`]; only transient
    /// ones count against the breaker.
    pub async fn execute<F>(&self, build: F) -> Result<Response, SourceError>
    where
        F: Fn(&SandboxClient) -> Result<RequestBuilder, SourceError>,
    {
        let build = &build;
        let this = self;
        self.guarded(move || async move {
            match build(&this.http)?.send().await {
                Ok(resp) if resp.status().is_success() => Ok(resp),
                Ok(resp) => Err(SourceError::Status {
                    source_name: this.name.clone(),
                    status: resp.status().as_u16(),
                }),
                Err(e) => Err(SourceError::request(&this.name, e.to_string())),
            }
        })
        .await
    }

    pub async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<serde_json::Value, SourceError> {
        let resp = self.execute(|http| Ok(http.get(url)?.query(query))).await?;
        resp.json().await.map_err(|e| SourceError::decode(&self.name, e.to_string()))
    }

    pub async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        let resp = self.execute(|http| http.get(url)).await?;
        resp.text().await.map_err(|e| SourceError::decode(&self.name, e.to_string()))
    }

    pub async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<serde_json::Value, SourceError> {
        let resp = self.execute(|http| Ok(http.post(url)?.json(body))).await?;
        resp.json().await.map_err(|e| SourceError::decode(&self.name, e.to_string()))
    }

    async fn record<T>(&self, result: &Result<T, SourceError>) {
        let mut breaker = self.breaker.lock().await;
        match result {
            Ok(_) => breaker.record_success(),
            Err(e) if e.is_retryable() => breaker.record_failure(),
            // Client errors say nothing about source health.
            Err(_) => {}
        }
    }
}

/// Times a probe call and converts its outcome into a health record.
pub async fn probe<F, T>(call: F) -> SourceHealth
where
    F: Future<Output = Result<T, SourceError>>,
{
    let start = Instant::now();
    match call.await {
        Ok(_) => SourceHealth {
            status: SourceStatus::Up,
            latency_ms: start.elapsed().as_millis() as u64,
            error: None,
        },
        Err(e) => SourceHealth {
            status: SourceStatus::Down,
            latency_ms: start.elapsed().as_millis() as u64,
            error: Some(e.to_string()),
        },
    }
}
