//! Retry policy and the retrying transport wrapper

use std::thread;
use std::time::Duration;

use serde_json::Value;

use crate::config::RetryConfig;

use super::{Headers, Reply, Transport, TransportKind, TransportResult};

/// Bounded exponential backoff
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after every retry
    pub backoff: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_delay: Duration::from_millis(config.delay_ms),
            backoff: config.backoff,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff: f64) -> Self {
        Self {
            max_attempts,
            initial_delay,
            backoff,
        }
    }

    /// Single attempt, never retries
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, 1.0)
    }

    /// Policy for resending a rejected bulk chunk: `max_retries` extra
    /// attempts, delay growing by 1.5 each time
    pub fn for_bulk(max_retries: u32, initial_delay: Duration) -> Self {
        Self::new(max_retries.saturating_add(1), initial_delay, 1.5)
    }

    /// Delay to wait after the given (1-based) failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.backoff.max(1.0).powi(exponent);
        Duration::try_from_secs_f64(self.initial_delay.as_secs_f64() * factor)
            .unwrap_or(Duration::MAX)
    }

    /// Run `op` until it succeeds, `should_retry` rejects the error, or the
    /// attempts run out. The last error is returned.
    pub fn run<T, E, F, P>(&self, mut op: F, should_retry: P) -> Result<T, E>
    where
        F: FnMut(u32) -> Result<T, E>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if attempt < max_attempts && should_retry(&err) => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "attempt failed, retrying"
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Transport wrapper that resends requests which never reached the server
#[derive(Debug)]
pub struct RetryingTransport<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: Transport> RetryingTransport<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl<T: Transport> Transport for RetryingTransport<T> {
    fn post(&self, endpoint: &str, payload: &Value, headers: &Headers) -> TransportResult<Reply> {
        self.policy.run(
            |_| self.inner.post(endpoint, payload, headers),
            |err| err.is_retryable(),
        )
    }

    fn get(&self, endpoint: &str, headers: &Headers) -> TransportResult<Reply> {
        self.policy
            .run(|_| self.inner.get(endpoint, headers), |err| err.is_retryable())
    }

    fn kind(&self) -> TransportKind {
        self.inner.kind()
    }
}
