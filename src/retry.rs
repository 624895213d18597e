//! Retry policy applied around network operations
//!
//! A `RetryPolicy` is a plain value built from configuration at each call site:
//! login, page fetches and roster fetches each carry their own attempts, delay and
//! backoff multiplier.

use crate::config::RetryConfig;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Attempts, initial delay and backoff multiplier for one kind of operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first
    pub max_attempts: u32,
    /// Wait after the first failed attempt
    pub initial_delay: Duration,
    /// Multiplier applied to the wait after each further failure
    pub backoff: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            backoff: backoff.max(1.0),
        }
    }

    /// A policy waiting the same delay between every attempt
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self::new(max_attempts, delay, 1.0)
    }

    /// Policy for single page fetches
    pub fn fetch(config: &RetryConfig) -> Self {
        Self::new(
            config.fetch_attempts,
            Duration::from_millis(config.fetch_delay_ms),
            config.fetch_backoff,
        )
    }

    /// Policy for the login handshake
    pub fn login(config: &RetryConfig) -> Self {
        Self::fixed(
            config.login_attempts,
            Duration::from_millis(config.login_delay_ms),
        )
    }

    /// Policy for group roster pages
    pub fn roster(config: &RetryConfig) -> Self {
        Self::fixed(
            config.roster_attempts,
            Duration::from_millis(config.roster_delay_ms),
        )
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        self.initial_delay.mul_f64(self.backoff.powi(exponent))
    }

    /// Runs `operation` until it succeeds, fails terminally or attempts run out
    ///
    /// # Arguments
    ///
    /// * `label` - Name of the operation, used in log lines
    /// * `operation` - Produces a fresh future for each attempt
    /// * `is_retryable` - Decides whether an error is worth another attempt
    ///
    /// # Returns
    ///
    /// The first success, or the last error once the policy gives up
    pub async fn run<T, E, F, Fut, P>(
        &self,
        label: &str,
        mut operation: F,
        is_retryable: P,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && is_retryable(&e) => {
                    let delay = self.delay_after(attempt);
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        label,
                        attempt,
                        self.max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if attempt >= self.max_attempts {
                        tracing::warn!("{} gave up after {} attempts: {}", label, attempt, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}
