//! Bounded retry policy shared by every Spotify request

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{SpotifyError, SpotifyResult};

/// Default number of attempts per request
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// Base delay for exponential backoff (milliseconds)
const DEFAULT_BASE_DELAY_MS: u64 = 500;

/// Upper bound for a single backoff delay (seconds)
const DEFAULT_MAX_DELAY_SECS: u64 = 30;

/// Exponential backoff policy that honors `Retry-After` hints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry
    pub base_delay: Duration,
    /// Cap applied to computed delays and to `Retry-After` hints
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_secs(DEFAULT_MAX_DELAY_SECS),
        }
    }
}

impl RetryPolicy {
    /// Policy with the given attempt budget and default delays
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Policy that never sleeps (for tests)
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (0-based) after `error`
    pub fn delay_for(&self, retry: u32, error: &SpotifyError) -> Duration {
        let delay = match error.retry_after() {
            Some(hint) => hint,
            None => self
                .base_delay
                .saturating_mul(2u32.saturating_pow(retry.min(16))),
        };
        delay.min(self.max_delay)
    }

    /// Execute an operation, retrying transient failures
    ///
    /// Non-retryable errors are returned as-is. Once the budget is spent on
    /// retryable errors, `SpotifyError::RetriesExhausted` is returned.
    pub async fn run<T, F, Fut>(&self, operation: F) -> SpotifyResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = SpotifyResult<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    if attempt + 1 < attempts {
                        let delay = self.delay_for(attempt, &e);
                        warn!(
                            attempt = attempt + 1,
                            max_attempts = attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Spotify request failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(SpotifyError::RetriesExhausted {
            attempts,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
        })
    }
}
