//! Retry logic with exponential backoff
//!
//! The policy lives in [`RetryConfig`]: how many retries, and the backoff
//! function [`RetryConfig::delay_for`]. [`download_with_retry`] applies it to
//! any async operation whose error type implements [`IsRetryable`].
//!
//! # Example
//!
//! ```no_run
//! use gallery_fetch::config::RetryConfig;
//! use gallery_fetch::retry::{IsRetryable, download_with_retry};
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "transient")
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! download_with_retry(&config, || async { Ok::<_, MyError>(()) }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::FetchError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, connection resets, 5xx) return `true`.
/// Terminal answers (not found, unexpected status, empty body) return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout
            | FetchError::Connect(_)
            | FetchError::Transport(_)
            | FetchError::ServerError { .. } => true,
            // A missing image is an answer, not a failure
            FetchError::NotFound { .. } => false,
            FetchError::UnexpectedStatus { .. }
            | FetchError::EmptyBody
            | FetchError::UnexpectedContentType(_) => false,
        }
    }
}

impl RetryConfig {
    /// Backoff before retry number `retry` (1-based), before jitter
    ///
    /// `initial_delay * backoff_multiplier^(retry - 1)`, capped at `max_delay`.
    /// `retry == 0` yields zero.
    pub fn delay_for(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs.max(0.0))
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// The operation runs once, then up to `config.max_retries` more times while
/// it keeps failing with a retryable error. Returns the first success, the
/// first non-retryable error, or the last error once retries are exhausted.
pub async fn download_with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut retry = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if retry > 0 {
                    tracing::debug!(attempts = retry + 1, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && retry < config.max_retries => {
                retry += 1;
                let delay = config.delay_for(retry);
                let delay = if config.jitter { add_jitter(delay) } else { delay };

                tracing::debug!(
                    error = %e,
                    retry,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying"
                );

                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::debug!(
                        error = %e,
                        attempts = retry + 1,
                        "Operation failed after all retry attempts exhausted"
                    );
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// The result is uniformly distributed between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
