//! Retry logic for transient transfer failures
//!
//! The default [`RetryConfig`] is a fixed-delay policy (ten attempts, one second
//! apart, no jitter). Only failed TLS handshakes count as transient for
//! transfers; see [`is_tls_failure`]. A multiplier above 1.0 turns the delay
//! into exponential backoff.
//!
//! # Example
//!
//! ```no_run
//! use artfetch::retry::{IsRetryable, download_with_retry};
//! use artfetch::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
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
//! download_with_retry(&config, || async {
//!     Ok::<_, MyError>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::error::Error as StdError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures should return `true`. For transfers that means a failed
/// TLS handshake; everything else (refused connections, timeouts, HTTP status
/// errors, disk errors, bad metadata) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Network(e) => is_tls_failure(e),
            Error::Io(_) => false,
            Error::Http { .. } => false,
            _ => false,
        }
    }
}

/// Markers the HTTP connector puts on failures below the TLS layer
const TCP_LAYER_MARKERS: [&str; 3] = ["tcp connect error", "tcp open error", "dns error"];

/// Markers TLS backends put on handshake and certificate failures
const TLS_LAYER_MARKERS: [&str; 4] = ["tls", "ssl", "handshake", "certificate"];

/// Whether a reqwest error is a failed TLS handshake with the remote host
///
/// Only the error's source chain is inspected; the top-level message carries
/// the request URL, which says nothing about the failure. A TCP or DNS failure
/// anywhere in the chain wins over a TLS marker further down.
pub fn is_tls_failure(error: &reqwest::Error) -> bool {
    if error.is_timeout()
        || error.is_status()
        || error.is_decode()
        || error.is_builder()
        || error.is_redirect()
    {
        return false;
    }

    let mut source: Option<&(dyn StdError + 'static)> = error.source();
    while let Some(cause) = source {
        let text = cause.to_string().to_lowercase();
        if TCP_LAYER_MARKERS.iter().any(|marker| text.contains(marker)) {
            return false;
        }
        if TLS_LAYER_MARKERS.iter().any(|marker| text.contains(marker)) {
            return true;
        }
        source = cause.source();
    }
    false
}

/// Execute an async operation, retrying transient failures
///
/// `config.max_attempts` counts every attempt including the first. Returns the
/// successful result, the first non-retryable error, or the last retryable error
/// once attempts are exhausted.
pub async fn download_with_retry<F, Fut, T, E>(config: &RetryConfig, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    download_with_retry_cancellable(config, &CancellationToken::new(), operation).await
}

/// Same as [`download_with_retry`], but stops waiting between attempts once
/// `cancel` fires
///
/// On cancellation during a delay the last error is returned; callers that care
/// check `cancel.is_cancelled()` to tell the two apart.
pub async fn download_with_retry_cancellable<F, Fut, T, E>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying"
                );

                let wait = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };

                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!(attempt, "Retry wait cancelled");
                        return Err(e);
                    }
                    _ = tokio::time::sleep(wait) => {}
                }

                attempt += 1;
                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::debug!(error = %e, "Operation failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// The result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
