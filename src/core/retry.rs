//! Retry utility for handling transient errors in async operations
//!
//! Provides configurable retry policies with a backoff schedule and an
//! optional per-attempt gate (used for connectivity probes before retrying
//! against a store that may still be down).

use std::time::Duration;
use tokio::time::sleep;

/// Backoff schedule between retry attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry
    Fixed,
    /// Delay doubles after each failed attempt
    Exponential,
}

/// Configurable retry policy for async operations
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            backoff: Backoff::Exponential,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given zero-based attempt fails
    ///
    /// The schedule is non-decreasing: exponential backoff doubles the base
    /// delay per attempt, fixed backoff repeats it.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.base_delay,
            Backoff::Exponential => {
                let factor = 1u32 << attempt.min(16) as u32;
                self.base_delay.saturating_mul(factor)
            }
        }
    }
}

/// Execute an async operation with retry logic for transient errors
///
/// # Examples
/// ```rust
/// use deskqueue::core::retry::{retry_async, RetryPolicy};
///
/// # async fn example() -> Result<String, String> {
/// let result = retry_async("store_write", RetryPolicy::default(), || async {
///     Ok::<String, String>("success".to_string())
/// })
/// .await?;
/// # Ok(result)
/// # }
/// ```
pub async fn retry_async<F, T, E, Fut>(
    operation_name: &str,
    policy: RetryPolicy,
    operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_async_gated(operation_name, policy, || async { true }, operation).await
}

/// Like [`retry_async`], but runs `gate` before every retry
///
/// The gate is a cheap precondition check (e.g. a store read probe); while
/// it returns `false` the combinator waits another backoff interval instead
/// of burning a real attempt against a known-down dependency. The gate is
/// not consulted before the first attempt.
pub async fn retry_async_gated<F, G, T, E, Fut, GFut>(
    operation_name: &str,
    policy: RetryPolicy,
    mut gate: G,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    G: FnMut() -> GFut,
    GFut: std::future::Future<Output = bool>,
    E: std::fmt::Display,
{
    let mut last_error = None;

    // A zero-attempt budget still runs the operation once, so a bad config
    // value degrades to "no retries" instead of a panic.
    let attempts = policy.max_attempts.max(1);

    for attempt in 0..attempts {
        if attempt > 0 {
            let delay = policy.delay_for(attempt - 1);
            log::debug!(
                "Operation '{}' attempt {}/{} failed, retrying in {:?}: {}",
                operation_name,
                attempt,
                attempts,
                delay,
                last_error.as_ref().unwrap()
            );
            sleep(delay).await;

            // One probe per retry; a closed gate buys one extra wait, then
            // the attempt proceeds and consumes budget either way.
            if !gate().await {
                log::debug!(
                    "Operation '{}' retry gated: dependency unavailable, waiting {:?}",
                    operation_name,
                    delay
                );
                sleep(delay).await;
            }
        }

        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) => last_error = Some(error),
        }
    }

    Err(last_error.unwrap())
}
