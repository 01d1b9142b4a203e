//! Generic retry-with-backoff helper for fallible async operations.
//!
//! Shares the full-jitter strategy the Sync Client uses for relay
//! reconnection (`delay = random(0, min(cap, base * 2^attempt))`), but as a
//! reusable helper for one-shot fallible calls (e.g. a daemon RPC, a storage
//! write) rather than a standing connection loop.

use std::future::Future;
use std::time::Duration;

/// Configuration for [`retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Base delay in milliseconds before jitter is applied.
    pub base_delay_ms: u64,
    /// Maximum delay in milliseconds, regardless of attempt count.
    pub max_delay_ms: u64,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            max_delay_ms,
        }
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay_ms
            .saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
        let capped = exp.min(self.max_delay_ms);
        let jittered = if capped == 0 { 0 } else { fastrand::u64(0..=capped) };
        Duration::from_millis(jittered)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(5, 100, 5_000)
    }
}

/// The result of running [`retry`] to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    /// The operation succeeded, after the given number of attempts (1-indexed).
    Succeeded {
        /// The successful value.
        value: T,
        /// How many attempts the operation took.
        attempts: u32,
    },
    /// Every attempt failed; the configured attempt budget was exhausted.
    Exhausted {
        /// How many attempts were made.
        attempts: u32,
    },
}

impl<T> RetryOutcome<T> {
    /// Converts the outcome into a `Result`, discarding attempt counts.
    ///
    /// # Errors
    ///
    /// Returns `last_error` if every attempt failed.
    pub fn into_result<E>(self, last_error: E) -> Result<T, E> {
        match self {
            Self::Succeeded { value, .. } => Ok(value),
            Self::Exhausted { .. } => Err(last_error),
        }
    }

    /// Returns `true` if the operation ultimately succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Retries a fallible async operation with full-jitter exponential backoff.
///
/// `op` is invoked up to `config.max_attempts` times. Between attempts the
/// caller's `on_retry` callback is invoked with the error and the delay about
/// to be slept, so call sites can log without this helper depending on
/// `tracing` directly.
pub async fn retry<T, E, F, Fut>(
    config: &RetryConfig,
    mut op: F,
    mut on_retry: impl FnMut(&E, Duration),
) -> RetryOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return RetryOutcome::Succeeded { value, attempts: attempt },
            Err(err) => {
                if attempt >= config.max_attempts {
                    return RetryOutcome::Exhausted { attempts: attempt };
                }
                let delay = config.delay_for_attempt(attempt - 1);
                on_retry(&err, delay);
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_on_first_attempt() {
        let config = RetryConfig::new(3, 1, 1);
        let outcome: RetryOutcome<i32> =
            retry(&config, || async { Ok::<_, &str>(42) }, |_, _| {}).await;
        assert_eq!(outcome, RetryOutcome::Succeeded { value: 42, attempts: 1 });
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let config = RetryConfig::new(5, 1, 5);
        let calls = AtomicU32::new(0);
        let outcome: RetryOutcome<i32> = retry(
            &config,
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("not yet")
                    } else {
                        Ok(7)
                    }
                }
            },
            |_, _| {},
        )
        .await;
        assert_eq!(outcome, RetryOutcome::Succeeded { value: 7, attempts: 3 });
    }

    #[tokio::test]
    async fn exhausts_after_max_attempts() {
        let config = RetryConfig::new(3, 1, 1);
        let outcome: RetryOutcome<i32> =
            retry(&config, || async { Err::<i32, _>("always fails") }, |_, _| {}).await;
        assert_eq!(outcome, RetryOutcome::Exhausted { attempts: 3 });
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn into_result_maps_exhausted_to_caller_error() {
        let config = RetryConfig::new(1, 1, 1);
        let outcome: RetryOutcome<i32> =
            retry(&config, || async { Err::<i32, &str>("boom") }, |_, _| {}).await;
        assert_eq!(outcome.into_result("gave up"), Err("gave up"));
    }

    #[test]
    fn delay_is_capped_at_max() {
        let config = RetryConfig::new(20, 1000, 4000);
        for attempt in 0..20 {
            let delay = config.delay_for_attempt(attempt);
            assert!(delay <= Duration::from_millis(4000));
        }
    }
}
