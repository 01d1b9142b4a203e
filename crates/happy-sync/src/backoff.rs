//! Exponential backoff with full jitter for the reconnect loop (spec §4.2
//! "Reconnect": "exponential backoff (bounded)... after the ceiling it
//! continues at the ceiling indefinitely").
//!
//! Follows the AWS "Full Jitter" strategy: `delay = random(0, min(cap, base
//! * 2^attempt))`. The same shape as this codebase's existing gateway-proxy
//! reconnect backoff, generalized to the relay-facing transport.

use std::time::Duration;

/// Exponential backoff calculator with full jitter.
pub(crate) struct Backoff {
    base_ms: u64,
    max_ms: u64,
    attempt: u32,
}

impl Backoff {
    /// Creates a calculator bounded at `max_ms`.
    pub(crate) const fn new(base_ms: u64, max_ms: u64) -> Self {
        Self { base_ms, max_ms, attempt: 0 }
    }

    /// The default reconnect backoff: 250ms base, capped at 30s.
    pub(crate) const fn with_defaults() -> Self {
        Self::new(250, 30_000)
    }

    /// Computes the next delay with full jitter and advances the attempt
    /// counter. Once `attempt` saturates the delay stays pinned at the
    /// ceiling rather than wrapping.
    pub(crate) fn next_delay(&mut self) -> Duration {
        let exp = self.base_ms.saturating_mul(1u64.checked_shl(self.attempt).unwrap_or(u64::MAX));
        let capped = exp.min(self.max_ms);
        let jittered = if capped == 0 { 0 } else { fastrand::u64(0..=capped) };
        self.attempt = self.attempt.saturating_add(1);
        Duration::from_millis(jittered)
    }

    /// Resets the attempt counter after a successful reconnect.
    pub(crate) fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_delay_bounded_by_base() {
        let mut b = Backoff::new(1000, 60_000);
        let delay = b.next_delay();
        assert!(delay <= Duration::from_millis(1000));
    }

    #[test]
    fn delay_capped_at_max() {
        let mut b = Backoff::new(1000, 5000);
        for _ in 0..20 {
            let delay = b.next_delay();
            assert!(delay <= Duration::from_millis(5000));
        }
    }

    #[test]
    fn reset_restarts_from_the_base_delay() {
        let mut b = Backoff::new(1000, 60_000);
        for _ in 0..5 {
            let _ = b.next_delay();
        }
        b.reset();
        assert_eq!(b.attempt, 0);
    }

    #[test]
    fn attempt_saturates_instead_of_wrapping() {
        let mut b = Backoff::new(1000, 60_000);
        b.attempt = u32::MAX;
        let delay = b.next_delay();
        assert!(delay <= Duration::from_millis(60_000));
        assert_eq!(b.attempt, u32::MAX);
    }
}
