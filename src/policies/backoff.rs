//! # Backoff policy for relaunching capture processes.
//!
//! [`BackoffPolicy`] controls how relaunch delays grow after repeated failures.
//! It is parameterized by:
//! - [`BackoffPolicy::first`] the initial delay;
//! - [`BackoffPolicy::factor`] the integer growth factor;
//! - [`BackoffPolicy::max`] the maximum delay cap.
//!
//! The delay for exponent `n` is `first × factor^n`, clamped to `max`, then jitter
//! is applied. The arithmetic is exact (integer multiplication on [`Duration`]),
//! so with [`JitterPolicy::None`] the result is fully deterministic.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use streamvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_secs(5),
//!     max: Duration::from_secs(30),
//!     factor: 2,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_secs(5));
//! assert_eq!(backoff.next(1), Duration::from_secs(10));
//! assert_eq!(backoff.next(3), Duration::from_secs(30)); // 40s capped
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Relaunch backoff policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`2` doubles the delay every retry).
    pub factor: u32,
    /// Jitter policy to spread relaunches of many streams.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns a strategy with:
    /// - `first = 5s`;
    /// - `factor = 2` (doubling);
    /// - `max = 30s`;
    /// - no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_secs(5),
            max: Duration::from_secs(30),
            factor: 2,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Computes the delay for the given exponent (0 for the first retry).
    ///
    /// Overflow of either the power or the multiplication saturates to
    /// [`BackoffPolicy::max`].
    pub fn next(&self, exponent: u32) -> Duration {
        let base = self
            .factor
            .checked_pow(exponent)
            .and_then(|m| self.first.checked_mul(m))
            .map_or(self.max, |d| d.min(self.max));

        self.jitter.apply(base)
    }
}
