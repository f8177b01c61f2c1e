//! # Retry policy and the retry procedure.
//!
//! [`RetryPolicy`] holds the process-wide tunables every supervisor reads.
//! [`RetryTracker`] is the per-stream counter that turns a failure into a
//! [`RetryDecision`]. It is the single funnel for abnormal exits, spawn
//! failures and stalls:
//!
//! ```text
//! on_failure()
//!   ├─ count >= max_retries ─► count = 0, Cooldown { delay: cooldown }
//!   └─ otherwise            ─► count += 1,
//!                              Backoff { retry: count, delay: min(base·2^(count-1), max_backoff) }
//!
//! reset()  (clean exit) ─► count = 0
//! ```
//!
//! Exhausting the budget is never fatal: after the cooldown the counter
//! starts from zero again, so a stream is retried indefinitely.

use std::time::Duration;

use crate::policies::{BackoffPolicy, JitterPolicy};

/// Process-wide supervision tunables.
///
/// Immutable once resolved; shared read-only by every supervisor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Consecutive failures allowed before entering cooldown.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub base_interval: Duration,
    /// Upper bound for a single backoff delay.
    pub max_backoff: Duration,
    /// Fixed pause once the retry budget is exhausted.
    pub cooldown: Duration,
    /// Randomization applied to backoff delays.
    pub jitter: JitterPolicy,
    /// Target length of each output segment.
    pub segment_duration: Duration,
    /// Period of the stall check while a process is active.
    pub error_check_interval: Duration,
    /// Silence longer than this marks the process as stalled.
    pub stall_timeout: Duration,
}

impl Default for RetryPolicy {
    /// Default tunables:
    ///
    /// - `max_retries = 5`
    /// - `base_interval = 5s`, `max_backoff = 30s`, `cooldown = 60s`
    /// - `segment_duration = 600s`
    /// - `error_check_interval = 30s`, `stall_timeout = 60s`
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_interval: Duration::from_millis(5000),
            max_backoff: Duration::from_millis(30_000),
            cooldown: Duration::from_millis(60_000),
            jitter: JitterPolicy::None,
            segment_duration: Duration::from_secs(600),
            error_check_interval: Duration::from_millis(30_000),
            stall_timeout: Duration::from_millis(60_000),
        }
    }
}

impl RetryPolicy {
    /// Backoff curve derived from this policy (doubling from `base_interval`).
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            first: self.base_interval,
            max: self.max_backoff,
            factor: 2,
            jitter: self.jitter,
        }
    }
}

/// What to do after a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Relaunch after an exponential delay.
    Backoff {
        /// Retry counter after the increment (1-based).
        retry: u32,
        /// Delay before the relaunch.
        delay: Duration,
    },
    /// Budget exhausted: relaunch after the fixed cooldown, counter reset.
    Cooldown {
        /// The cooldown delay.
        delay: Duration,
    },
}

impl RetryDecision {
    /// Delay before the relaunch.
    pub fn delay(&self) -> Duration {
        match self {
            RetryDecision::Backoff { delay, .. } | RetryDecision::Cooldown { delay } => *delay,
        }
    }
}

/// Per-stream retry counter.
#[derive(Clone, Debug)]
pub struct RetryTracker {
    backoff: BackoffPolicy,
    max_retries: u32,
    cooldown: Duration,
    count: u32,
}

impl RetryTracker {
    /// Creates a tracker with a zero counter.
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            backoff: policy.backoff(),
            max_retries: policy.max_retries,
            cooldown: policy.cooldown,
            count: 0,
        }
    }

    /// Current retry counter.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Resets the counter (clean exit).
    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Records a failure and decides the next relaunch.
    pub fn on_failure(&mut self) -> RetryDecision {
        if self.count >= self.max_retries {
            self.count = 0;
            return RetryDecision::Cooldown {
                delay: self.cooldown,
            };
        }

        self.count += 1;
        RetryDecision::Backoff {
            retry: self.count,
            delay: self.backoff.next(self.count - 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_retries: u32, base_ms: u64) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_interval: Duration::from_millis(base_ms),
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn test_backoff_sequence_matches_capped_doubling() {
        let p = policy(10, 5000);
        let mut tracker = RetryTracker::new(&p);

        for n in 1..=10u32 {
            let expected = (5000u64 * 2u64.pow(n - 1)).min(30_000);
            assert_eq!(
                tracker.on_failure(),
                RetryDecision::Backoff {
                    retry: n,
                    delay: Duration::from_millis(expected),
                },
                "retry {n}"
            );
        }
    }

    #[test]
    fn test_exhausted_budget_enters_cooldown_and_resets() {
        let mut tracker = RetryTracker::new(&policy(2, 1000));

        assert_eq!(tracker.on_failure().delay(), Duration::from_millis(1000));
        assert_eq!(tracker.on_failure().delay(), Duration::from_millis(2000));
        assert_eq!(tracker.count(), 2);

        assert_eq!(
            tracker.on_failure(),
            RetryDecision::Cooldown {
                delay: Duration::from_millis(60_000)
            }
        );
        assert_eq!(tracker.count(), 0);

        // retries resume from the start after the cooldown
        assert_eq!(
            tracker.on_failure(),
            RetryDecision::Backoff {
                retry: 1,
                delay: Duration::from_millis(1000)
            }
        );
    }

    #[test]
    fn test_cooldown_is_independent_of_base_interval() {
        let mut tracker = RetryTracker::new(&policy(0, 123));
        assert_eq!(tracker.on_failure().delay(), Duration::from_secs(60));
    }

    #[test]
    fn test_reset_after_clean_exit() {
        let mut tracker = RetryTracker::new(&policy(5, 1000));
        tracker.on_failure();
        tracker.on_failure();
        tracker.reset();
        assert_eq!(tracker.count(), 0);
        assert_eq!(tracker.on_failure().delay(), Duration::from_millis(1000));
    }
}
