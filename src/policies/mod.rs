//! Retry and relaunch policies.
//!
//! This module groups the knobs that control **when** a capture process is
//! relaunched and **how long** to wait between attempts.
//!
//! ## Contents
//! - [`RetryPolicy`]  process-wide tunables (budget, intervals, stall timeout)
//! - [`RetryTracker`] per-stream counter turning failures into [`RetryDecision`]s
//! - [`BackoffPolicy`] how delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization strategy to avoid reconnect storms
//!
//! ## Quick wiring
//! ```text
//! RetryPolicy ──► core::actor::SupervisorActor uses:
//!     - RetryTracker::on_failure() on abnormal exit / spawn failure / stall
//!     - RetryTracker::reset() on clean exit
//!     - error_check_interval / stall_timeout for liveness
//! ```

mod backoff;
mod jitter;
mod retry;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use retry::{RetryDecision, RetryPolicy, RetryTracker};
