//! # Runtime events emitted by stream supervisors and the manager.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Process events**: launch, output errors, exit, spawn failure, stall
//! - **Retry events**: backoff and cooldown scheduling
//! - **Runtime events**: supervisor stop, shutdown, subscriber health
//!
//! The [`Event`] struct carries the metadata: stream id, attempt, retry
//! counter, delay, exit code/signal, pid and a human-readable reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Within one stream, events are published in the order the supervisor handled them.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use streamvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::BackoffScheduled)
//!     .with_stream("cam1")
//!     .with_retry(2)
//!     .with_delay(Duration::from_secs(10));
//!
//! assert_eq!(ev.kind, EventKind::BackoffScheduled);
//! assert_eq!(ev.stream.as_deref(), Some("cam1"));
//! assert_eq!(ev.delay_ms, Some(10_000));
//! ```

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `stream`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `stream`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Shutdown events ===
    /// Shutdown requested (OS signal observed or explicit shutdown).
    ShutdownRequested,

    /// Every supervisor has been stopped and released its process.
    AllStopped,

    // === Process lifecycle events ===
    /// A supervisor is about to spawn its capture process.
    ///
    /// Sets:
    /// - `stream`: stream id
    /// - `attempt`: launch number (1-based, per supervisor, never resets)
    /// - `retry`: current retry counter
    ProcessLaunching,

    /// The capture process was spawned and is now supervised.
    ///
    /// Sets:
    /// - `stream`, `attempt`
    /// - `pid`: OS process id, when known
    /// - `segment`: file the first segment will be written to, when known
    ProcessLaunched,

    /// The capture process could not be spawned.
    ///
    /// Sets:
    /// - `stream`, `attempt`
    /// - `reason`: OS error message
    SpawnFailed,

    /// The process printed a line that matched an error keyword.
    ///
    /// Sets:
    /// - `stream`
    /// - `reason`: the offending line
    OutputError,

    /// The capture process terminated.
    ///
    /// Sets:
    /// - `stream`, `attempt`
    /// - `code`: exit code (if any)
    /// - `signal`: terminating signal (if any)
    /// - `reason`: last error line seen before the exit (if any)
    ProcessExited,

    /// The process produced no output for longer than the stall timeout.
    ///
    /// Sets:
    /// - `stream`, `attempt`
    /// - `delay_ms`: time since last output (ms)
    StallDetected,

    // === Retry events ===
    /// Relaunch scheduled after an exponential backoff delay.
    ///
    /// Sets:
    /// - `stream`
    /// - `retry`: retry counter after the increment (1-based)
    /// - `delay_ms`: delay before the relaunch (ms)
    /// - `reason`: the failure that triggered it
    BackoffScheduled,

    /// Retry budget exhausted; relaunch scheduled after the fixed cooldown.
    ///
    /// Sets:
    /// - `stream`
    /// - `retry`: retry counter after the reset (always 0)
    /// - `delay_ms`: cooldown (ms)
    /// - `reason`: the failure that triggered it
    CooldownScheduled,

    /// Supervisor left its loop; no process and no timer remain.
    ///
    /// Sets:
    /// - `stream`
    SupervisorStopped,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Stream id (or subscriber name for subscriber events).
    pub stream: Option<Arc<str>>,
    /// Launch number (starting from 1).
    pub attempt: Option<u32>,
    /// Retry counter at the time of the event.
    pub retry: Option<u32>,
    /// Delay or elapsed time in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Process exit code.
    pub code: Option<i32>,
    /// Process terminating signal.
    pub signal: Option<i32>,
    /// OS process id.
    pub pid: Option<u32>,
    /// Human-readable reason (errors, output lines, overflow details).
    pub reason: Option<Arc<str>>,
    /// Output segment path.
    pub segment: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            stream: None,
            attempt: None,
            retry: None,
            delay_ms: None,
            code: None,
            signal: None,
            pid: None,
            reason: None,
            segment: None,
        }
    }

    /// Attaches a stream id.
    #[inline]
    pub fn with_stream(mut self, stream: impl Into<Arc<str>>) -> Self {
        self.stream = Some(stream.into());
        self
    }

    /// Attaches a launch number.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches the retry counter.
    #[inline]
    pub fn with_retry(mut self, n: u32) -> Self {
        self.retry = Some(n);
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches an exit code and signal.
    #[inline]
    pub fn with_exit(mut self, code: Option<i32>, signal: Option<i32>) -> Self {
        self.code = code;
        self.signal = signal;
        self
    }

    /// Attaches an OS process id.
    #[inline]
    pub fn with_pid(mut self, pid: Option<u32>) -> Self {
        self.pid = pid;
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an output segment path.
    #[inline]
    pub fn with_segment(mut self, path: &Path) -> Self {
        self.segment = Some(Arc::from(path.display().to_string()));
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_stream(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_stream(subscriber)
            .with_reason(info)
    }

    /// Delay as a [`Duration`], if set.
    #[inline]
    pub fn delay(&self) -> Option<Duration> {
        self.delay_ms.map(|ms| Duration::from_millis(u64::from(ms)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::ProcessLaunching);
        let b = Event::new(EventKind::ProcessLaunched);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_delay_saturates_at_u32() {
        let ev = Event::new(EventKind::CooldownScheduled).with_delay(Duration::from_secs(u64::MAX));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }

    #[test]
    fn test_backoff_delay_reads_back_as_duration() {
        let ev = Event::new(EventKind::BackoffScheduled).with_delay(Duration::from_secs(5));
        assert_eq!(ev.delay(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_exit_fields() {
        let ev = Event::new(EventKind::ProcessExited)
            .with_stream("a")
            .with_exit(None, Some(9));
        assert_eq!(ev.code, None);
        assert_eq!(ev.signal, Some(9));
        assert_eq!(ev.delay(), None);
    }
}
