//! Observable per-stream supervisor state.

use std::fmt;

/// Where a supervisor is in its lifecycle.
///
/// `Active` holds exactly when a capture process is owned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SupervisorStatus {
    /// Not supervising (initial and terminal).
    #[default]
    Stopped,
    /// Spawning the capture process.
    Launching,
    /// A process is running and watched for liveness.
    Active,
    /// Waiting out a backoff delay before relaunching.
    SchedulingRetry,
    /// Retry budget exhausted; waiting out the cooldown.
    CooldownWait,
}

impl SupervisorStatus {
    /// Short stable label for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SupervisorStatus::Stopped => "stopped",
            SupervisorStatus::Launching => "launching",
            SupervisorStatus::Active => "active",
            SupervisorStatus::SchedulingRetry => "scheduling_retry",
            SupervisorStatus::CooldownWait => "cooldown_wait",
        }
    }
}

impl fmt::Display for SupervisorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Read-only copy of a supervisor's state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateSnapshot {
    /// Current lifecycle status.
    pub status: SupervisorStatus,
    /// Consecutive failures since the last clean exit or cooldown.
    pub retry_count: u32,
    /// Launches so far (monotonic, survives stop/start).
    pub attempt: u32,
    /// Most recent output line classified as an error.
    pub last_error: Option<String>,
}
