//! # Process seam: launching and observing a capture process.
//!
//! The supervisor never touches an OS process directly. It asks a [`Launcher`]
//! for a [`CaptureProcess`] and then only sees [`ProcessEvent`]s:
//!
//! ```text
//! Launcher::launch(stream) ──► Box<dyn CaptureProcess>
//!                                 ├─ next_event() ─► Output(line) | Exited(ExitReport)
//!                                 └─ kill()       ─► force-terminate, reap
//! ```
//!
//! This keeps the state machine testable with scripted processes and a paused
//! clock, and makes the process an opaque owned resource with a single release
//! path.

use std::path::Path;

use async_trait::async_trait;

use crate::config::StreamDefinition;
use crate::error::ProcessError;

/// How a capture process terminated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExitReport {
    /// Exit code (absent when killed by a signal).
    pub code: Option<i32>,
    /// Terminating signal (unix only).
    pub signal: Option<i32>,
}

impl ExitReport {
    /// Exit with the given code.
    pub fn code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    /// Death by the given signal.
    pub fn signal(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    /// A clean exit is code 0; anything else (including signals) is abnormal.
    pub fn is_clean(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ExitReport {
    fn from(status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

/// Something observed from a running process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessEvent {
    /// One line of stdout or stderr.
    Output(String),
    /// The process terminated.
    Exited(ExitReport),
}

/// A running capture process, exclusively owned by one supervisor.
#[async_trait]
pub trait CaptureProcess: Send {
    /// OS process id, when known.
    fn pid(&self) -> Option<u32>;

    /// File the first output segment is expected at, when known.
    fn first_segment(&self) -> Option<&Path> {
        None
    }

    /// Waits for the next output line or the exit.
    ///
    /// Must be cancel-safe: the supervisor polls it inside `select!`.
    /// After `Exited` has been returned it is not called again.
    async fn next_event(&mut self) -> Result<ProcessEvent, ProcessError>;

    /// Force-terminates the process and reaps it. Safe to call more than once.
    async fn kill(&mut self);
}

/// Creates capture processes for streams.
#[async_trait]
pub trait Launcher: Send + Sync + 'static {
    /// Spawns the capture process for `stream`.
    async fn launch(
        &self,
        stream: &StreamDefinition,
    ) -> Result<Box<dyn CaptureProcess>, ProcessError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_code_zero_is_clean() {
        assert!(ExitReport::code(0).is_clean());
        assert!(!ExitReport::code(1).is_clean());
        assert!(!ExitReport::signal(9).is_clean());
    }
}
