//! Capture processes: the seam between supervisors and the OS.
//!
//! ## Contents
//! - [`Launcher`], [`CaptureProcess`], [`ProcessEvent`], [`ExitReport`] the seam
//! - [`FfmpegLauncher`], [`Invocation`] the real `tokio::process` implementation
//! - [`ErrorClassifier`] keyword matching on diagnostic lines

mod classify;
mod ffmpeg;
mod launcher;

#[cfg(test)]
pub(crate) mod testing;

pub use classify::ErrorClassifier;
pub use ffmpeg::{FfmpegLauncher, Invocation, SEGMENT_TIME_FORMAT};
pub use launcher::{CaptureProcess, ExitReport, Launcher, ProcessEvent};
