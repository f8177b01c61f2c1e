//! # streamvisor
//!
//! **Streamvisor** keeps long-running capture processes alive.
//!
//! Each configured stream gets a supervisor that launches one capture process
//! (ffmpeg by default), watches its output for errors and silence, restarts it
//! with exponential backoff when it fails, and falls back to a fixed cooldown
//! once the retry budget is exhausted. Output is written as fixed-length,
//! wall-clock-named segments.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  Stream "a"  │   │  Stream "b"  │   │  Stream "c"  │
//!     │  (id, url)   │   │  (id, url)   │   │  (id, url)   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  SupervisorManager                                                │
//! │  - Bus (broadcast events)                                         │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! │  - one ProcessSupervisor per stream id                            │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │ Supervisor   │   │ Supervisor   │   │ Supervisor   │   │
//!     │ (retry loop) │   │ (retry loop) │   │ (retry loop) │   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │ Launcher         │                  │                 │
//!      ▼                  ▼                  ▼                 │
//!    ffmpeg             ffmpeg             ffmpeg              │
//!      │ Publishes:       │                  │                 │
//!      │ - ProcessLaunched│ - OutputError    │ - StallDetected │
//!      │ - ProcessExited  │ - BackoffSched.  │ - CooldownSched.│
//!      ▼                  ▼                  ▼                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │    event listener      │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                          ┌─────────┼─────────┐
//!                          ▼         ▼         ▼
//!                       worker1   worker2   workerN
//! ```
//!
//! ### Lifecycle
//! ```text
//! Stopped ──start()──► Launching ──spawned──► Active
//!                          │                    │
//!                     spawn error     exit ≠ 0 / signal / stall
//!                          └─────────┬──────────┘
//!                                    ▼
//!                     retry < max_retries ? SchedulingRetry (backoff)
//!                                         : CooldownWait    (cooldown, retry = 0)
//!                                    │
//!                               delay elapses ──► Launching
//!
//! Active ──exit 0──► Launching   (retry = 0, no delay)
//! any    ──stop()──► Stopped     (process killed, timers cancelled)
//! ```
//!
//! ## Features
//! | Area              | Description                                             | Key types / traits                                  |
//! |-------------------|---------------------------------------------------------|-----------------------------------------------------|
//! | **Supervision**   | Per-stream restart loop and multi-stream orchestration. | [`ProcessSupervisor`], [`SupervisorManager`]        |
//! | **Policies**      | Retry budget, backoff curve, cooldown, liveness.        | [`RetryPolicy`], [`BackoffPolicy`], [`JitterPolicy`]|
//! | **Processes**     | Process seam and the ffmpeg implementation.             | [`Launcher`], [`CaptureProcess`], [`FfmpegLauncher`]|
//! | **Subscriber API**| Hook into lifecycle events.                             | [`Subscribe`], [`Event`], [`EventKind`]             |
//! | **Configuration** | Layered settings (CLI > env > TOML > defaults).         | [`ConfigResolver`], [`LayeredResolver`]             |
//! | **Errors**        | Typed errors for config, processes and the runtime.     | [`ConfigError`], [`ProcessError`], [`RuntimeError`] |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], rendering events through `tracing`.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use streamvisor::{ConfigResolver, LayeredResolver, SupervisorManager};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = LayeredResolver::from_process_env().resolve()?;
//!     settings.capture.ensure_output_dir()?;
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn streamvisor::Subscribe>> =
//!         vec![Arc::new(streamvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn streamvisor::Subscribe>> = Vec::new();
//!
//!     SupervisorManager::builder(settings)
//!         .with_subscribers(subs)
//!         .build()
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod policies;
mod process;
mod subscribers;

// ---- Public re-exports ----

pub use config::{
    CaptureSettings, ConfigResolver, DEFAULT_ERROR_KEYWORDS, LayeredResolver, Overrides,
    PartialSettings, RetrySection, Settings, StreamDefinition,
};
pub use core::{
    DEFAULT_BUS_CAPACITY, ManagerBuilder, ProcessSupervisor, StateSnapshot, SupervisorContext,
    SupervisorManager, SupervisorStatus, wait_for_shutdown_signal,
};
pub use error::{ConfigError, ProcessError, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy, RetryDecision, RetryPolicy, RetryTracker};
pub use process::{
    CaptureProcess, ErrorClassifier, ExitReport, FfmpegLauncher, Invocation, Launcher,
    ProcessEvent, SEGMENT_TIME_FORMAT,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Built-in subscriber rendering events through `tracing`.
// Disable with: `--no-default-features`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
