//! # LogWriter: event renderer for `tracing`
//!
//! Turns every [`Event`] into one structured `tracing` record, with the stream
//! id as a field so a log pipeline can filter per camera.
//!
//! ## Example output (fmt layer)
//! ```text
//! INFO  stream="cam1" attempt=1 retry=0 launching capture process
//! INFO  stream="cam1" attempt=1 pid=4242 segment=Some("./output/cam1_2024-03-09-07-05.mp4") capture process running
//! WARN  stream="cam1" line="rtsp://...: Connection refused" capture tool reported an error
//! WARN  stream="cam1" attempt=1 code=1 capture process exited abnormally
//! INFO  stream="cam1" retry=Some(1) delay=Some(5s) relaunch scheduled
//! ERROR stream="cam1" delay=Some(60s) retry budget exhausted, cooling down
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let stream = e.stream.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::ShutdownRequested => {
                tracing::info!("shutdown requested, stopping all streams");
            }
            EventKind::AllStopped => {
                tracing::info!("all streams stopped");
            }
            EventKind::ProcessLaunching => {
                tracing::info!(stream, attempt = ?e.attempt, retry = ?e.retry, "launching capture process");
            }
            EventKind::ProcessLaunched => {
                tracing::info!(stream, attempt = ?e.attempt, pid = ?e.pid, segment = ?e.segment, "capture process running");
            }
            EventKind::SpawnFailed => {
                tracing::error!(stream, attempt = ?e.attempt, err = ?e.reason, "failed to spawn capture process");
            }
            EventKind::OutputError => {
                tracing::warn!(stream, line = ?e.reason, "capture tool reported an error");
            }
            EventKind::ProcessExited => match (e.code, e.signal) {
                (Some(0), _) => {
                    tracing::info!(stream, attempt = ?e.attempt, "capture process exited cleanly");
                }
                (code, signal) => {
                    tracing::warn!(stream, attempt = ?e.attempt, ?code, ?signal, last_error = ?e.reason, "capture process exited abnormally");
                }
            },
            EventKind::StallDetected => {
                tracing::warn!(stream, silent = ?e.delay(), "stream stalled, restarting");
            }
            EventKind::BackoffScheduled => {
                tracing::info!(stream, retry = ?e.retry, delay = ?e.delay(), err = ?e.reason, "relaunch scheduled");
            }
            EventKind::CooldownScheduled => {
                tracing::error!(stream, delay = ?e.delay(), err = ?e.reason, "retry budget exhausted, cooling down");
            }
            EventKind::SupervisorStopped => {
                tracing::info!(stream, "supervisor stopped");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(subscriber = stream, reason = ?e.reason, "subscriber dropped an event");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(subscriber = stream, info = ?e.reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
