//! # ProcessSupervisor: owner handle for one stream.
//!
//! Wraps a [`SupervisorActor`] task with start/stop semantics and exposes its
//! state through a `watch` channel.
//!
//! ```text
//! start() ──► CancellationToken + tokio::spawn(actor.run(token))
//! stop()  ──► token.cancel() ──► await join ──► Stopped
//! drop    ──► token.cancel()   (task winds down on its own)
//! ```
//!
//! `stop()` returns only after the actor has released its process, so no
//! process, timer or launch outlives it.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::actor::SupervisorActor;
use super::state::{StateSnapshot, SupervisorStatus};
use crate::config::StreamDefinition;
use crate::events::Bus;
use crate::policies::RetryPolicy;
use crate::process::{ErrorClassifier, Launcher};

/// Dependencies shared by every supervisor of a manager.
#[derive(Clone)]
pub struct SupervisorContext {
    /// Retry and liveness tunables.
    pub policy: Arc<RetryPolicy>,
    /// Error-line matcher.
    pub classifier: Arc<ErrorClassifier>,
    /// Process spawner.
    pub launcher: Arc<dyn Launcher>,
    /// Event sink.
    pub bus: Bus,
}

struct Running {
    token: CancellationToken,
    join: JoinHandle<()>,
}

/// Keeps one capture process alive for one stream.
pub struct ProcessSupervisor {
    stream: StreamDefinition,
    ctx: SupervisorContext,
    state: Arc<watch::Sender<StateSnapshot>>,
    running: Option<Running>,
}

impl ProcessSupervisor {
    /// Creates a stopped supervisor.
    pub fn new(stream: StreamDefinition, ctx: SupervisorContext) -> Self {
        let (state, _) = watch::channel(StateSnapshot::default());
        Self {
            stream,
            ctx,
            state: Arc::new(state),
            running: None,
        }
    }

    /// The supervised stream.
    pub fn stream(&self) -> &StreamDefinition {
        &self.stream
    }

    /// True between `start()` and `stop()`.
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Begins supervision. No-op when already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if self.running.is_some() {
            return;
        }
        let token = CancellationToken::new();
        let actor = SupervisorActor::new(
            self.stream.clone(),
            self.ctx.clone(),
            Arc::clone(&self.state),
        );
        self.state.send_modify(|s| {
            s.status = SupervisorStatus::Launching;
            s.retry_count = 0;
        });
        let join = tokio::spawn(actor.run(token.clone()));
        self.running = Some(Running { token, join });
    }

    /// Stops supervision and waits until the process is released.
    ///
    /// Idempotent; a stopped supervisor can be started again.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        running.token.cancel();
        if let Err(err) = running.join.await {
            tracing::error!(stream = %self.stream.id, %err, "supervisor task failed");
        }
        self.state.send_modify(|s| s.status = SupervisorStatus::Stopped);
    }

    /// Current state.
    pub fn snapshot(&self) -> StateSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe_state(&self) -> watch::Receiver<StateSnapshot> {
        self.state.subscribe()
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.token.cancel();
        }
    }
}
