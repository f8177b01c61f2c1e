//! # SupervisorActor: the per-stream state machine.
//!
//! Owns one capture process at a time and decides when to relaunch it.
//!
//! ## Architecture
//! ```text
//! ProcessSupervisor::start() ──► tokio::spawn(SupervisorActor::run(token))
//!
//! loop {
//!   ├─► Launching: attempt += 1, publish ProcessLaunching
//!   ├─► launcher.launch(stream)
//!   │     ├─ Err ─────────────────────────────────────► failure (SpawnFailed)
//!   │     └─ Ok(process) ─► Active: publish ProcessLaunched
//!   │           select! (biased) {
//!   │             token cancelled  ─► Cancelled
//!   │             Output(line)     ─► last_activity = now, classify line
//!   │             Exited(code 0)   ─► Clean
//!   │             Exited(other)    ─► failure (AbnormalExit)
//!   │             stall tick       ─► silent > stall_timeout ? failure (Stalled)
//!   │           }
//!   │           process.kill()   (single release path, every route)
//!   ├─► Clean     ─► retry = 0, relaunch immediately
//!   ├─► Cancelled ─► exit loop
//!   └─► failure   ─► RetryTracker::on_failure()
//!                     ├─ Backoff  ─► SchedulingRetry, publish BackoffScheduled
//!                     └─ Cooldown ─► CooldownWait,    publish CooldownScheduled
//!                    sleep(delay) (cancellable), re-check token, relaunch
//! }
//! Stopped: publish SupervisorStopped
//! ```
//!
//! ## Rules
//! - Handlers run one at a time in arrival order; nothing here is re-entrant.
//! - Only the current process is ever polled, so an exit from a released
//!   process cannot be observed.
//! - An exit and a stall tick ready in the same round resolve to one branch
//!   (exit wins); the other is dropped with the released handle.
//! - Cancellation is checked when timers fire, not only when they are set.

use std::sync::Arc;

use tokio::select;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::StreamDefinition;
use crate::core::state::{StateSnapshot, SupervisorStatus};
use crate::core::supervisor::SupervisorContext;
use crate::error::ProcessError;
use crate::events::{Event, EventKind};
use crate::policies::{RetryDecision, RetryTracker};
use crate::process::{CaptureProcess, ExitReport, ProcessEvent};

/// How one supervised run ended.
enum Outcome {
    /// Exit code 0.
    Clean,
    /// Anything routed into the retry procedure.
    Failed(ProcessError),
    /// `stop()` was requested.
    Cancelled,
}

pub(crate) struct SupervisorActor {
    id: Arc<str>,
    stream: StreamDefinition,
    ctx: SupervisorContext,
    state: Arc<watch::Sender<StateSnapshot>>,
    retry: RetryTracker,
    attempt: u32,
}

impl SupervisorActor {
    pub(crate) fn new(
        stream: StreamDefinition,
        ctx: SupervisorContext,
        state: Arc<watch::Sender<StateSnapshot>>,
    ) -> Self {
        let attempt = state.borrow().attempt;
        Self {
            id: Arc::from(stream.id.as_str()),
            retry: RetryTracker::new(&ctx.policy),
            stream,
            ctx,
            state,
            attempt,
        }
    }

    /// Runs until `token` is cancelled.
    pub(crate) async fn run(mut self, token: CancellationToken) {
        loop {
            if token.is_cancelled() {
                break;
            }

            let failure = match self.launch_and_supervise(&token).await {
                Outcome::Cancelled => break,
                Outcome::Clean => {
                    self.retry.reset();
                    self.update(|s| s.retry_count = 0);
                    continue;
                }
                Outcome::Failed(err) => err,
            };

            if token.is_cancelled() {
                break;
            }
            let decision = self.retry.on_failure();
            self.schedule(decision, &failure);

            let sleep = time::sleep(decision.delay());
            tokio::pin!(sleep);
            select! {
                _ = &mut sleep => {}
                _ = token.cancelled() => break,
            }
        }

        self.update(|s| s.status = SupervisorStatus::Stopped);
        self.publish(self.event(EventKind::SupervisorStopped));
    }

    async fn launch_and_supervise(&mut self, token: &CancellationToken) -> Outcome {
        self.attempt += 1;
        let attempt = self.attempt;
        self.update(|s| {
            s.status = SupervisorStatus::Launching;
            s.attempt = attempt;
        });
        self.publish(
            self.event(EventKind::ProcessLaunching)
                .with_attempt(attempt)
                .with_retry(self.retry.count()),
        );

        let launched = select! {
            biased;
            _ = token.cancelled() => return Outcome::Cancelled,
            res = self.ctx.launcher.launch(&self.stream) => res,
        };

        match launched {
            Ok(process) => self.supervise(process, token).await,
            Err(err) => {
                self.publish(
                    self.event(EventKind::SpawnFailed)
                        .with_attempt(attempt)
                        .with_reason(err.to_string()),
                );
                Outcome::Failed(err)
            }
        }
    }

    async fn supervise(
        &mut self,
        mut process: Box<dyn CaptureProcess>,
        token: &CancellationToken,
    ) -> Outcome {
        let policy = Arc::clone(&self.ctx.policy);
        let mut last_activity = Instant::now();
        let mut stall_check = time::interval_at(
            last_activity + policy.error_check_interval,
            policy.error_check_interval,
        );
        stall_check.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.update(|s| s.status = SupervisorStatus::Active);
        let mut launched = self
            .event(EventKind::ProcessLaunched)
            .with_attempt(self.attempt)
            .with_pid(process.pid());
        if let Some(path) = process.first_segment() {
            launched = launched.with_segment(path);
        }
        self.publish(launched);

        let outcome = loop {
            select! {
                biased;
                _ = token.cancelled() => break Outcome::Cancelled,
                event = process.next_event() => match event {
                    Ok(ProcessEvent::Output(line)) => {
                        last_activity = Instant::now();
                        self.on_output(line);
                    }
                    Ok(ProcessEvent::Exited(report)) => break self.on_exit(report),
                    Err(err) => break Outcome::Failed(err),
                },
                _ = stall_check.tick() => {
                    let silent = last_activity.elapsed();
                    if silent > policy.stall_timeout {
                        self.publish(
                            self.event(EventKind::StallDetected)
                                .with_attempt(self.attempt)
                                .with_delay(silent),
                        );
                        break Outcome::Failed(ProcessError::Stalled { elapsed: silent });
                    }
                }
            }
        };

        process.kill().await;
        outcome
    }

    fn on_output(&mut self, line: String) {
        tracing::trace!(stream = %self.id, %line, "capture output");
        if !self.ctx.classifier.is_error(&line) {
            return;
        }
        self.publish(self.event(EventKind::OutputError).with_reason(line.as_str()));
        self.update(|s| s.last_error = Some(line));
    }

    fn on_exit(&mut self, report: ExitReport) -> Outcome {
        let mut ev = self
            .event(EventKind::ProcessExited)
            .with_attempt(self.attempt)
            .with_exit(report.code, report.signal);
        if let Some(last) = self.state.borrow().last_error.as_deref() {
            ev = ev.with_reason(last);
        }
        self.publish(ev);

        if report.is_clean() {
            Outcome::Clean
        } else {
            Outcome::Failed(ProcessError::AbnormalExit {
                code: report.code,
                signal: report.signal,
            })
        }
    }

    fn schedule(&mut self, decision: RetryDecision, failure: &ProcessError) {
        let reason = failure.to_string();
        match decision {
            RetryDecision::Backoff { retry, delay } => {
                self.update(|s| {
                    s.status = SupervisorStatus::SchedulingRetry;
                    s.retry_count = retry;
                });
                self.publish(
                    self.event(EventKind::BackoffScheduled)
                        .with_retry(retry)
                        .with_delay(delay)
                        .with_reason(reason),
                );
            }
            RetryDecision::Cooldown { delay } => {
                self.update(|s| {
                    s.status = SupervisorStatus::CooldownWait;
                    s.retry_count = 0;
                });
                self.publish(
                    self.event(EventKind::CooldownScheduled)
                        .with_retry(0)
                        .with_delay(delay)
                        .with_reason(reason),
                );
            }
        }
    }

    fn event(&self, kind: EventKind) -> Event {
        Event::new(kind).with_stream(Arc::clone(&self.id))
    }

    fn publish(&self, ev: Event) {
        self.ctx.bus.publish(ev);
    }

    fn update(&self, f: impl FnOnce(&mut StateSnapshot)) {
        self.state.send_modify(f);
    }
}
