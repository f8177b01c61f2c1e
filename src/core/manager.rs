//! # SupervisorManager: one supervisor per configured stream.
//!
//! ```text
//! ManagerBuilder::build()
//!   ├─► Bus
//!   ├─► Listener: Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!   └─► SupervisorManager { streams, ctx }
//!
//! start()    ─► ProcessSupervisor::new(stream).start()  for each stream
//! stop()     ─► ProcessSupervisor::stop()  for all, concurrently; mapping cleared
//! shutdown() ─► ShutdownRequested ─► stop() ─► AllStopped ─► drain subscribers
//! run()      ─► start() ─► wait_for_shutdown_signal() ─► shutdown()
//! ```
//!
//! Dropping the manager cancels every supervisor; `shutdown()` is the graceful
//! path that also waits for processes to be released.

use std::collections::BTreeMap;

use futures::future::join_all;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::builder::ManagerBuilder;
use super::shutdown::wait_for_shutdown_signal;
use super::state::StateSnapshot;
use super::supervisor::{ProcessSupervisor, SupervisorContext};
use crate::config::{Settings, StreamDefinition};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::SubscriberSet;

/// Forwards bus events to the subscriber set until cancelled.
pub(crate) struct Listener {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl Listener {
    pub(crate) fn spawn(bus: &Bus, subs: SubscriberSet, token: CancellationToken) -> Self {
        let mut rx = bus.subscribe();
        let stop = token.clone();
        let join = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    ev = rx.recv() => match ev {
                        Ok(ev) => subs.emit(&ev),
                        Err(RecvError::Lagged(n)) => {
                            tracing::warn!(skipped = n, "event listener lagged");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = stop.cancelled() => {
                        loop {
                            match rx.try_recv() {
                                Ok(ev) => subs.emit(&ev),
                                Err(TryRecvError::Lagged(_)) => continue,
                                Err(_) => break,
                            }
                        }
                        break;
                    }
                }
            }
            subs.shutdown().await;
        });
        Self { token, join }
    }

    async fn close(self) {
        self.token.cancel();
        if let Err(err) = self.join.await {
            tracing::error!(%err, "event listener failed");
        }
    }
}

/// Runs one [`ProcessSupervisor`] per configured stream.
pub struct SupervisorManager {
    streams: Vec<StreamDefinition>,
    ctx: SupervisorContext,
    supervisors: BTreeMap<String, ProcessSupervisor>,
    listener: Option<Listener>,
}

impl SupervisorManager {
    /// Starts building a manager from resolved settings.
    pub fn builder(settings: Settings) -> ManagerBuilder {
        ManagerBuilder::new(settings)
    }

    pub(crate) fn new_internal(
        streams: Vec<StreamDefinition>,
        ctx: SupervisorContext,
        listener: Listener,
    ) -> Self {
        Self {
            streams,
            ctx,
            supervisors: BTreeMap::new(),
            listener: Some(listener),
        }
    }

    /// The event bus every supervisor publishes to.
    pub fn bus(&self) -> &Bus {
        &self.ctx.bus
    }

    /// Starts a supervisor for every configured stream.
    ///
    /// Streams already supervised are left untouched.
    pub fn start(&mut self) {
        for stream in &self.streams {
            let sup = self
                .supervisors
                .entry(stream.id.clone())
                .or_insert_with(|| ProcessSupervisor::new(stream.clone(), self.ctx.clone()));
            if !sup.is_running() {
                tracing::info!(stream = %stream, "starting supervisor");
                sup.start();
            }
        }
    }

    /// Stops every supervisor and clears the mapping.
    ///
    /// Returns once every capture process has been released.
    pub async fn stop(&mut self) {
        join_all(self.supervisors.values_mut().map(|sup| sup.stop())).await;
        self.supervisors.clear();
    }

    /// State of every supervised stream, keyed by stream id.
    pub fn snapshot(&self) -> BTreeMap<String, StateSnapshot> {
        self.supervisors
            .iter()
            .map(|(id, sup)| (id.clone(), sup.snapshot()))
            .collect()
    }

    /// Gracefully stops everything and flushes subscribers.
    pub async fn shutdown(mut self) {
        self.ctx.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.stop().await;
        self.ctx.bus.publish(Event::new(EventKind::AllStopped));
        if let Some(listener) = self.listener.take() {
            listener.close().await;
        }
    }

    /// Starts every supervisor and runs until a termination signal arrives.
    pub async fn run(mut self) -> Result<(), RuntimeError> {
        self.start();
        let signal = wait_for_shutdown_signal().await;
        self.shutdown().await;
        signal.map(|_| ())
    }
}

impl Drop for SupervisorManager {
    fn drop(&mut self) {
        if let Some(listener) = &self.listener {
            listener.token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::broadcast;
    use tokio::time::sleep;

    use super::*;
    use crate::core::SupervisorStatus;
    use crate::policies::RetryPolicy;
    use crate::process::testing::{Script, ScriptedLauncher};
    use crate::subscribers::Subscribe;

    fn settings() -> Settings {
        Settings {
            streams: vec![
                StreamDefinition::new("a", "rtsp://cam-a/1"),
                StreamDefinition::new("b", "rtsp://cam-b/1"),
            ],
            retry: RetryPolicy {
                base_interval: Duration::from_millis(1000),
                ..RetryPolicy::default()
            },
            ..Settings::default()
        }
    }

    async fn next_of(
        rx: &mut broadcast::Receiver<Event>,
        kind: EventKind,
        stream: Option<&str>,
    ) -> Event {
        loop {
            let ev = rx.recv().await.expect("bus open");
            if ev.kind == kind && (stream.is_none() || ev.stream.as_deref() == stream) {
                return ev;
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.seen.lock().unwrap().push(ev.kind);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_releases_every_stream() {
        let launcher = ScriptedLauncher::new().fallback("a", Script::exit(1));
        let mut manager = SupervisorManager::builder(settings())
            .with_launcher(Arc::new(launcher.clone()))
            .build();
        let mut rx_a = manager.bus().subscribe();
        let mut rx_b = manager.bus().subscribe();

        manager.start();
        next_of(&mut rx_a, EventKind::BackoffScheduled, Some("a")).await;
        next_of(&mut rx_b, EventKind::ProcessLaunched, Some("b")).await;
        let snap = manager.snapshot();
        assert_eq!(snap.keys().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(snap["a"].status, SupervisorStatus::SchedulingRetry);
        assert_eq!(snap["b"].status, SupervisorStatus::Active);

        manager.stop().await;
        assert_eq!(launcher.live(), 0);
        assert!(manager.snapshot().is_empty());

        let before = (launcher.launches("a").len(), launcher.launches("b").len());
        sleep(Duration::from_secs(600)).await;
        assert_eq!(
            (launcher.launches("a").len(), launcher.launches("b").len()),
            before
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_does_not_duplicate() {
        let launcher = ScriptedLauncher::new();
        let mut manager = SupervisorManager::builder(settings())
            .with_launcher(Arc::new(launcher.clone()))
            .build();
        let mut rx = manager.bus().subscribe();

        manager.start();
        manager.start();
        next_of(&mut rx, EventKind::ProcessLaunched, Some("a")).await;
        next_of(&mut rx, EventKind::ProcessLaunched, Some("b")).await;
        sleep(Duration::from_secs(1)).await;
        assert_eq!(launcher.live(), 2);
        assert_eq!(launcher.launches("a").len(), 1);

        manager.stop().await;
        manager.start();
        next_of(&mut rx, EventKind::ProcessLaunched, Some("a")).await;
        assert_eq!(launcher.launches("a").len(), 2);
        manager.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_flushes_subscribers() {
        let launcher = ScriptedLauncher::new();
        let recorder = Arc::new(Recorder::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![recorder.clone()];
        let mut manager = SupervisorManager::builder(settings())
            .with_launcher(Arc::new(launcher.clone()))
            .with_subscribers(subs)
            .build();
        let mut rx = manager.bus().subscribe();

        manager.start();
        next_of(&mut rx, EventKind::ProcessLaunched, Some("a")).await;
        next_of(&mut rx, EventKind::ProcessLaunched, Some("b")).await;
        manager.shutdown().await;
        assert_eq!(launcher.live(), 0);

        let seen = recorder.seen.lock().unwrap().clone();
        let pos = |kind| seen.iter().position(|k| *k == kind);
        let requested = pos(EventKind::ShutdownRequested).expect("shutdown requested");
        let stopped = pos(EventKind::AllStopped).expect("all stopped");
        assert!(requested < stopped);
        assert_eq!(
            seen.iter()
                .filter(|k| **k == EventKind::SupervisorStopped)
                .count(),
            2
        );
        assert_eq!(seen.last(), Some(&EventKind::AllStopped));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_supervisors() {
        let launcher = ScriptedLauncher::new();
        let mut manager = SupervisorManager::builder(settings())
            .with_launcher(Arc::new(launcher.clone()))
            .build();
        let mut rx = manager.bus().subscribe();
        manager.start();
        next_of(&mut rx, EventKind::ProcessLaunched, Some("b")).await;

        drop(manager);
        next_of(&mut rx, EventKind::SupervisorStopped, None).await;
        next_of(&mut rx, EventKind::SupervisorStopped, None).await;
        assert_eq!(launcher.live(), 0);
    }
}
