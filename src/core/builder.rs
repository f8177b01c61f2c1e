use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::manager::{Listener, SupervisorManager};
use super::supervisor::SupervisorContext;
use crate::config::Settings;
use crate::events::Bus;
use crate::process::{ErrorClassifier, FfmpegLauncher, Invocation, Launcher};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Default capacity of the event bus.
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Builder for a [`SupervisorManager`].
pub struct ManagerBuilder {
    settings: Settings,
    subscribers: Vec<Arc<dyn Subscribe>>,
    launcher: Option<Arc<dyn Launcher>>,
    bus_capacity: usize,
}

impl ManagerBuilder {
    /// Creates a new builder from resolved settings.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            subscribers: Vec::new(),
            launcher: None,
            bus_capacity: DEFAULT_BUS_CAPACITY,
        }
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive runtime events through dedicated workers with
    /// bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Replaces the process launcher (defaults to [`FfmpegLauncher`]).
    pub fn with_launcher(mut self, launcher: Arc<dyn Launcher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Sets the event bus capacity (clamped to at least 1).
    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = capacity;
        self
    }

    /// Builds the manager and starts its subscriber listener.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> SupervisorManager {
        let bus = Bus::new(self.bus_capacity);
        let launcher = self.launcher.unwrap_or_else(|| {
            let invocation =
                Invocation::new(&self.settings.capture, self.settings.retry.segment_duration);
            Arc::new(FfmpegLauncher::new(invocation))
        });
        let ctx = SupervisorContext {
            policy: Arc::new(self.settings.retry.clone()),
            classifier: Arc::new(ErrorClassifier::new(&self.settings.capture.error_keywords)),
            launcher,
            bus: bus.clone(),
        };

        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        let listener = Listener::spawn(&bus, subs, CancellationToken::new());

        SupervisorManager::new_internal(self.settings.streams, ctx, listener)
    }
}
