//! Scripted processes for exercising supervisors under a paused tokio clock.
//!
//! Each launch of a stream pops the next [`Script`] for that stream; once the
//! queue is empty the stream's fallback script is used. The launcher records
//! launch instants and tracks how many processes are alive, so tests can
//! assert that nothing leaks after `stop()`.

use std::collections::{HashMap, VecDeque};
use std::future::pending;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, sleep_until};

use crate::config::StreamDefinition;
use crate::error::ProcessError;
use crate::process::{CaptureProcess, ExitReport, Launcher, ProcessEvent};

/// Behaviour of one scripted launch.
#[derive(Clone, Debug)]
pub(crate) enum Script {
    /// Exit with `code` after `after`.
    Exit { code: i32, after: Duration },
    /// Die by signal `signal` after `after`.
    Signal { signal: i32, after: Duration },
    /// Print the lines immediately, then stay silent forever.
    Lines(Vec<String>),
    /// Print a line every `every` for `for_`, then stay silent forever.
    Chatter { every: Duration, for_: Duration },
    /// Fail to spawn.
    SpawnError,
    /// Never print, never exit.
    Hang,
}

impl Script {
    pub(crate) fn exit(code: i32) -> Self {
        Script::Exit {
            code,
            after: Duration::ZERO,
        }
    }
}

#[derive(Default)]
struct Inner {
    scripts: HashMap<String, VecDeque<Script>>,
    fallback: HashMap<String, Script>,
    launches: Vec<(String, Instant)>,
}

/// Launcher handing out [`Script`]-driven processes.
#[derive(Clone, Default)]
pub(crate) struct ScriptedLauncher {
    inner: Arc<Mutex<Inner>>,
    live: Arc<AtomicUsize>,
}

impl ScriptedLauncher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queues scripts for successive launches of `stream`.
    pub(crate) fn script(self, stream: &str, scripts: impl IntoIterator<Item = Script>) -> Self {
        self.inner
            .lock()
            .unwrap()
            .scripts
            .entry(stream.to_string())
            .or_default()
            .extend(scripts);
        self
    }

    /// Script used once the queue of `stream` is exhausted (default: [`Script::Hang`]).
    pub(crate) fn fallback(self, stream: &str, script: Script) -> Self {
        self.inner
            .lock()
            .unwrap()
            .fallback
            .insert(stream.to_string(), script);
        self
    }

    /// Number of processes currently alive.
    pub(crate) fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Launch instants of `stream`, in order.
    pub(crate) fn launches(&self, stream: &str) -> Vec<Instant> {
        self.inner
            .lock()
            .unwrap()
            .launches
            .iter()
            .filter(|(id, _)| id == stream)
            .map(|(_, at)| *at)
            .collect()
    }

    /// Gaps between successive launches of `stream`.
    pub(crate) fn launch_gaps(&self, stream: &str) -> Vec<Duration> {
        self.launches(stream)
            .windows(2)
            .map(|w| w[1] - w[0])
            .collect()
    }
}

#[async_trait]
impl Launcher for ScriptedLauncher {
    async fn launch(
        &self,
        stream: &StreamDefinition,
    ) -> Result<Box<dyn CaptureProcess>, ProcessError> {
        let now = Instant::now();
        let script = {
            let mut inner = self.inner.lock().unwrap();
            inner.launches.push((stream.id.clone(), now));
            let next = inner
                .scripts
                .get_mut(&stream.id)
                .and_then(VecDeque::pop_front);
            next.or_else(|| inner.fallback.get(&stream.id).cloned())
                .unwrap_or(Script::Hang)
        };

        let state = match script {
            Script::SpawnError => {
                return Err(ProcessError::Spawn {
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "scripted"),
                });
            }
            Script::Exit { code, after } => State::ExitAt(now + after, ExitReport::code(code)),
            Script::Signal { signal, after } => {
                State::ExitAt(now + after, ExitReport::signal(signal))
            }
            Script::Lines(lines) => State::Lines(lines.into()),
            Script::Chatter { every, for_ } => State::Chatter {
                next: now + every,
                until: now + for_,
                every,
            },
            Script::Hang => State::Hang,
        };

        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedProcess {
            state,
            live: Arc::clone(&self.live),
            alive: true,
        }))
    }
}

enum State {
    ExitAt(Instant, ExitReport),
    Lines(VecDeque<String>),
    Chatter {
        next: Instant,
        until: Instant,
        every: Duration,
    },
    Hang,
}

struct ScriptedProcess {
    state: State,
    live: Arc<AtomicUsize>,
    alive: bool,
}

impl ScriptedProcess {
    fn release(&mut self) {
        if self.alive {
            self.alive = false;
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl CaptureProcess for ScriptedProcess {
    fn pid(&self) -> Option<u32> {
        None
    }

    async fn next_event(&mut self) -> Result<ProcessEvent, ProcessError> {
        match &mut self.state {
            State::ExitAt(at, report) => {
                let report = *report;
                sleep_until(*at).await;
                self.release();
                Ok(ProcessEvent::Exited(report))
            }
            State::Lines(lines) => match lines.pop_front() {
                Some(line) => Ok(ProcessEvent::Output(line)),
                None => pending().await,
            },
            State::Chatter { next, until, every } => {
                if *next > *until {
                    return pending().await;
                }
                sleep_until(*next).await;
                *next += *every;
                Ok(ProcessEvent::Output("frame=  25 fps= 25 size=N/A".to_string()))
            }
            State::Hang => pending().await,
        }
    }

    async fn kill(&mut self) {
        self.release();
    }
}

impl Drop for ScriptedProcess {
    fn drop(&mut self) {
        self.release();
    }
}
