//! Error types used by the streamvisor runtime.
//!
//! This module defines three error enums:
//!
//! - [`ConfigError`]: the stream list or tunables could not be resolved. Fatal at startup.
//! - [`ProcessError`]: one capture process failed. Always recovered by the owning supervisor.
//! - [`RuntimeError`]: the host runtime itself could not operate (signal wiring).
//!
//! All of them provide `as_label` (stable snake_case) for logs/metrics.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced while resolving configuration.
///
/// None of these are retried: the binary reports them and exits non-zero
/// before any supervisor starts.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No stream definitions were found in any configuration layer.
    #[error("no streams configured")]
    NoStreams,

    /// Two stream definitions share the same id.
    #[error("duplicate stream id {id:?}")]
    DuplicateStream {
        /// The repeated id.
        id: String,
    },

    /// A stream definition is malformed (`id=url` expected).
    #[error("invalid stream definition {input:?}: {reason}")]
    InvalidStream {
        /// The raw text that failed to parse.
        input: String,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// The configuration file could not be read.
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        /// File that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for the expected schema.
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        /// File that was parsed.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: Box<toml::de::Error>,
    },

    /// An environment variable holds a value that does not parse.
    #[error("invalid value {value:?} for {key}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Raw value.
        value: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use streamvisor::ConfigError;
    ///
    /// assert_eq!(ConfigError::NoStreams.as_label(), "config_no_streams");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::NoStreams => "config_no_streams",
            ConfigError::DuplicateStream { .. } => "config_duplicate_stream",
            ConfigError::InvalidStream { .. } => "config_invalid_stream",
            ConfigError::Read { .. } => "config_read",
            ConfigError::Parse { .. } => "config_parse",
            ConfigError::InvalidValue { .. } => "config_invalid_value",
        }
    }
}

/// # Failures of a single capture process.
///
/// Every variant is routed into the supervisor's retry procedure; none of
/// them ever leaves the supervisor that observed it.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The process could not be created at all.
    #[error("spawn failed: {source}")]
    Spawn {
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The process terminated with a nonzero code or was killed by a signal.
    #[error("exited abnormally (code={code:?}, signal={signal:?})")]
    AbnormalExit {
        /// Exit code, if the process exited normally.
        code: Option<i32>,
        /// Terminating signal, if any (unix only).
        signal: Option<i32>,
    },

    /// The process produced no output for longer than the stall timeout.
    #[error("stalled: no output for {elapsed:?}")]
    Stalled {
        /// Time since the last output line.
        elapsed: Duration,
    },

    /// Reading the process output or waiting on it failed.
    #[error("process i/o failed: {source}")]
    Io {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ProcessError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use streamvisor::ProcessError;
    /// use std::time::Duration;
    ///
    /// let err = ProcessError::Stalled { elapsed: Duration::from_secs(90) };
    /// assert_eq!(err.as_label(), "process_stalled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ProcessError::Spawn { .. } => "process_spawn_failed",
            ProcessError::AbnormalExit { .. } => "process_abnormal_exit",
            ProcessError::Stalled { .. } => "process_stalled",
            ProcessError::Io { .. } => "process_io",
        }
    }
}

/// # Errors produced by the host runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// OS signal listeners could not be registered.
    #[error("failed to register shutdown signal handlers: {source}")]
    Signal {
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Signal { .. } => "runtime_signal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abnormal_exit_message_carries_code_and_signal() {
        let err = ProcessError::AbnormalExit {
            code: Some(1),
            signal: None,
        };
        assert_eq!(err.to_string(), "exited abnormally (code=Some(1), signal=None)");
        assert_eq!(err.as_label(), "process_abnormal_exit");
    }

    #[test]
    fn test_config_labels_are_distinct() {
        let labels = [
            ConfigError::NoStreams.as_label(),
            ConfigError::DuplicateStream { id: "a".into() }.as_label(),
            ConfigError::InvalidValue {
                key: "K".into(),
                value: "v".into(),
            }
            .as_label(),
        ];
        assert_eq!(labels, ["config_no_streams", "config_duplicate_stream", "config_invalid_value"]);
    }
}
