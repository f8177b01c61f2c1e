//! # Resolved settings and the partial layer they are merged from.
//!
//! [`Settings`] is what the runtime consumes. [`PartialSettings`] is one
//! configuration source (file, environment, CLI) where every field is optional;
//! layers are applied on top of the defaults in precedence order.
//!
//! ## File schema (TOML)
//! ```toml
//! output_dir = "/var/lib/streamvisor"
//! ffmpeg = "/usr/bin/ffmpeg"
//! segment_extension = "mp4"
//! error_keywords = ["error", "failed"]
//!
//! [retry]
//! max_retries = 5
//! base_interval_ms = 5000
//! max_backoff_ms = 30000
//! cooldown_ms = 60000
//! jitter = "none"            # none | full | equal
//! segment_duration_secs = 600
//! error_check_interval_ms = 30000
//! stall_timeout_ms = 60000
//!
//! [[streams]]
//! id = "cam1"
//! url = "rtsp://10.0.0.5:554/h265/2"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::config::StreamDefinition;
use crate::policies::{JitterPolicy, RetryPolicy};

/// Default keywords marking a diagnostic line as an error.
pub const DEFAULT_ERROR_KEYWORDS: [&str; 3] = ["error", "failed", "无法"];

/// How capture processes are invoked and where they write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureSettings {
    /// Directory segments are written to (created if absent).
    pub output_dir: PathBuf,
    /// Capture tool executable.
    pub program: PathBuf,
    /// Segment file extension (container format).
    pub segment_extension: String,
    /// Case-insensitive substrings that mark an output line as an error.
    pub error_keywords: Vec<String>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            program: PathBuf::from("ffmpeg"),
            segment_extension: "mp4".to_string(),
            error_keywords: DEFAULT_ERROR_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CaptureSettings {
    /// Creates the output directory (and parents) if it does not exist.
    pub fn ensure_output_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.output_dir)
    }
}

/// Fully resolved runtime settings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Settings {
    /// Streams in configuration order.
    pub streams: Vec<StreamDefinition>,
    /// Shared supervision tunables.
    pub retry: RetryPolicy,
    /// Capture tool invocation.
    pub capture: CaptureSettings,
}

/// Retry tunables of one layer; durations in the unit their key names.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySection {
    /// Failures allowed before cooldown.
    pub max_retries: Option<u32>,
    /// First backoff delay.
    pub base_interval_ms: Option<u64>,
    /// Backoff cap.
    pub max_backoff_ms: Option<u64>,
    /// Pause after the retry budget is exhausted.
    pub cooldown_ms: Option<u64>,
    /// Backoff randomization.
    pub jitter: Option<JitterPolicy>,
    /// Segment length.
    pub segment_duration_secs: Option<u64>,
    /// Stall check period.
    pub error_check_interval_ms: Option<u64>,
    /// Silence threshold.
    pub stall_timeout_ms: Option<u64>,
}

/// One configuration layer.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialSettings {
    /// Directory segments are written to.
    pub output_dir: Option<PathBuf>,
    /// Capture tool executable.
    pub ffmpeg: Option<PathBuf>,
    /// Segment container extension.
    pub segment_extension: Option<String>,
    /// Keywords marking an output line as an error.
    pub error_keywords: Option<Vec<String>>,
    /// Retry and liveness tunables.
    pub retry: RetrySection,
    /// Empty means "this layer does not define streams".
    pub streams: Vec<StreamDefinition>,
}

impl PartialSettings {
    /// Overwrites every field of `settings` this layer defines.
    ///
    /// Streams are replaced as a whole, never merged across layers.
    pub fn apply_to(self, settings: &mut Settings) {
        let capture = &mut settings.capture;
        if let Some(v) = self.output_dir {
            capture.output_dir = v;
        }
        if let Some(v) = self.ffmpeg {
            capture.program = v;
        }
        if let Some(v) = self.segment_extension {
            capture.segment_extension = v;
        }
        if let Some(v) = self.error_keywords {
            capture.error_keywords = v;
        }
        if !self.streams.is_empty() {
            settings.streams = self.streams;
        }

        let r = self.retry;
        let retry = &mut settings.retry;
        if let Some(v) = r.max_retries {
            retry.max_retries = v;
        }
        if let Some(v) = r.base_interval_ms {
            retry.base_interval = Duration::from_millis(v);
        }
        if let Some(v) = r.max_backoff_ms {
            retry.max_backoff = Duration::from_millis(v);
        }
        if let Some(v) = r.cooldown_ms {
            retry.cooldown = Duration::from_millis(v);
        }
        if let Some(v) = r.jitter {
            retry.jitter = v;
        }
        if let Some(v) = r.segment_duration_secs {
            retry.segment_duration = Duration::from_secs(v);
        }
        if let Some(v) = r.error_check_interval_ms {
            retry.error_check_interval = Duration::from_millis(v);
        }
        if let Some(v) = r.stall_timeout_ms {
            retry.stall_timeout = Duration::from_millis(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_tunables() {
        let s = Settings::default();
        assert_eq!(s.retry.max_retries, 5);
        assert_eq!(s.retry.base_interval, Duration::from_millis(5000));
        assert_eq!(s.retry.segment_duration, Duration::from_secs(600));
        assert_eq!(s.retry.error_check_interval, Duration::from_millis(30_000));
        assert_eq!(s.retry.stall_timeout, Duration::from_millis(60_000));
        assert_eq!(s.capture.output_dir, PathBuf::from("./output"));
        assert!(s.streams.is_empty());
    }

    #[test]
    fn test_layer_overrides_only_what_it_sets() {
        let mut s = Settings::default();
        let layer: PartialSettings = toml::from_str(
            r#"
            segment_extension = "mkv"
            [retry]
            max_retries = 2
            jitter = "equal"
            "#,
        )
        .unwrap();
        layer.apply_to(&mut s);

        assert_eq!(s.capture.segment_extension, "mkv");
        assert_eq!(s.capture.program, PathBuf::from("ffmpeg"));
        assert_eq!(s.retry.max_retries, 2);
        assert_eq!(s.retry.jitter, JitterPolicy::Equal);
        assert_eq!(s.retry.base_interval, Duration::from_millis(5000));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let res: Result<PartialSettings, _> = toml::from_str("retires = 3");
        assert!(res.is_err());
    }
}
