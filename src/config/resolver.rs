//! # Configuration resolution.
//!
//! [`ConfigResolver`] is the only thing the runtime needs from configuration:
//! an ordered, non-empty list of streams plus the tunables. [`LayeredResolver`]
//! is the implementation used by the binary. Its precedence is fixed:
//!
//! ```text
//! CLI overrides  ─┐  (highest)
//! environment    ─┤
//! TOML file      ─┤
//! defaults       ─┘  (lowest)
//! ```
//!
//! Scalars are overridden field by field; the stream list is taken whole from
//! the highest layer that defines any stream.
//!
//! ## Environment
//! | Variable                               | Meaning                          |
//! |----------------------------------------|----------------------------------|
//! | `STREAMVISOR_CONFIG`                   | TOML file (when no CLI path)     |
//! | `STREAMVISOR_STREAMS`                  | `id=url;id=url`                  |
//! | `STREAMVISOR_OUTPUT_DIR`               | segment directory                |
//! | `STREAMVISOR_FFMPEG`                   | capture tool executable          |
//! | `STREAMVISOR_SEGMENT_EXTENSION`        | container extension              |
//! | `STREAMVISOR_ERROR_KEYWORDS`           | comma-separated keywords         |
//! | `STREAMVISOR_MAX_RETRIES`              | retry budget                     |
//! | `STREAMVISOR_BASE_RETRY_INTERVAL_MS`   | first backoff delay              |
//! | `STREAMVISOR_MAX_BACKOFF_MS`           | backoff cap                      |
//! | `STREAMVISOR_COOLDOWN_MS`              | pause after budget exhaustion    |
//! | `STREAMVISOR_SEGMENT_DURATION_SECS`    | segment length                   |
//! | `STREAMVISOR_ERROR_CHECK_INTERVAL_MS`  | stall check period               |
//! | `STREAMVISOR_STALL_TIMEOUT_MS`         | silence threshold                |

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::settings::{PartialSettings, Settings};
use crate::config::stream::{StreamDefinition, parse_list};
use crate::error::ConfigError;

const ENV_PREFIX: &str = "STREAMVISOR_";

/// Produces the settings the runtime starts from.
pub trait ConfigResolver {
    /// Resolves and validates settings.
    ///
    /// Fails with [`ConfigError::NoStreams`] when no stream is configured and
    /// with [`ConfigError::DuplicateStream`] when ids collide.
    fn resolve(&self) -> Result<Settings, ConfigError>;
}

/// Command-line overrides (highest precedence).
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    /// `--output-dir`.
    pub output_dir: Option<PathBuf>,
    /// `--ffmpeg`.
    pub ffmpeg: Option<PathBuf>,
    /// `--stream`, repeatable; empty leaves lower layers in charge.
    pub streams: Vec<StreamDefinition>,
}

/// File + environment + CLI resolver with fixed precedence.
#[derive(Clone, Debug, Default)]
pub struct LayeredResolver {
    file: Option<PathBuf>,
    env: HashMap<String, String>,
    overrides: Overrides,
}

impl LayeredResolver {
    /// Resolver reading the current process environment.
    pub fn from_process_env() -> Self {
        Self::default().with_env(std::env::vars())
    }

    /// Replaces the environment layer (used by tests).
    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| k.starts_with(ENV_PREFIX))
            .collect();
        self
    }

    /// Explicit config file; takes priority over `STREAMVISOR_CONFIG`.
    pub fn with_file(mut self, path: Option<PathBuf>) -> Self {
        self.file = path;
        self
    }

    /// Sets the CLI layer.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    fn env(&self, key: &str) -> Option<&str> {
        self.env
            .get(&format!("{ENV_PREFIX}{key}"))
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    fn env_parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.env(key)
            .map(|raw| {
                raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: format!("{ENV_PREFIX}{key}"),
                    value: raw.to_string(),
                })
            })
            .transpose()
    }

    fn file_layer(&self) -> Result<Option<PartialSettings>, ConfigError> {
        let path = match (&self.file, self.env("CONFIG")) {
            (Some(path), _) => path.clone(),
            (None, Some(path)) => PathBuf::from(path),
            (None, None) => return Ok(None),
        };

        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let layer = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path,
            source: Box::new(source),
        })?;
        Ok(Some(layer))
    }

    fn env_layer(&self) -> Result<PartialSettings, ConfigError> {
        let mut layer = PartialSettings {
            output_dir: self.env("OUTPUT_DIR").map(PathBuf::from),
            ffmpeg: self.env("FFMPEG").map(PathBuf::from),
            segment_extension: self.env("SEGMENT_EXTENSION").map(str::to_string),
            error_keywords: self.env("ERROR_KEYWORDS").map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            }),
            streams: self.env("STREAMS").map(parse_list).transpose()?.unwrap_or_default(),
            ..PartialSettings::default()
        };

        let retry = &mut layer.retry;
        retry.max_retries = self.env_parsed("MAX_RETRIES")?;
        retry.base_interval_ms = self.env_parsed("BASE_RETRY_INTERVAL_MS")?;
        retry.max_backoff_ms = self.env_parsed("MAX_BACKOFF_MS")?;
        retry.cooldown_ms = self.env_parsed("COOLDOWN_MS")?;
        retry.segment_duration_secs = self.env_parsed("SEGMENT_DURATION_SECS")?;
        retry.error_check_interval_ms = self.env_parsed("ERROR_CHECK_INTERVAL_MS")?;
        retry.stall_timeout_ms = self.env_parsed("STALL_TIMEOUT_MS")?;
        Ok(layer)
    }

    fn cli_layer(&self) -> PartialSettings {
        PartialSettings {
            output_dir: self.overrides.output_dir.clone(),
            ffmpeg: self.overrides.ffmpeg.clone(),
            streams: self.overrides.streams.clone(),
            ..PartialSettings::default()
        }
    }
}

impl ConfigResolver for LayeredResolver {
    fn resolve(&self) -> Result<Settings, ConfigError> {
        let mut settings = Settings::default();

        if let Some(file) = self.file_layer()? {
            file.apply_to(&mut settings);
        }
        self.env_layer()?.apply_to(&mut settings);
        self.cli_layer().apply_to(&mut settings);

        validate(&settings)?;
        Ok(settings)
    }
}

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if settings.streams.is_empty() {
        return Err(ConfigError::NoStreams);
    }

    let mut seen = HashSet::new();
    for def in &settings.streams {
        def.validate()?;
        if !seen.insert(def.id.as_str()) {
            return Err(ConfigError::DuplicateStream { id: def.id.clone() });
        }
    }

    if settings.retry.error_check_interval.is_zero() {
        return Err(ConfigError::InvalidValue {
            key: "error_check_interval_ms".to_string(),
            value: "0".to_string(),
        });
    }
    Ok(())
}
