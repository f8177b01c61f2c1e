//! # Stream definitions.
//!
//! A [`StreamDefinition`] names one source to capture. The id doubles as the
//! output file prefix and the log field, so it is restricted to characters that
//! are safe in a file name.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigError;

/// One configured capture source.
///
/// ## Example
/// ```rust
/// use streamvisor::StreamDefinition;
///
/// let def: StreamDefinition = "cam1=rtsp://10.0.0.5:554/h265/2".parse().unwrap();
/// assert_eq!(def.id, "cam1");
/// assert_eq!(def.source_url, "rtsp://10.0.0.5:554/h265/2");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamDefinition {
    /// Unique id, used as output file prefix and log field.
    pub id: String,
    /// Source locator handed to the capture tool.
    #[serde(rename = "url")]
    pub source_url: String,
}

impl StreamDefinition {
    /// Creates a definition without validating it.
    pub fn new(id: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_url: source_url.into(),
        }
    }

    /// Checks the id and url.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason| ConfigError::InvalidStream {
            input: self.to_string(),
            reason,
        };

        if self.id.is_empty() {
            return Err(invalid("empty id"));
        }
        if !self
            .id
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(invalid("id may only contain letters, digits, '-', '_' and '.'"));
        }
        if self.source_url.trim().is_empty() {
            return Err(invalid("empty url"));
        }
        Ok(())
    }
}

impl fmt::Display for StreamDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.id, self.source_url)
    }
}

impl FromStr for StreamDefinition {
    type Err = ConfigError;

    /// Parses `id=url`. Only the first `=` separates, urls may contain more.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (id, url) = input
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidStream {
                input: input.to_string(),
                reason: "expected id=url",
            })?;
        let def = Self::new(id.trim(), url.trim());
        def.validate()?;
        Ok(def)
    }
}

/// Parses a `;`-separated list of `id=url` entries, skipping empty entries.
pub(crate) fn parse_list(input: &str) -> Result<Vec<StreamDefinition>, ConfigError> {
    input
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_may_contain_equals() {
        let def: StreamDefinition = "cam=rtsp://h/stream?a=1&b=2".parse().unwrap();
        assert_eq!(def.source_url, "rtsp://h/stream?a=1&b=2");
    }

    #[test]
    fn test_rejects_missing_separator() {
        let err = "rtsp://h/stream".parse::<StreamDefinition>().unwrap_err();
        assert_eq!(err.as_label(), "config_invalid_stream");
    }

    #[test]
    fn test_rejects_path_in_id() {
        assert!("../cam=rtsp://h".parse::<StreamDefinition>().is_err());
        assert!("cam 1=rtsp://h".parse::<StreamDefinition>().is_err());
        assert!("=rtsp://h".parse::<StreamDefinition>().is_err());
        assert!("cam=".parse::<StreamDefinition>().is_err());
    }

    #[test]
    fn test_parse_list_keeps_order() {
        let list = parse_list("b=rtsp://2; a=rtsp://1;").unwrap();
        let ids: Vec<_> = list.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
    }
}
