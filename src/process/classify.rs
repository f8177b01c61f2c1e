//! Error-line classification for capture tool diagnostics.
//!
//! Best-effort: a line is an error if it contains any configured keyword,
//! compared case-insensitively. There is no grammar behind it.

/// Case-insensitive keyword matcher.
#[derive(Clone, Debug)]
pub struct ErrorClassifier {
    keywords: Vec<String>,
}

impl ErrorClassifier {
    /// Builds a classifier; empty keywords are ignored.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    /// True if `line` contains any keyword.
    pub fn is_error(&self, line: &str) -> bool {
        let line = line.to_lowercase();
        self.keywords.iter().any(|k| line.contains(k.as_str()))
    }
}
