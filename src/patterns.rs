//! Glob pattern matching for ignore rules and exclude filters.
//!
//! Thin wrapper over the `glob` crate: paths are normalized to `/`
//! separators before matching, a trailing `/` marks a directory pattern
//! and is rewritten to cover everything beneath it, and matching is
//! case-insensitive. `*` may cross path separators (basic glob
//! translation, not full gitignore semantics).

use std::path::Path;

use glob::{MatchOptions, Pattern};
use thiserror::Error;

/// Errors that can occur while compiling a pattern.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid glob pattern \"{pattern}\": {source}")]
    Invalid {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

/// A compiled glob pattern evaluated against path strings.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    pattern: Pattern,
}

impl PatternMatcher {
    /// Compile a glob pattern.
    ///
    /// A pattern ending in `/` is treated as a directory pattern and
    /// extended with `**` so it matches the directory's contents.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let mut text = normalize(pattern.trim());
        if text.ends_with('/') && text.len() > 1 {
            text.push_str("**");
        }
        let compiled = Pattern::new(&text).map_err(|source| PatternError::Invalid {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { pattern: compiled })
    }

    /// Evaluate the pattern against a path string.
    pub fn matches(&self, candidate: &str) -> bool {
        self.pattern
            .matches_with(&normalize(candidate), match_options())
    }

    /// Evaluate the pattern against a path.
    pub fn matches_path(&self, path: &Path) -> bool {
        self.matches(&path.to_string_lossy())
    }

    /// The processed pattern text.
    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

/// Normalize a path string to forward slashes.
pub(crate) fn normalize(path: &str) -> String {
    path.replace('\\', "/")
}

fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    }
}
