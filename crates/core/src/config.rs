//! Configuration for the extraction pipeline.
//!
//! [`ReadabilityConfig`] tunes the generic readability cleaner and
//! [`ExcludeList`] routes URLs to the passthrough cleaner.
//!
//! # Example
//!
//! ```rust
//! use tidymark_core::{ExcludeList, ReadabilityConfig};
//!
//! let config = ReadabilityConfig::builder()
//!     .min_score(25.0)
//!     .char_threshold(500)
//!     .preserve_images(true)
//!     .build();
//!
//! let excludes = ExcludeList::from_patterns(["^https://intranet\\."]).unwrap();
//! assert!(excludes.is_excluded("https://intranet.example.com/page"));
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::{ExtractError, Result};

/// Configuration for the readability pass.
///
/// The scoring thresholds are heuristics, so every one of them is tunable
/// here rather than fixed in the algorithm.
#[derive(Debug, Clone)]
pub struct ReadabilityConfig {
    /// Minimum score the best candidate must reach (default: 20.0).
    pub min_score: f64,

    /// Minimum character count for valid content (default: 500).
    ///
    /// Blocks shorter than a tenth of this are not scored on their own.
    pub char_threshold: usize,

    /// Number of top candidates to track (default: 5).
    pub nb_top_candidates: usize,

    /// Maximum elements to score (0 = unlimited, default: 0).
    pub max_elems_to_parse: usize,

    /// Whether to remove unlikely candidates before scoring (default: true).
    pub remove_unlikely: bool,

    /// Whether to keep every class attribute in output HTML (default: false).
    ///
    /// `language-*` classes survive either way.
    pub keep_classes: bool,

    /// Whether to preserve images in output HTML (default: true).
    pub preserve_images: bool,
}

impl Default for ReadabilityConfig {
    fn default() -> Self {
        Self {
            min_score: 20.0,
            char_threshold: 500,
            nb_top_candidates: 5,
            max_elems_to_parse: 0,
            remove_unlikely: true,
            keep_classes: false,
            preserve_images: true,
        }
    }
}

impl ReadabilityConfig {
    /// Creates a new builder for ReadabilityConfig.
    pub fn builder() -> ReadabilityConfigBuilder {
        ReadabilityConfigBuilder::new()
    }
}

/// Builder for ReadabilityConfig.
pub struct ReadabilityConfigBuilder {
    config: ReadabilityConfig,
}

impl ReadabilityConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: ReadabilityConfig::default() }
    }

    /// Sets the minimum score threshold.
    pub fn min_score(mut self, value: f64) -> Self {
        self.config.min_score = value;
        self
    }

    /// Sets the character threshold.
    pub fn char_threshold(mut self, value: usize) -> Self {
        self.config.char_threshold = value;
        self
    }

    /// Sets the number of top candidates.
    pub fn nb_top_candidates(mut self, value: usize) -> Self {
        self.config.nb_top_candidates = value;
        self
    }

    /// Sets the maximum elements to score.
    pub fn max_elems_to_parse(mut self, value: usize) -> Self {
        self.config.max_elems_to_parse = value;
        self
    }

    /// Sets whether to remove unlikely candidates.
    pub fn remove_unlikely(mut self, value: bool) -> Self {
        self.config.remove_unlikely = value;
        self
    }

    /// Sets whether to preserve class attributes in output HTML.
    pub fn keep_classes(mut self, value: bool) -> Self {
        self.config.keep_classes = value;
        self
    }

    /// Sets whether to preserve images in output HTML.
    pub fn preserve_images(mut self, value: bool) -> Self {
        self.config.preserve_images = value;
        self
    }

    /// Builds the config.
    pub fn build(self) -> ReadabilityConfig {
        self.config
    }
}

impl Default for ReadabilityConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered URL exclusion patterns.
///
/// A URL matching any pattern is handed to the passthrough cleaner and
/// returned uncleaned.
#[derive(Debug, Clone, Default)]
pub struct ExcludeList {
    patterns: Vec<Regex>,
}

impl ExcludeList {
    /// Creates an empty list that excludes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles `patterns` in order.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::ConfigError`] naming the first invalid pattern.
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref();
                Regex::new(p).map_err(|e| ExtractError::ConfigError(format!("invalid exclude pattern '{}': {}", p, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    /// Parses a pattern file: one regex per line, blank lines and `#` comments ignored.
    pub fn parse(contents: &str) -> Result<Self> {
        Self::from_patterns(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        )
    }

    /// Loads a pattern file from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::ConfigError`] if the file cannot be read or
    /// holds an invalid pattern.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| ExtractError::ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        Self::parse(&contents)
    }

    /// Loads `<config_dir>/tidymark/exclude.txt` if it exists, else an empty list.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.is_file() => {
                tracing::debug!(path = %path.display(), "loading exclude list");
                Self::load(path)
            }
            _ => Ok(Self::new()),
        }
    }

    /// Gets the default exclude file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tidymark").join("exclude.txt"))
    }

    /// Appends more patterns.
    pub fn extend(&mut self, other: ExcludeList) {
        self.patterns.extend(other.patterns);
    }

    /// Returns `true` if any pattern matches `url`.
    pub fn is_excluded(&self, url: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(url))
    }

    /// Gets the pattern sources in order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Regex::as_str)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
