//! Error types for tidymark operations.
//!
//! This module defines [`ExtractError`], the single error taxonomy surfaced by
//! every stage of the pipeline: fetching, cleaning and Markdown conversion.
//! Character decoding never fails (see [`crate::encoding`]), so there is no
//! decode variant.
//!
//! # Example
//!
//! ```rust
//! use tidymark_core::{ExtractError, Result};
//!
//! fn require_container(found: bool) -> Result<()> {
//!     if !found {
//!         return Err(ExtractError::content_not_found("wechat", "missing #js_content"));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Main error type for extraction operations.
///
/// Errors are never retried inside the library and no partial output is
/// produced: an extraction either yields the full document or one of these.
///
/// # Example
///
/// ```rust
/// use tidymark_core::ExtractError;
///
/// let err = ExtractError::HttpStatus { status: 404, url: "https://example.com".into() };
/// assert!(err.is_fetch_error());
/// ```
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Transport-level HTTP failures from reqwest.
    ///
    /// Covers DNS failures, refused connections, TLS errors and bodies that
    /// could not be read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("HTTP request to {url} failed with status {status}")]
    HttpStatus { status: u16, url: String },

    /// Request timeout.
    ///
    /// Returned when an HTTP request exceeds the configured timeout duration.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// A secondary API answered with a payload that could not be decoded.
    #[error("Unexpected response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    /// Invalid or missing URL.
    ///
    /// Raised before any request is made.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A strategy could not locate the element or pattern it requires.
    #[error("Content not found by {strategy} cleaner: {detail}")]
    ContentNotFound { strategy: String, detail: String },

    /// The best readability candidate scored below the configured threshold.
    #[error("Content is not readable (score {score} below threshold {threshold})")]
    NotReadable { score: f64, threshold: f64 },

    /// The document contained no candidate blocks at all.
    #[error("No content could be extracted from the document")]
    NoContent,

    /// HTML to Markdown conversion failed.
    #[error("Markdown conversion failed: {0}")]
    Conversion(String),

    /// Invalid CSS selector or an unrecoverable rewrite failure.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// Invalid exclusion pattern or unreadable configuration file.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The caller cancelled the extraction.
    #[error("Extraction was cancelled")]
    Cancelled,
}

impl ExtractError {
    /// Builds a [`ExtractError::ContentNotFound`] for the named strategy.
    pub fn content_not_found(strategy: impl Into<String>, detail: impl Into<String>) -> Self {
        ExtractError::ContentNotFound { strategy: strategy.into(), detail: detail.into() }
    }

    /// Returns `true` for the network family of errors (primary or secondary fetch).
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            ExtractError::Http(_)
                | ExtractError::HttpStatus { .. }
                | ExtractError::Timeout { .. }
                | ExtractError::InvalidResponse { .. }
        )
    }
}

/// Result type alias for ExtractError.
pub type Result<T> = std::result::Result<T, ExtractError>;
