//! The readability pass used by the generic cleaner.
//!
//! Preprocessing strips non-content markup, [`extract`] scores candidate
//! blocks by tag, class/id, text density, paragraph children and link
//! density, picks the best container plus qualifying siblings, and
//! [`postprocess`] tidies the result. Given the same DOM the output is always
//! the same.

pub mod dom_tree;
pub mod extract;
pub mod postprocess;
pub mod preprocess;
pub mod scoring;

pub use extract::{ExtractedContent, extract_content};

use url::Url;

use crate::Result;
use crate::config::ReadabilityConfig;
use crate::parse::Document;
use preprocess::{PreprocessConfig, preprocess_html};

/// Runs preprocessing and extraction over serialized HTML.
///
/// Relative links are resolved against `base_url` when one is given.
pub fn readable_content(html: &str, base_url: Option<&Url>, config: &ReadabilityConfig) -> Result<ExtractedContent> {
    let preprocess_config = PreprocessConfig {
        remove_unlikely: config.remove_unlikely,
        base_url: base_url.cloned(),
        ..Default::default()
    };

    let doc = Document::parse_with_url(&preprocess_html(html, &preprocess_config), base_url.cloned())?;
    extract_content(&doc, config)
}
