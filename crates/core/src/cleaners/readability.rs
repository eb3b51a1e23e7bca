use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::config::ReadabilityConfig;
use crate::parse::Document;
use crate::plugins::ReadabilityPlugin;
use crate::readability::readable_content;
use crate::strategy::{CleanContext, CleanResult, CleaningStrategy};
use crate::{ExtractError, Result};

/// The catch-all cleaner: plugin chain, then the readability pass.
///
/// Metadata is read from the untouched document before any plugin runs.
#[derive(Clone, Default)]
pub struct ReadabilityCleaner {
    plugins: Vec<Arc<dyn ReadabilityPlugin>>,
    config: ReadabilityConfig,
}

impl ReadabilityCleaner {
    pub fn new(plugins: Vec<Arc<dyn ReadabilityPlugin>>, config: ReadabilityConfig) -> Self {
        Self { plugins, config }
    }

    pub fn config(&self) -> &ReadabilityConfig {
        &self.config
    }

    /// Plugin names in execution order.
    pub fn plugin_names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Runs the cleaner synchronously; no network access is needed.
    pub fn clean_html(&self, html: &str, url: &Url) -> Result<CleanResult> {
        let mut doc = Document::parse_with_url(html, Some(url.clone()))?;
        let metadata = doc.extract_metadata();

        for plugin in &self.plugins {
            tracing::debug!(plugin = plugin.name(), "running readability plugin");
            plugin.before_clean(&mut doc, url)?;
        }

        let extracted = readable_content(&doc.as_string(), Some(url), &self.config).map_err(|e| match e {
            ExtractError::NotReadable { score, threshold } => ExtractError::content_not_found(
                "readability",
                format!("best candidate scored {:.1}, below {:.1}", score, threshold),
            ),
            ExtractError::NoContent => ExtractError::content_not_found("readability", "no candidate content blocks"),
            other => other,
        })?;

        Ok(CleanResult::html(extracted.content, metadata))
    }
}

#[async_trait]
impl CleaningStrategy for ReadabilityCleaner {
    fn name(&self) -> &'static str {
        "readability"
    }

    fn matches(&self, _url: &Url) -> bool {
        true
    }

    async fn clean(&self, ctx: CleanContext<'_>) -> Result<CleanResult> {
        self.clean_html(ctx.html, ctx.url)
    }
}
