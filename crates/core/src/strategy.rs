//! Cleaning strategies and the ordered registry that picks one per URL.
//!
//! A [`StrategyRegistry`] holds specific strategies in registration order and
//! a mandatory fallback. Selection walks the specific list and takes the first
//! strategy whose [`CleaningStrategy::matches`] returns `true`; when none does
//! the fallback is used, so every URL resolves to exactly one strategy.
//!
//! # Example
//!
//! ```rust
//! use tidymark_core::strategy::StrategyRegistry;
//! use tidymark_core::config::{ExcludeList, ReadabilityConfig};
//! use tidymark_core::plugins::default_plugins;
//! use url::Url;
//!
//! let registry = StrategyRegistry::with_defaults(ExcludeList::new(), default_plugins(), ReadabilityConfig::default());
//! let url = Url::parse("https://hub.docker.com/r/oven/bun").unwrap();
//! assert_eq!(registry.select(&url).name(), "dockerhub");
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::Result;
use crate::cleaners::{DockerHubCleaner, InfoQCleaner, PassthroughCleaner, ReadabilityCleaner, WechatCleaner};
use crate::config::{ExcludeList, ReadabilityConfig};
use crate::fetch::HttpClient;
use crate::metadata::MetaData;
use crate::plugins::ReadabilityPlugin;

/// What a strategy produced for one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanResult {
    /// Cleaned HTML, or final Markdown when `is_pure_markdown` is set.
    pub content: String,
    pub metadata: MetaData,
    /// Content is already Markdown and must bypass the converter.
    pub is_pure_markdown: bool,
}

impl CleanResult {
    /// An HTML result.
    pub fn html(content: impl Into<String>, metadata: MetaData) -> Self {
        Self { content: content.into(), metadata, is_pure_markdown: false }
    }

    /// A result whose content is already Markdown.
    pub fn markdown(content: impl Into<String>, metadata: MetaData) -> Self {
        Self { content: content.into(), metadata, is_pure_markdown: true }
    }
}

/// Inputs handed to [`CleaningStrategy::clean`].
///
/// The client is the same collaborator used for the primary fetch, so
/// secondary requests share its configuration.
#[derive(Clone, Copy)]
pub struct CleanContext<'a> {
    /// Decoded HTML of the page.
    pub html: &'a str,
    /// The page URL.
    pub url: &'a Url,
    pub client: &'a dyn HttpClient,
}

/// A named, URL-matched cleaning algorithm.
///
/// Implementations hold no per-request state; each call to `clean` is
/// independent of every other.
#[async_trait]
pub trait CleaningStrategy: Send + Sync {
    /// Strategy name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Checks whether this strategy handles `url`.
    fn matches(&self, url: &Url) -> bool;

    /// Cleans the page.
    async fn clean(&self, ctx: CleanContext<'_>) -> Result<CleanResult>;
}

/// Ordered strategies plus a catch-all fallback.
#[derive(Clone)]
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn CleaningStrategy>>,
    fallback: Arc<dyn CleaningStrategy>,
}

impl StrategyRegistry {
    /// Creates a registry with only a fallback.
    pub fn new(fallback: Arc<dyn CleaningStrategy>) -> Self {
        Self { strategies: Vec::new(), fallback }
    }

    /// Builds the standard registry: passthrough for excluded URLs, then
    /// InfoQ, WeChat and Docker Hub, with the readability cleaner as fallback.
    pub fn with_defaults(
        exclude: ExcludeList, plugins: Vec<Arc<dyn ReadabilityPlugin>>, config: ReadabilityConfig,
    ) -> Self {
        Self::new(Arc::new(ReadabilityCleaner::new(plugins, config)))
            .register(Arc::new(PassthroughCleaner::new(exclude)))
            .register(Arc::new(InfoQCleaner))
            .register(Arc::new(WechatCleaner))
            .register(Arc::new(DockerHubCleaner))
    }

    /// Appends a strategy after those already registered.
    pub fn register(mut self, strategy: Arc<dyn CleaningStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Picks the first matching strategy, or the fallback.
    pub fn select(&self, url: &Url) -> &dyn CleaningStrategy {
        let chosen: &dyn CleaningStrategy = self
            .strategies
            .iter()
            .find(|strategy| strategy.matches(url))
            .unwrap_or(&self.fallback)
            .as_ref();

        tracing::debug!(strategy = chosen.name(), url = %url, "selected cleaning strategy");
        chosen
    }

    /// Strategy names in selection order, fallback last.
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies
            .iter()
            .chain(std::iter::once(&self.fallback))
            .map(|strategy| strategy.name())
            .collect()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_defaults(ExcludeList::new(), crate::plugins::default_plugins(), ReadabilityConfig::default())
    }
}
