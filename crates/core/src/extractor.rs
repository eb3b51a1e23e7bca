//! The extraction pipeline: fetch, decode, clean, convert, prefix metadata.
//!
//! # Example
//!
//! ```rust,no_run
//! use tidymark_core::{ExtractInput, Extractor};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let extractor = Extractor::new()?;
//! let markdown = extractor.extract(ExtractInput::new("https://example.com/article")).await?;
//! println!("{}", markdown);
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use url::Url;

use crate::config::{ExcludeList, ReadabilityConfig};
use crate::fetch::{FetchConfig, FetchRequest, HttpClient, ReqwestClient, browser_headers, fetch_ok, parse_url};
use crate::markdown::{HtmdConverter, MarkdownConverter};
use crate::plugins::{ReadabilityPlugin, default_plugins};
use crate::strategy::{CleanContext, CleanResult, StrategyRegistry};
use crate::{ExtractError, Result};

/// Separator between the front-matter block and the Markdown body.
pub const FRONT_MATTER_SEPARATOR: &str = "\n---\n\n";

/// A single extraction request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractInput {
    pub url: String,
    /// Return the strategy's cleaned content verbatim, without front-matter
    /// or Markdown conversion.
    pub raw: bool,
}

impl ExtractInput {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), raw: false }
    }

    pub fn raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }
}

/// Turns web pages into Markdown with front-matter.
///
/// Holds only read-only collaborators, so one instance can serve any number
/// of concurrent extractions.
#[derive(Clone)]
pub struct Extractor {
    client: Arc<dyn HttpClient>,
    registry: StrategyRegistry,
    converter: Arc<dyn MarkdownConverter>,
    user_agent: String,
}

impl Extractor {
    /// Creates an extractor with the default client, strategies and converter.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> ExtractorBuilder {
        ExtractorBuilder::new()
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Fetches `input.url` and extracts it.
    ///
    /// # Errors
    ///
    /// [`ExtractError::InvalidUrl`] before any request when the URL is not an
    /// absolute http(s) URL; fetch errors for transport failures and non-2xx
    /// answers; otherwise whatever the selected strategy or the converter
    /// returns.
    pub async fn extract(&self, input: ExtractInput) -> Result<String> {
        let url = parse_url(&input.url)?;

        tracing::debug!(url = %url, raw = input.raw, "fetching page");
        let request = FetchRequest::get(url.as_str()).headers(browser_headers(&url, &self.user_agent));
        let response = fetch_ok(self.client.as_ref(), request).await?;
        let html = response.text();

        self.process(&url, &html, input.raw).await
    }

    /// Extracts from caller-provided HTML as if it had been fetched from `url`.
    ///
    /// Site strategies that call secondary APIs still use the client.
    pub async fn extract_html(&self, url: &str, html: &str, raw: bool) -> Result<String> {
        let url = parse_url(url)?;
        self.process(&url, html, raw).await
    }

    /// Runs [`Extractor::extract`] until it finishes or `cancel` completes,
    /// whichever comes first. In-flight requests are dropped on cancellation.
    pub async fn extract_with_cancel<F>(&self, input: ExtractInput, cancel: F) -> Result<String>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = cancel => Err(ExtractError::Cancelled),
            result = self.extract(input) => result,
        }
    }

    async fn process(&self, url: &Url, html: &str, raw: bool) -> Result<String> {
        let strategy = self.registry.select(url);
        let ctx = CleanContext { html, url, client: self.client.as_ref() };
        let result = strategy.clean(ctx).await?;

        render_output(&result, self.converter.as_ref(), raw)
    }
}

/// Formats a [`CleanResult`] as the final output.
///
/// Raw mode returns the content verbatim. Otherwise the content is converted
/// unless it is already Markdown, and prefixed with the metadata block.
pub fn render_output(result: &CleanResult, converter: &dyn MarkdownConverter, raw: bool) -> Result<String> {
    if raw {
        return Ok(result.content.clone());
    }

    let body = if result.is_pure_markdown { result.content.clone() } else { converter.convert(&result.content)? };

    Ok(format!("{}{}{}", result.metadata.to_yaml(), FRONT_MATTER_SEPARATOR, body))
}

/// Builder for [`Extractor`].
///
/// A registry set with [`ExtractorBuilder::registry`] is used as-is; otherwise
/// the default registry is assembled from the exclusion list, plugins and
/// readability config.
#[derive(Default)]
pub struct ExtractorBuilder {
    client: Option<Arc<dyn HttpClient>>,
    fetch_config: FetchConfig,
    registry: Option<StrategyRegistry>,
    plugins: Option<Vec<Arc<dyn ReadabilityPlugin>>>,
    readability: ReadabilityConfig,
    exclude: ExcludeList,
    converter: Option<Arc<dyn MarkdownConverter>>,
}

impl ExtractorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `client` for every request instead of a [`ReqwestClient`].
    pub fn client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn fetch_config(mut self, config: FetchConfig) -> Self {
        self.fetch_config = config;
        self
    }

    pub fn registry(mut self, registry: StrategyRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn plugins(mut self, plugins: Vec<Arc<dyn ReadabilityPlugin>>) -> Self {
        self.plugins = Some(plugins);
        self
    }

    pub fn readability_config(mut self, config: ReadabilityConfig) -> Self {
        self.readability = config;
        self
    }

    pub fn exclude(mut self, exclude: ExcludeList) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn converter(mut self, converter: Arc<dyn MarkdownConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// # Errors
    ///
    /// Fails only when the default HTTP client cannot be constructed.
    pub fn build(self) -> Result<Extractor> {
        let user_agent = self.fetch_config.user_agent.clone();

        let client: Arc<dyn HttpClient> = match self.client {
            Some(client) => client,
            None => Arc::new(ReqwestClient::new(self.fetch_config)?),
        };

        let registry = match self.registry {
            Some(registry) => registry,
            None => StrategyRegistry::with_defaults(
                self.exclude,
                self.plugins.unwrap_or_else(default_plugins),
                self.readability,
            ),
        };

        let converter = self.converter.unwrap_or_else(|| Arc::new(HtmdConverter::new()));

        Ok(Extractor { client, registry, converter, user_agent })
    }
}
