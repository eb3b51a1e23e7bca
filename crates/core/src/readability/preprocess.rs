use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::parse::{ElementHandler, rewrite_html};

static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("COMMENT_RE should compile"));

static PRE_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<pre\b.*?</pre\s*>").expect("PRE_BLOCK_RE should compile"));

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("WHITESPACE_RE should compile"));

static HIDDEN_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(display\s*:\s*none|visibility\s*:\s*hidden)").expect("HIDDEN_STYLE_RE should compile")
});

pub(crate) static UNLIKELY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(banner|breadcrumbs?|combx|comment|community|disqus|extra|foot|header|menu|related|remark|rss|shoutbox|sidebar|sponsor|ad-break|agegate|pagination|pager|popup)",
    )
    .expect("UNLIKELY_RE should compile")
});

pub(crate) static POSITIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(article|body|content|entry|hentry|h-entry|main|page|post|text|blog|story|tweet)")
        .expect("POSITIVE_RE should compile")
});

/// Tags never unwrapped as unlikely candidates, whatever their class says.
const UNLIKELY_EXEMPT_TAGS: &[&str] = &["html", "body", "article", "main", "a", "pre", "code", "table"];

/// Configuration for HTML preprocessing
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Tags removed together with their content.
    pub remove_tags: Vec<&'static str>,
    /// Whether to unwrap unlikely candidates
    pub remove_unlikely: bool,
    /// Whether an element matching both unlikely and positive patterns is kept
    pub keep_positive: bool,
    /// Whether to remove `display:none`, `visibility:hidden` and `hidden` elements
    pub remove_hidden: bool,
    /// Base URL for converting relative URLs
    pub base_url: Option<Url>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            remove_tags: vec!["script", "noscript", "iframe", "svg", "canvas", "style"],
            remove_unlikely: true,
            keep_positive: true,
            remove_hidden: true,
            base_url: None,
        }
    }
}

/// Prepares a page for scoring.
///
/// Strips comments, removes non-content tags and hidden elements, unwraps
/// unlikely candidates, resolves relative links against the base URL and
/// collapses whitespace everywhere except inside `<pre>` blocks.
///
/// A rewrite failure leaves the affected stage's input unchanged.
pub fn preprocess_html(html: &str, config: &PreprocessConfig) -> String {
    let without_comments = COMMENT_RE.replace_all(html, "");

    let mut handlers: Vec<ElementHandler<'_>> = config
        .remove_tags
        .iter()
        .map(|tag| {
            lol_html::element!(*tag, |el| {
                el.remove();
                Ok(())
            })
        })
        .collect();

    if config.remove_hidden || config.remove_unlikely {
        let remove_hidden = config.remove_hidden;
        let remove_unlikely = config.remove_unlikely;
        let keep_positive = config.keep_positive;

        handlers.push(lol_html::element!("*", move |el| {
            if remove_hidden && is_hidden(el.get_attribute("style").as_deref(), el.has_attribute("hidden")) {
                el.remove();
                return Ok(());
            }

            if remove_unlikely && !UNLIKELY_EXEMPT_TAGS.contains(&el.tag_name().as_str()) {
                let id = el.get_attribute("id").unwrap_or_default();
                let class = el.get_attribute("class").unwrap_or_default();
                if is_unlikely(&id, &class, keep_positive) {
                    el.remove_and_keep_content();
                }
            }
            Ok(())
        }));
    }

    let cleaned = rewrite_html(&without_comments, handlers).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "preprocess rewrite failed, keeping input");
        without_comments.to_string()
    });

    let resolved = match &config.base_url {
        Some(base_url) => convert_relative_urls(&cleaned, base_url),
        None => cleaned,
    };

    normalize_whitespace(&resolved)
}

fn is_hidden(style: Option<&str>, hidden_attr: bool) -> bool {
    hidden_attr || style.is_some_and(|s| HIDDEN_STYLE_RE.is_match(s))
}

fn is_unlikely(id: &str, class: &str, keep_positive: bool) -> bool {
    std::iter::once(id)
        .chain(class.split_whitespace())
        .filter(|token| !token.is_empty())
        .any(|token| UNLIKELY_RE.is_match(token) && !(keep_positive && POSITIVE_RE.is_match(token)))
}

/// Resolves relative `href`/`src` attributes against `base_url`.
///
/// Images that only carry a lazy-load `data-src` are resolved too.
pub fn convert_relative_urls(html: &str, base_url: &Url) -> String {
    let resolve = |value: &str| -> Option<String> {
        let value = value.trim();
        if value.is_empty() || value.starts_with('#') || value.starts_with("data:") {
            return None;
        }
        base_url.join(value).ok().map(|u| u.to_string())
    };

    let handlers = vec![
        lol_html::element!("a[href]", |el| {
            if let Some(absolute) = el.get_attribute("href").and_then(|href| resolve(&href)) {
                el.set_attribute("href", &absolute)?;
            }
            Ok(())
        }),
        lol_html::element!("link[href]", |el| {
            if let Some(absolute) = el.get_attribute("href").and_then(|href| resolve(&href)) {
                el.set_attribute("href", &absolute)?;
            }
            Ok(())
        }),
        lol_html::element!("img", |el| {
            for attr in ["src", "data-src"] {
                if let Some(absolute) = el.get_attribute(attr).and_then(|v| resolve(&v)) {
                    el.set_attribute(attr, &absolute)?;
                }
            }
            Ok(())
        }),
    ];

    rewrite_html(html, handlers).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "relative URL rewrite failed, keeping input");
        html.to_string()
    })
}

/// Collapses whitespace runs to a single space outside `<pre>` blocks.
fn normalize_whitespace(html: &str) -> String {
    let mut output = String::with_capacity(html.len());
    let mut last = 0;

    for block in PRE_BLOCK_RE.find_iter(html) {
        output.push_str(&WHITESPACE_RE.replace_all(&html[last..block.start()], " "));
        output.push_str(block.as_str());
        last = block.end();
    }
    output.push_str(&WHITESPACE_RE.replace_all(&html[last..], " "));

    output
}
