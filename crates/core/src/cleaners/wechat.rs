//! WeChat official-account articles (`mp.weixin.qq.com`).
//!
//! The article body lives in `#js_content`. Images are lazy-loaded through
//! `data-src`, and code blocks are split into one `<code>` per highlighted
//! line group inside a single `<pre>`, which would otherwise render as several
//! broken fences.

use async_trait::async_trait;
use url::Url;

use crate::markdown::{code_element, language_of};
use crate::parse::{Document, Edit};
use crate::strategy::{CleanContext, CleanResult, CleaningStrategy};
use crate::{ExtractError, Result};

/// Selector of the article body container.
pub const WECHAT_CONTAINER: &str = "#js_content";

/// Cleaner for WeChat articles.
#[derive(Debug, Clone, Copy, Default)]
pub struct WechatCleaner;

#[async_trait]
impl CleaningStrategy for WechatCleaner {
    fn name(&self) -> &'static str {
        "wechat"
    }

    fn matches(&self, url: &Url) -> bool {
        url.host_str() == Some("mp.weixin.qq.com")
    }

    async fn clean(&self, ctx: CleanContext<'_>) -> Result<CleanResult> {
        let mut doc = Document::parse_with_url(ctx.html, Some(ctx.url.clone()))?;
        let metadata = doc.extract_metadata();

        if doc.select_first(WECHAT_CONTAINER)?.is_none() {
            return Err(ExtractError::content_not_found(self.name(), "missing #js_content container"));
        }

        let images = fix_lazy_images(&mut doc, WECHAT_CONTAINER)?;
        let merged = merge_split_code(&mut doc, WECHAT_CONTAINER)?;
        tracing::debug!(images, merged, "cleaned wechat article");

        let content = doc
            .select_first(WECHAT_CONTAINER)?
            .map(|container| container.inner_html())
            .unwrap_or_default();

        Ok(CleanResult::html(content, metadata))
    }
}

/// Sets `src` from `data-src` on images under `scope` whose `src` is missing
/// or a lazy-load placeholder. Returns the number of images changed.
pub fn fix_lazy_images(doc: &mut Document, scope: &str) -> Result<usize> {
    doc.edit_each(&format!("{} img[data-src]", scope), |img| {
        let data_src = img.attr("data-src")?.trim();
        if data_src.is_empty() || !is_placeholder_src(img.attr("src")) {
            return None;
        }
        Some(Edit::SetAttr("src".to_string(), data_src.to_string()))
    })
}

fn is_placeholder_src(src: Option<&str>) -> bool {
    match src.map(str::trim) {
        None | Some("") => true,
        Some(src) => {
            let lower = src.to_lowercase();
            lower.starts_with("data:") || lower.contains("lazy") || lower.contains("placeholder")
        }
    }
}

/// Collapses every `<pre>` under `scope` holding several `<code>` elements
/// into one `<code>` whose text is the parts joined by newlines.
///
/// The merged block is tagged with the language declared on the `<pre>`
/// (`data-lang` or a `language-`/`lang-` class). Returns the number of
/// blocks merged.
pub fn merge_split_code(doc: &mut Document, scope: &str) -> Result<usize> {
    doc.edit_each(&format!("{} pre", scope), |pre| {
        let codes = pre.select("code").ok()?;
        if codes.len() < 2 {
            return None;
        }

        let joined = codes.iter().map(|code| code.text()).collect::<Vec<_>>().join("\n");
        let language = pre
            .attr("data-lang")
            .map(str::trim)
            .filter(|lang| !lang.is_empty())
            .map(str::to_string)
            .or_else(|| language_of(pre));

        Some(Edit::SetInner(code_element(&joined, language.as_deref())))
    })
}
