//! DOM pre-transforms run by the readability cleaner before scoring.
//!
//! Plugins run in registration order against the same mutable [`Document`].
//! Each one only touches elements matching its own selector, and a plugin
//! that finds nothing to change leaves the document as it was.

use std::sync::Arc;

use url::Url;

use crate::Result;
use crate::cleaners::wechat::{WECHAT_CONTAINER, fix_lazy_images, merge_split_code};
use crate::markdown::code_element;
use crate::parse::{Document, Edit};

/// A named DOM mutation applied before the readability pass.
pub trait ReadabilityPlugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Mutates `doc` in place.
    fn before_clean(&self, doc: &mut Document, url: &Url) -> Result<()>;
}

/// The standard plugin chain, in execution order.
pub fn default_plugins() -> Vec<Arc<dyn ReadabilityPlugin>> {
    vec![Arc::new(DeleteStyleTag), Arc::new(ATagClean), Arc::new(NpmPlugin), Arc::new(WechatArticlePlugin)]
}

/// Removes every `<style>` element.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteStyleTag;

impl ReadabilityPlugin for DeleteStyleTag {
    fn name(&self) -> &'static str {
        "deleteStyleTag"
    }

    fn before_clean(&self, doc: &mut Document, _url: &Url) -> Result<()> {
        doc.rewrite(vec![lol_html::element!("style", |el| {
            el.remove();
            Ok(())
        })])
    }
}

/// Turns `<div>` elements inside `<a>` into `<span>`, keeping their content.
#[derive(Debug, Clone, Copy, Default)]
pub struct ATagClean;

impl ReadabilityPlugin for ATagClean {
    fn name(&self) -> &'static str {
        "aTagClean"
    }

    fn before_clean(&self, doc: &mut Document, _url: &Url) -> Result<()> {
        doc.rewrite(vec![lol_html::element!("a div", |el| {
            el.set_tag_name("span")?;
            Ok(())
        })])
    }
}

/// Rewrites npm README highlight blocks into `<pre><code class="language-X">`.
///
/// Only runs for `npmjs.com/package` pages. The language comes from the
/// `highlight-source-<lang>` class on the block.
#[derive(Debug, Clone, Copy, Default)]
pub struct NpmPlugin;

impl NpmPlugin {
    fn applies_to(url: &Url) -> bool {
        url.as_str().contains("npmjs.com/package")
    }
}

impl ReadabilityPlugin for NpmPlugin {
    fn name(&self) -> &'static str {
        "npmPlugin"
    }

    fn before_clean(&self, doc: &mut Document, url: &Url) -> Result<()> {
        if !Self::applies_to(url) {
            return Ok(());
        }

        doc.edit_each("div.highlight", |block| {
            let language = block.attr("class").and_then(|classes| {
                classes
                    .split_whitespace()
                    .find_map(|c| c.strip_prefix("highlight-source-"))
                    .filter(|lang| !lang.is_empty())
            });
            let code = block.text();
            let code = code.trim_end_matches('\n');

            Some(Edit::Replace(format!("<pre>{}</pre>", code_element(code, language))))
        })?;
        Ok(())
    }
}

/// WeChat image and code-block fixes for WeChat markup reaching the generic
/// cleaner. Scoped to the `#js_content` container.
#[derive(Debug, Clone, Copy, Default)]
pub struct WechatArticlePlugin;

impl ReadabilityPlugin for WechatArticlePlugin {
    fn name(&self) -> &'static str {
        "wechatArticleCleanPlugin"
    }

    fn before_clean(&self, doc: &mut Document, _url: &Url) -> Result<()> {
        if doc.select_first(WECHAT_CONTAINER)?.is_none() {
            return Ok(());
        }

        // The container ships hidden and is revealed by page scripts.
        doc.rewrite(vec![lol_html::element!(WECHAT_CONTAINER, |el| {
            el.remove_attribute("style");
            Ok(())
        })])?;

        fix_lazy_images(doc, WECHAT_CONTAINER)?;
        merge_split_code(doc, WECHAT_CONTAINER)?;
        Ok(())
    }
}
