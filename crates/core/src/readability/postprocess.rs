use std::sync::LazyLock;

use regex::Regex;

use super::scoring::link_density;
use crate::Result;
use crate::parse::{Document, Edit, Element};

static CHROME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(^|[-_])(toc|table[-_]of[-_]contents|on[-_]this[-_]page|breadcrumbs?|sidebar|sidenav|page[-_]nav|pagination|pager|edit[-_]on[-_]github|edit[-_]this[-_]page|share|social)([-_]|$)",
    )
    .expect("CHROME_RE should compile")
});

/// Tags whose presence keeps an otherwise text-less node alive.
const MEDIA_SELECTOR: &str = "img, picture, video, audio, iframe, embed, object, pre, code, table, hr, math";

/// Configuration for HTML post-processing cleanup
#[derive(Debug, Clone)]
pub struct PostProcessConfig {
    /// Whether to remove empty nodes
    pub remove_empty_nodes: bool,
    /// Maximum passes for removing empty nodes
    pub max_empty_node_passes: usize,
    /// Whether to remove nodes with high link density
    pub remove_high_link_density: bool,
    /// Maximum link density threshold (0.0 to 1.0)
    pub max_link_density: f64,
    /// Whether to remove documentation chrome (TOCs, breadcrumbs, share bars)
    pub remove_chrome: bool,
    /// Whether to unwrap DIVs whose only content is another DIV
    pub clean_nested_divs: bool,
    /// Whether to strip all images
    pub strip_images: bool,
    /// Whether to keep class attributes; `language-*` classes are kept regardless
    pub keep_classes: bool,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            remove_empty_nodes: true,
            max_empty_node_passes: 10,
            remove_high_link_density: true,
            max_link_density: 0.5,
            remove_chrome: true,
            clean_nested_divs: true,
            strip_images: false,
            keep_classes: false,
        }
    }
}

/// Cleans the extracted content fragment and returns the body HTML.
pub fn postprocess_html(html: &str, config: &PostProcessConfig) -> Result<String> {
    let mut doc = Document::parse(html)?;

    if config.strip_images {
        doc.rewrite(vec![lol_html::element!("img", |el| {
            el.remove();
            Ok(())
        })])?;
    }

    if config.remove_chrome {
        doc.edit_each("nav, aside, div, section, ul, ol", |el| is_chrome(el).then_some(Edit::Remove))?;
    }

    if !config.keep_classes {
        doc.rewrite(vec![lol_html::element!("[class]", |el| {
            let kept = el.get_attribute("class").map(|classes| keep_code_classes(&classes)).unwrap_or_default();
            if kept.is_empty() {
                el.remove_attribute("class");
            } else {
                el.set_attribute("class", &kept)?;
            }
            Ok(())
        })])?;
    }

    // Paragraphs and lists are prose, even when they are mostly a link.
    if config.remove_high_link_density {
        let max = config.max_link_density;
        doc.edit_each("div, section, aside, nav", |el| {
            (has_text(el) && !has_media(el) && link_density(el) > max).then_some(Edit::Remove)
        })?;
    }

    if config.remove_empty_nodes {
        for _ in 0..config.max_empty_node_passes {
            let removed = doc.edit_each("div, p, span, section, article, aside, header, footer, li, ul, ol", |el| {
                (!has_text(el) && !has_media(el)).then_some(Edit::Remove)
            })?;
            if removed == 0 {
                break;
            }
        }
    }

    if config.clean_nested_divs {
        doc.edit_each("div", |el| is_redundant_wrapper(el).then_some(Edit::Unwrap))?;
    }

    Ok(doc.body_html())
}

/// Filters a class list down to `language-*` / `lang-*` entries.
fn keep_code_classes(classes: &str) -> String {
    classes
        .split_whitespace()
        .filter(|c| c.starts_with("language-") || c.starts_with("lang-"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_chrome(el: &Element<'_>) -> bool {
    el.attr("id").is_some_and(|id| CHROME_RE.is_match(id))
        || el
            .attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| CHROME_RE.is_match(c)))
}

fn has_text(el: &Element<'_>) -> bool {
    !el.text().trim().is_empty()
}

fn has_media(el: &Element<'_>) -> bool {
    matches!(el.tag_name().as_str(), "img" | "pre" | "code" | "table")
        || el.select(MEDIA_SELECTOR).is_ok_and(|found| !found.is_empty())
}

/// A DIV whose only child is another DIV and that has no text of its own.
fn is_redundant_wrapper(el: &Element<'_>) -> bool {
    let children = el.children();
    children.len() == 1 && children[0].tag_name() == "div" && el.own_text().trim().is_empty()
}
