//! HTML parsing and DOM manipulation.
//!
//! This module provides the [`Document`] and [`Element`] types. Reads go
//! through `scraper` (CSS selector queries, attributes, text, inner/outer
//! HTML). Writes go through a streaming `lol_html` rewrite of the serialized
//! tree followed by a re-parse, so every mutation (attribute set, tag rename,
//! inner-content replacement, element replacement or removal) is expressed as
//! a selector plus an element handler.
//!
//! # Example
//!
//! ```rust
//! use tidymark_core::parse::Document;
//!
//! let mut doc = Document::parse(r#"<a href="/x"><div>Label</div></a>"#).unwrap();
//! doc.rewrite(vec![lol_html::element!("a div", |el| {
//!     el.set_tag_name("span")?;
//!     Ok(())
//! })])
//! .unwrap();
//!
//! assert_eq!(doc.select("a span").unwrap().len(), 1);
//! ```

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

use lol_html::html_content::ContentType;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use crate::{ExtractError, Result};

/// A selector paired with the handlers `lol_html` runs on matching elements.
///
/// Build these with [`lol_html::element!`].
pub type ElementHandler<'h> = (Cow<'h, lol_html::Selector>, lol_html::ElementContentHandlers<'h>);

/// Attribute that pins elements between the read and write passes of [`Document::edit_each`].
const EDIT_MARKER: &str = "data-tidymark-idx";

static EDIT_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\s+data-tidymark-idx="\d+""#).expect("EDIT_MARKER_RE should compile"));

/// A structural change to one element, decided by [`Document::edit_each`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// Drop the element and everything inside it.
    Remove,
    /// Drop the element's own tags, keeping its children in place.
    Unwrap,
    /// Replace the whole element with HTML.
    Replace(String),
    /// Replace the element's children with HTML.
    SetInner(String),
    /// Set an attribute.
    SetAttr(String, String),
}

/// Represents a parsed HTML document bound to an optional base URL.
///
/// Parsing never fails on malformed markup; the html5ever tree builder
/// recovers the same way browsers do.
///
/// # Example
///
/// ```rust
/// use tidymark_core::parse::Document;
///
/// let html = "<html><head><title>Test</title></head><body><p>Hello</p></body></html>";
/// let doc = Document::parse(html).unwrap();
/// assert_eq!(doc.title(), Some("Test".to_string()));
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    html: Html,
    base_url: Option<Url>,
}

impl Document {
    /// Parses HTML from a string without preprocessing.
    pub fn parse(html: &str) -> Result<Self> {
        Ok(Self { html: Html::parse_document(html), base_url: None })
    }

    /// Parses HTML and binds the document to `base_url` for link resolution.
    pub fn parse_with_url(html: &str, base_url: Option<Url>) -> Result<Self> {
        Ok(Self { html: Html::parse_document(html), base_url })
    }

    /// Gets the base URL the document was parsed with.
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Gets the underlying `scraper::Html`.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Serializes the whole document back to HTML.
    pub fn as_string(&self) -> String {
        self.html.html()
    }

    /// Selects elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::HtmlParseError`] if the selector is invalid.
    /// A selector that matches nothing yields an empty vector.
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = compile_selector(selector)?;
        Ok(self.html.select(&sel).map(|el| Element { element: el }).collect())
    }

    /// Selects the first element matching a CSS selector.
    pub fn select_first(&'_ self, selector: &str) -> Result<Option<Element<'_>>> {
        let sel = compile_selector(selector)?;
        Ok(self.html.select(&sel).next().map(|el| Element { element: el }))
    }

    /// Gets the content of the `<title>` element if present.
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.html
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Gets all text content from the document.
    pub fn text_content(&self) -> String {
        self.html.root_element().text().collect()
    }

    /// Gets the `<html>` root element.
    pub fn root_element(&self) -> Element<'_> {
        Element { element: self.html.root_element() }
    }

    /// Gets the inner HTML of `<body>`, or the whole document if there is none.
    pub fn body_html(&self) -> String {
        match self.select_first("body") {
            Ok(Some(body)) => body.inner_html(),
            _ => self.as_string(),
        }
    }

    /// Applies `handlers` to the serialized document and re-parses the result.
    ///
    /// Handlers run in document order; when several handlers match the same
    /// element they run in the order given.
    pub fn rewrite(&mut self, handlers: Vec<ElementHandler<'_>>) -> Result<()> {
        let rewritten = rewrite_html(&self.as_string(), handlers)?;
        self.html = Html::parse_document(&rewritten);
        Ok(())
    }

    /// Applies a per-element [`Edit`] to every element matching `selector`.
    ///
    /// `decide` sees each match in document order against the current tree.
    /// Edits are applied in a single rewrite afterwards, so one decision never
    /// observes another's effect. Returns the number of edits applied.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::HtmlParseError`] if the selector is invalid.
    pub fn edit_each<F>(&mut self, selector: &str, mut decide: F) -> Result<usize>
    where
        F: FnMut(&Element<'_>) -> Option<Edit>,
    {
        let sel = compile_selector(selector)?;

        let mut counter = 0usize;
        let tagged = rewrite_html(
            &self.as_string(),
            vec![lol_html::element!("*", |el| {
                el.set_attribute(EDIT_MARKER, &counter.to_string())?;
                counter += 1;
                Ok(())
            })],
        )?;

        let tagged_doc = Html::parse_document(&tagged);
        let mut edits: HashMap<String, Edit> = HashMap::new();
        for el in tagged_doc.select(&sel) {
            let element = Element { element: el };
            if let Some(idx) = element.attr(EDIT_MARKER)
                && let Some(edit) = decide(&element)
            {
                edits.insert(idx.to_string(), edit);
            }
        }

        if edits.is_empty() {
            return Ok(0);
        }

        let applied = edits.len();
        let rewritten = rewrite_html(
            &tagged,
            vec![lol_html::element!("*", |el| {
                let Some(idx) = el.get_attribute(EDIT_MARKER) else {
                    return Ok(());
                };
                el.remove_attribute(EDIT_MARKER);

                match edits.get(&idx) {
                    Some(Edit::Remove) => el.remove(),
                    Some(Edit::Unwrap) => el.remove_and_keep_content(),
                    Some(Edit::Replace(html)) => el.replace(&strip_markers(html), ContentType::Html),
                    Some(Edit::SetInner(html)) => el.set_inner_content(&strip_markers(html), ContentType::Html),
                    Some(Edit::SetAttr(name, value)) => el.set_attribute(name, value)?,
                    None => {}
                }
                Ok(())
            })],
        )?;

        self.html = Html::parse_document(&rewritten);
        Ok(applied)
    }
}

fn strip_markers(html: &str) -> Cow<'_, str> {
    EDIT_MARKER_RE.replace_all(html, "")
}

/// A wrapper around scraper's ElementRef for easier DOM reads.
///
/// # Example
///
/// ```rust
/// use tidymark_core::parse::Document;
///
/// let html = r#"<a href="https://example.com">Link text</a>"#;
/// let doc = Document::parse(html).unwrap();
/// let link = &doc.select("a").unwrap()[0];
///
/// assert_eq!(link.text(), "Link text");
/// assert_eq!(link.attr("href"), Some("https://example.com"));
/// ```
#[derive(Clone, Debug)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

impl<'a> Element<'a> {
    /// Gets the inner HTML of this element.
    pub fn inner_html(&self) -> String {
        self.element.inner_html()
    }

    /// Gets the outer HTML of this element.
    pub fn outer_html(&self) -> String {
        self.element.html()
    }

    /// Gets the concatenated text of all descendant text nodes.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Gets the text of direct child text nodes only.
    pub fn own_text(&self) -> String {
        self.element
            .children()
            .filter_map(|child| match child.value() {
                Node::Text(text) => Some(&**text),
                _ => None,
            })
            .collect()
    }

    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Checks whether the class list contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// Gets the lowercase tag name.
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    /// Gets the direct element children.
    pub fn children(&self) -> Vec<Element<'a>> {
        self.element
            .children()
            .filter_map(ElementRef::wrap)
            .map(|el| Element { element: el })
            .collect()
    }

    /// Checks whether any ancestor element is a `tag_name`.
    pub fn has_ancestor(&self, tag_name: &str) -> bool {
        self.element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|el| el.value().name().eq_ignore_ascii_case(tag_name))
    }

    /// Selects descendant elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::HtmlParseError`] if the selector is invalid.
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel = compile_selector(selector)?;
        Ok(self.element.select(&sel).map(|el| Element { element: el }).collect())
    }
}

fn compile_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ExtractError::HtmlParseError(format!("Invalid selector: {}", e)))
}

/// Runs a streaming `lol_html` rewrite over `html`.
pub fn rewrite_html(html: &str, handlers: Vec<ElementHandler<'_>>) -> Result<String> {
    let mut output = Vec::with_capacity(html.len());
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings { element_content_handlers: handlers, ..Default::default() },
        |c: &[u8]| output.extend_from_slice(c),
    );

    rewriter
        .write(html.as_bytes())
        .map_err(|e| ExtractError::HtmlParseError(e.to_string()))?;
    rewriter.end().map_err(|e| ExtractError::HtmlParseError(e.to_string()))?;

    String::from_utf8(output).map_err(|e| ExtractError::HtmlParseError(e.to_string()))
}
