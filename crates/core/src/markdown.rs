//! HTML to Markdown conversion.
//!
//! [`HtmdConverter`] produces ATX headings, backtick-fenced code blocks whose
//! info string comes from `class="language-X"` on the `<code>` element,
//! inline links and images, and GFM pipe tables.
//!
//! Before conversion the HTML is normalized so common code markup converts
//! cleanly: a bare `<pre>` gets a `<code>` child, a language declared on the
//! `<pre>` moves onto its `<code>`, and lazy images with only `data-src` get a
//! real `src`.
//!
//! # Example
//!
//! ```rust
//! use tidymark_core::markdown::{HtmdConverter, MarkdownConverter};
//!
//! let converter = HtmdConverter::new();
//! let md = converter.convert("<h2>Install</h2><pre class=\"lang-sh\">cargo add tidymark</pre>").unwrap();
//! assert!(md.starts_with("## Install"));
//! assert!(md.contains("```sh\ncargo add tidymark\n```"));
//! ```

use htmd::HtmlToMarkdown;
use html_escape::{encode_double_quoted_attribute, encode_text};
use htmd::options::{CodeBlockStyle, HeadingStyle, LinkStyle, Options};

use crate::parse::{Document, Edit, Element};
use crate::{ExtractError, Result};

/// Paragraph text standing in for a table until the final substitution.
const TABLE_PLACEHOLDER: &str = "tidymarktableplaceholder";

/// Converts cleaned HTML into Markdown.
pub trait MarkdownConverter: Send + Sync {
    /// Converts `html` to Markdown.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Conversion`] when the HTML cannot be converted.
    fn convert(&self, html: &str) -> Result<String>;
}

/// [`MarkdownConverter`] backed by htmd.
#[derive(Debug, Clone)]
pub struct HtmdConverter {
    skip_tags: Vec<&'static str>,
}

impl HtmdConverter {
    pub fn new() -> Self {
        Self { skip_tags: vec!["head", "script", "style", "noscript", "template"] }
    }

    fn build(&self) -> HtmlToMarkdown {
        let options = Options {
            heading_style: HeadingStyle::Atx,
            code_block_style: CodeBlockStyle::Fenced,
            link_style: LinkStyle::Inlined,
            ..Default::default()
        };

        HtmlToMarkdown::builder()
            .options(options)
            .skip_tags(self.skip_tags.clone())
            .build()
    }
}

impl Default for HtmdConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownConverter for HtmdConverter {
    fn convert(&self, html: &str) -> Result<String> {
        let converter = self.build();
        let mut doc = Document::parse(html)?;

        normalize_code_blocks(&mut doc)?;
        fix_lazy_images(&mut doc)?;

        let mut tables = Vec::new();
        doc.edit_each("table", |table| {
            if table.has_ancestor("table") {
                return None;
            }
            let placeholder = format!("<p>{}{}</p>", TABLE_PLACEHOLDER, tables.len());
            tables.push(render_table(table, &converter));
            Some(Edit::Replace(placeholder))
        })?;
        let tables = tables.into_iter().collect::<Result<Vec<_>>>()?;

        let mut markdown = converter
            .convert(&doc.as_string())
            .map_err(|e| ExtractError::Conversion(e.to_string()))?;

        // Highest index first so `...1` never clobbers `...10`.
        for (i, table) in tables.iter().enumerate().rev() {
            markdown = place_table(&markdown, &format!("{}{}", TABLE_PLACEHOLDER, i), table);
        }

        Ok(markdown.trim().to_string())
    }
}

/// Gets the language from a `language-X` / `lang-X` class or `data-lang`.
pub fn language_of(element: &Element<'_>) -> Option<String> {
    let from_class = element.attr("class").and_then(|classes| {
        classes.split_whitespace().find_map(|c| {
            c.strip_prefix("language-")
                .or_else(|| c.strip_prefix("lang-"))
                .filter(|lang| !lang.is_empty())
        })
    });

    from_class
        .or_else(|| element.attr("data-lang"))
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
}

/// Builds `<code class="language-X">text</code>` with the text escaped.
pub fn code_element(text: &str, language: Option<&str>) -> String {
    match language {
        Some(lang) => format!(
            r#"<code class="language-{}">{}</code>"#,
            encode_double_quoted_attribute(lang),
            encode_text(text)
        ),
        None => format!("<code>{}</code>", encode_text(text)),
    }
}

/// Gives every `<pre>` a single `<code>` child carrying the block's language.
fn normalize_code_blocks(doc: &mut Document) -> Result<usize> {
    doc.edit_each("pre", |pre| {
        let codes: Vec<_> = pre.children().into_iter().filter(|c| c.tag_name() == "code").collect();
        let pre_lang = language_of(pre);

        match codes.as_slice() {
            [] => Some(Edit::SetInner(code_element(&pre.text(), pre_lang.as_deref()))),
            [code] if language_of(code).is_none() && pre_lang.is_some() => {
                Some(Edit::SetInner(code_element(&code.text(), pre_lang.as_deref())))
            }
            _ => None,
        }
    })
}

/// Copies `data-src` into `src` on images that have no usable `src`.
fn fix_lazy_images(doc: &mut Document) -> Result<usize> {
    doc.edit_each("img[data-src]", |img| {
        let src = img.attr("src").map(str::trim).unwrap_or_default();
        let data_src = img.attr("data-src")?.trim();
        (src.is_empty() && !data_src.is_empty()).then(|| Edit::SetAttr("src".to_string(), data_src.to_string()))
    })
}

/// Swaps `marker` for `table`, repeating the marker line's block prefix
/// (list indentation, `>` quote markers) on every following table line.
fn place_table(markdown: &str, marker: &str, table: &str) -> String {
    let Some(pos) = markdown.find(marker) else {
        return markdown.to_string();
    };

    let line_start = markdown[..pos].rfind('\n').map_or(0, |i| i + 1);
    let continuation: String = markdown[line_start..pos]
        .chars()
        .map(|c| if c == '>' { '>' } else { ' ' })
        .collect();
    let body = table.lines().collect::<Vec<_>>().join(&format!("\n{}", continuation));

    format!("{}{}{}", &markdown[..pos], body, &markdown[pos + marker.len()..])
}

/// Rows owned by `table`, leaving out rows of tables nested in its cells.
fn own_rows<'a>(table: &Element<'a>) -> Vec<Element<'a>> {
    table
        .children()
        .into_iter()
        .flat_map(|child| match child.tag_name().as_str() {
            "tr" => vec![child],
            "thead" | "tbody" | "tfoot" => child.children().into_iter().filter(|row| row.tag_name() == "tr").collect(),
            _ => Vec::new(),
        })
        .collect()
}

/// Renders a table as a GFM pipe table; the first row is the header.
fn render_table(table: &Element<'_>, converter: &HtmlToMarkdown) -> Result<String> {
    let mut rows: Vec<Vec<String>> = Vec::new();

    for row in own_rows(table) {
        let cells = row
            .children()
            .iter()
            .filter(|cell| matches!(cell.tag_name().as_str(), "th" | "td"))
            .map(|cell| render_cell(cell, converter))
            .collect::<Result<Vec<_>>>()?;
        if !cells.is_empty() {
            rows.push(cells);
        }
    }

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if width == 0 {
        return Ok(String::new());
    }

    let line = |cells: &[String]| {
        let padded = (0..width).map(|i| cells.get(i).map(String::as_str).unwrap_or(""));
        format!("| {} |", padded.collect::<Vec<_>>().join(" | "))
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(line(&rows[0]));
    lines.push(format!("|{}", " --- |".repeat(width)));
    lines.extend(rows[1..].iter().map(|row| line(row)));

    Ok(lines.join("\n"))
}

/// Renders one cell on a single line. Nested tables flatten to their text.
fn render_cell(cell: &Element<'_>, converter: &HtmlToMarkdown) -> Result<String> {
    let markdown = if cell.select("table")?.is_empty() {
        converter
            .convert(&cell.inner_html())
            .map_err(|e| ExtractError::Conversion(e.to_string()))?
    } else {
        cell.text()
    };

    Ok(markdown.split_whitespace().collect::<Vec<_>>().join(" ").replace('|', "\\|"))
}
