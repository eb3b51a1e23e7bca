use crate::Document;

/// Flat page metadata read from standard, OpenGraph and Twitter tags.
///
/// Every field is independently optional. Absent fields are left out of the
/// serialized front-matter entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaData {
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub author: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub og_image: Option<String>,
    pub twitter_title: Option<String>,
    pub twitter_description: Option<String>,
    pub twitter_image: Option<String>,
    pub canonical: Option<String>,
}

impl MetaData {
    /// Returns `true` when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == MetaData::default()
    }

    /// Serializes to the YAML-like front-matter block.
    ///
    /// Field order is fixed: `title`, `description`, `keywords`, `author`,
    /// then the `og:` block, the `twitter:` block and `canonical`. Nested
    /// blocks are emitted only when at least one of their sub-fields is set.
    /// Lines are joined with `\n` and there is no trailing newline, so an
    /// empty record serializes to an empty string.
    pub fn to_yaml(&self) -> String {
        let mut lines = Vec::new();

        push_scalar(&mut lines, "title", &self.title, "");
        push_scalar(&mut lines, "description", &self.description, "");
        push_scalar(&mut lines, "keywords", &self.keywords, "");
        push_scalar(&mut lines, "author", &self.author, "");

        push_block(
            &mut lines,
            "og",
            &[("title", &self.og_title), ("description", &self.og_description), ("image", &self.og_image)],
        );
        push_block(
            &mut lines,
            "twitter",
            &[
                ("title", &self.twitter_title),
                ("description", &self.twitter_description),
                ("image", &self.twitter_image),
            ],
        );

        push_scalar(&mut lines, "canonical", &self.canonical, "");

        lines.join("\n")
    }
}

fn push_scalar(lines: &mut Vec<String>, key: &str, value: &Option<String>, indent: &str) {
    if let Some(value) = value {
        lines.push(format!("{}{}: {}", indent, key, single_line(value)));
    }
}

fn push_block(lines: &mut Vec<String>, name: &str, fields: &[(&str, &Option<String>)]) {
    if fields.iter().all(|(_, value)| value.is_none()) {
        return;
    }

    lines.push(format!("{}:", name));
    for (key, value) in fields {
        push_scalar(lines, key, value, "  ");
    }
}

/// Collapses line breaks so a value never spills onto a second YAML line.
fn single_line(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl Document {
    /// Extracts all metadata fields.
    ///
    /// Each lookup is independent; a missing tag only leaves its own field empty.
    pub fn extract_metadata(&self) -> MetaData {
        MetaData {
            title: self.title().or_else(|| self.get_meta_content("title")),
            description: self.get_meta_content("description"),
            keywords: self.get_meta_content("keywords"),
            author: self.get_meta_content("author"),
            og_title: self.get_meta_content("og:title"),
            og_description: self.get_meta_content("og:description"),
            og_image: self.get_meta_content("og:image"),
            twitter_title: self.get_meta_content("twitter:title"),
            twitter_description: self.get_meta_content("twitter:description"),
            twitter_image: self.get_meta_content("twitter:image"),
            canonical: self.extract_canonical(),
        }
    }

    /// Gets the `href` of `<link rel="canonical">`.
    pub fn extract_canonical(&self) -> Option<String> {
        self.select_first(r#"link[rel="canonical"]"#)
            .ok()
            .flatten()
            .and_then(|el| el.attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .map(str::to_string)
    }

    /// Get meta tag content by property or name attribute
    fn get_meta_content(&self, attr: &str) -> Option<String> {
        for attribute in ["property", "name"] {
            let selector = format!("meta[{}=\"{}\"]", attribute, attr);
            if let Ok(Some(el)) = self.select_first(&selector)
                && let Some(content) = el.attr("content")
            {
                let content = content.trim();
                if !content.is_empty() {
                    return Some(content.to_string());
                }
            }
        }

        None
    }
}
