//! InfoQ China articles (`infoq.cn/article/<uuid>`).
//!
//! The article page is a client-rendered shell. The body comes from a detail
//! API that returns a `content_url`; when that resource is JSON it holds a
//! rich-text node tree which is rendered to HTML here. Metadata is always
//! read from the original page.

use async_trait::async_trait;
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use url::Url;

use crate::fetch::{FetchRequest, fetch_ok};
use crate::parse::Document;
use crate::strategy::{CleanContext, CleanResult, CleaningStrategy};
use crate::{ExtractError, Result};

const DETAIL_API: &str = "https://www.infoq.cn/public/v1/article/getDetail";

#[derive(Debug, Deserialize)]
struct DetailResponse {
    data: Option<DetailData>,
}

#[derive(Debug, Deserialize)]
struct DetailData {
    content_url: Option<String>,
}

/// One node of the rich-text tree.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RichNode {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub attrs: Option<Map<String, Value>>,
    #[serde(default)]
    pub content: Option<Vec<RichNode>>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub marks: Option<Vec<RichMark>>,
}

/// An inline mark on a text node.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RichMark {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub attrs: Option<Map<String, Value>>,
}

/// Extracts the article uuid from an `/article/<uuid>` path.
pub fn article_hash(url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    while let Some(segment) = segments.next() {
        if segment == "article" {
            return segments.next().map(str::to_string);
        }
    }
    None
}

/// Cleaner for InfoQ articles.
#[derive(Debug, Clone, Copy, Default)]
pub struct InfoQCleaner;

#[async_trait]
impl CleaningStrategy for InfoQCleaner {
    fn name(&self) -> &'static str {
        "infoq"
    }

    fn matches(&self, url: &Url) -> bool {
        url.host_str().is_some_and(|host| host == "infoq.cn" || host.ends_with(".infoq.cn"))
    }

    async fn clean(&self, ctx: CleanContext<'_>) -> Result<CleanResult> {
        let metadata = Document::parse_with_url(ctx.html, Some(ctx.url.clone()))?.extract_metadata();

        let hash = article_hash(ctx.url)
            .ok_or_else(|| ExtractError::content_not_found(self.name(), "no article id in URL path"))?;

        tracing::debug!(url = DETAIL_API, uuid = %hash, "fetching infoq article detail");
        let request = FetchRequest::post_json(DETAIL_API, &json!({ "uuid": hash }))
            .header("Referer", ctx.url.as_str())
            .header("Origin", "https://www.infoq.cn");
        let detail: DetailResponse = fetch_ok(ctx.client, request).await?.json(DETAIL_API)?;

        let content_url = detail
            .data
            .and_then(|data| data.content_url)
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ExtractError::content_not_found(self.name(), "detail API returned no content_url"))?;

        tracing::debug!(url = %content_url, "fetching infoq article content");
        let response = fetch_ok(ctx.client, FetchRequest::get(&content_url)).await?;

        let content = if is_json_resource(&content_url) {
            let tree: RichNode = response.json(&content_url)?;
            format!("<html><body>{}</body></html>", render_node(&tree))
        } else {
            response.text()
        };

        Ok(CleanResult::html(content, metadata))
    }
}

fn is_json_resource(content_url: &str) -> bool {
    let path = Url::parse(content_url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| content_url.split(['?', '#']).next().unwrap_or_default().to_string());
    path.to_lowercase().ends_with(".json")
}

/// Maps the spellings seen in payloads onto one canonical node type.
fn normalize_kind(kind: &str) -> String {
    let folded = kind.chars().filter(|c| *c != '_' && *c != '-').collect::<String>().to_lowercase();
    let canonical = match folded.as_str() {
        "listitem" => "listItem",
        "bulletlist" | "bulletedlist" | "unorderedlist" => "bulletList",
        "orderedlist" | "numberedlist" => "orderedList",
        "codeblock" => "codeBlock",
        "hardbreak" => "hardBreak",
        "horizontalrule" => "horizontalRule",
        "blockquote" => "blockquote",
        "paragraph" => "paragraph",
        "heading" => "heading",
        "image" => "image",
        "text" => "text",
        "doc" => "doc",
        _ => return kind.to_string(),
    };
    canonical.to_string()
}

fn attr<'a>(attrs: &'a Option<Map<String, Value>>, key: &str) -> Option<&'a Value> {
    attrs.as_ref()?.get(key)
}

fn attr_str<'a>(attrs: &'a Option<Map<String, Value>>, key: &str) -> Option<&'a str> {
    attr(attrs, key)?.as_str().map(str::trim).filter(|s| !s.is_empty())
}

fn render_children(node: &RichNode) -> String {
    node.content.iter().flatten().map(render_node).collect()
}

/// Renders a rich-text node and its children to HTML.
pub fn render_node(node: &RichNode) -> String {
    match normalize_kind(&node.kind).as_str() {
        "text" => render_text(node),
        "paragraph" => format!("<p>{}</p>", render_children(node)),
        "heading" => {
            let level = attr(&node.attrs, "level").and_then(Value::as_u64).unwrap_or(2).clamp(1, 6);
            format!("<h{level}>{}</h{level}>", render_children(node))
        }
        "blockquote" => format!("<blockquote>{}</blockquote>", render_children(node)),
        "bulletList" => format!("<ul>{}</ul>", render_children(node)),
        "orderedList" => format!("<ol>{}</ol>", render_children(node)),
        "listItem" => format!("<li>{}</li>", render_children(node)),
        "codeBlock" => {
            let code: String = node.content.iter().flatten().filter_map(|n| n.text.as_deref()).collect();
            let language = attr_str(&node.attrs, "lang").or_else(|| attr_str(&node.attrs, "language"));
            format!("<pre>{}</pre>", crate::markdown::code_element(&code, language))
        }
        "image" => match attr_str(&node.attrs, "src") {
            Some(src) => {
                let alt = attr_str(&node.attrs, "alt").unwrap_or_default();
                format!(
                    r#"<img src="{}" alt="{}">"#,
                    encode_double_quoted_attribute(src),
                    encode_double_quoted_attribute(alt)
                )
            }
            None => String::new(),
        },
        "hardBreak" => "<br>".to_string(),
        "horizontalRule" => "<hr>".to_string(),
        _ => render_children(node),
    }
}

fn render_text(node: &RichNode) -> String {
    let mut html = encode_text(node.text.as_deref().unwrap_or_default()).into_owned();

    for mark in node.marks.iter().flatten() {
        html = match mark.kind.to_lowercase().as_str() {
            "bold" | "strong" => format!("<strong>{}</strong>", html),
            "italic" | "em" => format!("<em>{}</em>", html),
            "code" => format!("<code>{}</code>", html),
            "strike" | "strikethrough" => format!("<del>{}</del>", html),
            "link" => match attr_str(&mark.attrs, "href") {
                Some(href) => format!(r#"<a href="{}">{}</a>"#, encode_double_quoted_attribute(href), html),
                None => html,
            },
            _ => html,
        };
    }

    html
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(json: &str) -> RichNode {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_article_hash() {
        let hash = |s: &str| article_hash(&Url::parse(s).unwrap());
        assert_eq!(hash("https://www.infoq.cn/article/aBc123XyZ"), Some("aBc123XyZ".to_string()));
        assert_eq!(hash("https://www.infoq.cn/article/aBc123XyZ/?utm=1"), Some("aBc123XyZ".to_string()));
        assert_eq!(hash("https://www.infoq.cn/news/aBc123XyZ"), None);
        assert_eq!(hash("https://www.infoq.cn/article/"), None);
    }

    #[test]
    fn test_matches_infoq_hosts() {
        let matches = |s: &str| InfoQCleaner.matches(&Url::parse(s).unwrap());
        assert!(matches("https://www.infoq.cn/article/x"));
        assert!(matches("https://infoq.cn/article/x"));
        assert!(!matches("https://www.infoq.com/articles/x"));
        assert!(!matches("https://notinfoq.cn/article/x"));
    }

    #[test]
    fn test_json_resource_detection() {
        assert!(is_json_resource("https://static001.infoq.cn/resource/a.json"));
        assert!(is_json_resource("https://static001.infoq.cn/resource/a.JSON?v=2"));
        assert!(!is_json_resource("https://static001.infoq.cn/resource/a.html"));
    }

    #[test]
    fn test_normalize_kind() {
        assert_eq!(normalize_kind("listitem"), "listItem");
        assert_eq!(normalize_kind("bullet_list"), "bulletList");
        assert_eq!(normalize_kind("CodeBlock"), "codeBlock");
        assert_eq!(normalize_kind("mystery"), "mystery");
    }

    #[test]
    fn test_render_tree() {
        let tree = node(
            r#"{"type":"doc","content":[
                {"type":"heading","attrs":{"level":2},"content":[{"type":"text","text":"Intro"}]},
                {"type":"paragraph","content":[
                    {"type":"text","text":"Read "},
                    {"type":"text","text":"this","marks":[{"type":"bold"},{"type":"link","attrs":{"href":"https://example.com/"}}]},
                    {"type":"text","text":" & more"}
                ]},
                {"type":"bulletedlist","content":[
                    {"type":"listitem","content":[{"type":"paragraph","content":[{"type":"text","text":"one"}]}]}
                ]},
                {"type":"orderedlist","content":[{"type":"listitem","content":[{"type":"text","text":"first"}]}]},
                {"type":"blockquote","content":[{"type":"paragraph","content":[{"type":"text","text":"quoted"}]}]},
                {"type":"image","attrs":{"src":"https://static001.infoq.cn/a.png","alt":"chart"}},
                {"type":"codeblock","attrs":{"lang":"java"},"content":[{"type":"text","text":"int a = 1 < 2;"}]}
            ]}"#,
        );

        let html = render_node(&tree);
        assert!(html.starts_with("<h2>Intro</h2>"));
        assert!(html.contains(r#"<p>Read <a href="https://example.com/"><strong>this</strong></a> &amp; more</p>"#));
        assert!(html.contains("<ul><li><p>one</p></li></ul>"));
        assert!(html.contains("<ol><li>first</li></ol>"));
        assert!(html.contains("<blockquote><p>quoted</p></blockquote>"));
        assert!(html.contains(r#"<img src="https://static001.infoq.cn/a.png" alt="chart">"#));
        assert!(html.contains(r#"<pre><code class="language-java">int a = 1 &lt; 2;</code></pre>"#));
    }

    #[test]
    fn test_render_escapes_attributes_and_text() {
        let image = node(r#"{"type":"image","attrs":{"src":"https://a.example/x.png?a=1&b=2","alt":"say \"hi\""}}"#);
        assert_eq!(
            render_node(&image),
            r#"<img src="https://a.example/x.png?a=1&amp;b=2" alt="say &quot;hi&quot;">"#
        );

        let text = node(r#"{"type":"text","text":"<b>","marks":[{"type":"link","attrs":{"href":"https://a.example/\"x"}}]}"#);
        assert_eq!(render_node(&text), r#"<a href="https://a.example/&quot;x">&lt;b&gt;</a>"#);
    }

    #[test]
    fn test_render_tolerates_nulls() {
        let tree = node(r#"{"type":"paragraph","attrs":null,"content":null,"marks":null}"#);
        assert_eq!(render_node(&tree), "<p></p>");

        let text = node(r#"{"type":"text","text":"x","marks":[{"type":"italic","attrs":null},{"type":"code"}]}"#);
        assert_eq!(render_node(&text), "<code><em>x</em></code>");
    }
}
