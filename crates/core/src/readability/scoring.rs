use std::sync::LazyLock;

use regex::Regex;

use crate::parse::Element;

use super::preprocess::POSITIVE_RE;

static NEGATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(banner|breadcrumbs?|combx|comment|community|disqus|extra|foot|header|menu|related|remark|rss|shoutbox|sidebar|sponsor|ad-break|agegate|pagination|pager|popup|share|social|widget)",
    )
    .expect("NEGATIVE_RE should compile")
});

/// Weights for the content scoring heuristics
#[derive(Debug, Clone)]
pub struct ScoreConfig {
    /// Weight for positive class/ID patterns
    pub positive_weight: f64,
    /// Weight for negative class/ID patterns
    pub negative_weight: f64,
    /// Maximum content density score from character count
    pub max_char_density_score: f64,
    /// Maximum content density score from comma count
    pub max_comma_density_score: f64,
    /// Characters per point for content density scoring
    pub chars_per_point: usize,
    /// Points per direct `<p>` child
    pub paragraph_weight: f64,
    /// Maximum score from direct `<p>` children
    pub max_paragraph_score: f64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            positive_weight: 25.0,
            negative_weight: -25.0,
            max_char_density_score: 3.0,
            max_comma_density_score: 3.0,
            chars_per_point: 100,
            paragraph_weight: 2.0,
            max_paragraph_score: 10.0,
        }
    }
}

/// Breakdown of an element's score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    /// Base score from tag type
    pub base_score: f64,
    /// Weight adjustment from class/ID patterns
    pub class_weight: f64,
    /// Content density score
    pub content_density: f64,
    /// Bonus from direct paragraph children
    pub paragraph_score: f64,
    /// Link density (0.0 to 1.0)
    pub link_density: f64,
    /// Final calculated score
    pub final_score: f64,
}

/// Base score for an element by tag name
///
/// Containers that usually hold prose score highest; lists, headings and
/// navigation chrome are penalized.
pub fn base_tag_score(element: &Element<'_>) -> f64 {
    match element.tag_name().as_str() {
        "article" => 10.0,
        "section" | "main" => 8.0,
        "div" => 5.0,
        "td" | "blockquote" => 3.0,
        "pre" => 0.0,
        "form" => -3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" | "header" | "footer" | "nav" | "aside" => -5.0,
        _ => 0.0,
    }
}

/// Class/ID weight adjustment for an element
///
/// The id is checked before the class list; the first token that matches
/// either pattern decides, and positive wins over negative for that token.
pub fn class_id_weight(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    let tokens = element
        .attr("id")
        .into_iter()
        .chain(element.attr("class").into_iter().flat_map(str::split_whitespace));

    for token in tokens {
        if POSITIVE_RE.is_match(token) {
            return config.positive_weight;
        }
        if NEGATIVE_RE.is_match(token) {
            return config.negative_weight;
        }
    }

    0.0
}

/// Content density from text length and comma count
pub fn content_density_score(text: &str, config: &ScoreConfig) -> f64 {
    let char_score = ((text.chars().count() / config.chars_per_point) as f64).min(config.max_char_density_score);
    let comma_score = (text.matches([',', '，']).count() as f64).min(config.max_comma_density_score);

    char_score + comma_score
}

/// Bonus for direct `<p>` children with real text
pub fn paragraph_score(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    let paragraphs = element
        .children()
        .iter()
        .filter(|child| child.tag_name() == "p" && child.text().trim().chars().count() >= 25)
        .count();

    (paragraphs as f64 * config.paragraph_weight).min(config.max_paragraph_score)
}

/// Ratio of link text to all text, from 0.0 (no links) to 1.0 (all links)
pub fn link_density(element: &Element<'_>) -> f64 {
    let text_length = element.text().chars().count();
    if text_length == 0 {
        return 0.0;
    }

    let link_text_length = element
        .select("a")
        .unwrap_or_default()
        .iter()
        .map(|link| link.text().chars().count())
        .sum::<usize>();

    (link_text_length as f64 / text_length as f64).min(1.0)
}

/// Heuristic for `<pre>` blocks that hold source code rather than prose
fn looks_like_code(tag_name: &str, text: &str) -> bool {
    if tag_name != "pre" || text.len() <= 50 {
        return false;
    }

    let len = text.len() as f64;
    let comma_ratio = text.matches(',').count() as f64 / len;
    let space_ratio = text.matches(' ').count() as f64 / len;
    let special_ratio = text.chars().filter(|c| !c.is_alphanumeric() && !c.is_whitespace()).count() as f64 / len;

    special_ratio > 0.15 && comma_ratio < 0.01 && space_ratio < 0.15
}

/// Final score for an element
///
/// `(base + class weight + density + paragraphs - code penalty) * link penalty`.
/// The link penalty is halved for elements with a positive class/ID or more
/// than 500 characters of text.
pub fn calculate_score(element: &Element<'_>, config: &ScoreConfig) -> ScoreResult {
    let tag_name = element.tag_name();
    let text = element.text();

    let base_score = base_tag_score(element);
    let class_weight = class_id_weight(element, config);
    let content_density = content_density_score(&text, config);
    let paragraph_score = paragraph_score(element, config);
    let link_density = link_density(element);

    let code_penalty = if looks_like_code(&tag_name, &text) { -10.0 } else { 0.0 };
    let lenient = class_weight > 0.0 || text.chars().count() > 500;
    let link_penalty = if lenient { 1.0 - link_density * 0.5 } else { 1.0 - link_density };

    let final_score = (base_score + class_weight + content_density + paragraph_score + code_penalty) * link_penalty;

    ScoreResult { base_score, class_weight, content_density, paragraph_score, link_density, final_score }
}
