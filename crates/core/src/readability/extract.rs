use std::cmp::Ordering;
use std::collections::HashMap;

use super::dom_tree::DomTree;
use super::postprocess::{PostProcessConfig, postprocess_html};
use super::scoring::{ScoreConfig, ScoreResult, calculate_score, link_density};
use crate::config::ReadabilityConfig;
use crate::parse::{Document, Element};
use crate::{ExtractError, Result};

/// Tags that are considered potential content containers
const CANDIDATE_TAGS: &[&str] = &["div", "article", "section", "main", "p", "td", "pre", "blockquote"];

/// Ancestors that never become candidates through propagation
const PROPAGATION_STOP_TAGS: &[&str] = &["html", "body", "head"];

/// Sibling score threshold as a fraction of the top score
const SIBLING_THRESHOLD: f64 = 0.2;

/// Other top candidates scoring at least this fraction of the top score are alternatives
const ALTERNATIVE_RATIO: f64 = 0.75;

/// Alternatives an ancestor of the top candidate must contain to replace it
const MIN_SHARED_ALTERNATIVES: usize = 3;

/// A candidate element with its score
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    /// Node ID in the [`DomTree`]
    pub node_id: usize,
    /// The element itself
    pub element: Element<'a>,
    /// The calculated score result
    pub score_result: ScoreResult,
}

impl<'a> Candidate<'a> {
    /// Get the final score of this candidate
    pub fn score(&self) -> f64 {
        self.score_result.final_score
    }
}

/// The result of content extraction
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    /// Cleaned HTML of the main content
    pub content: String,
    /// The top candidate score
    pub top_score: f64,
    /// Number of top-level elements extracted (top candidate plus siblings)
    pub element_count: usize,
}

/// Scores candidate blocks in document order.
fn identify_candidates<'a>(
    tree: &DomTree<'a>, config: &ReadabilityConfig, score_config: &ScoreConfig,
) -> Vec<Candidate<'a>> {
    let max_elements = if config.max_elems_to_parse == 0 { usize::MAX } else { config.max_elems_to_parse };
    let min_chars = config.char_threshold / 10;

    tree.iter()
        .filter(|(_, node)| CANDIDATE_TAGS.contains(&node.element.tag_name().as_str()))
        .take(max_elements)
        .filter(|(_, node)| {
            matches!(node.element.tag_name().as_str(), "article" | "section" | "main")
                || node.element.text().trim().chars().count() >= min_chars
        })
        .map(|(node_id, node)| Candidate {
            node_id,
            element: node.element.clone(),
            score_result: calculate_score(&node.element, score_config),
        })
        .collect()
}

/// Propagates each candidate's score to its parent (1/2) and grandparent (1/3).
///
/// Ancestors that were not candidates yet are scored on their own first.
fn propagate_scores<'a>(candidates: &mut Vec<Candidate<'a>>, tree: &DomTree<'a>, score_config: &ScoreConfig) {
    let mut index: HashMap<usize, usize> = candidates.iter().enumerate().map(|(i, c)| (c.node_id, i)).collect();
    let originals: Vec<(usize, f64)> = candidates.iter().map(|c| (c.node_id, c.score())).collect();

    for (node_id, score) in originals {
        for (level, ancestor_id) in tree.ancestors(node_id).take(2).enumerate() {
            let Some(ancestor) = tree.get_node(ancestor_id) else {
                continue;
            };
            if PROPAGATION_STOP_TAGS.contains(&ancestor.element.tag_name().as_str()) {
                break;
            }

            let slot = *index.entry(ancestor_id).or_insert_with(|| {
                candidates.push(Candidate {
                    node_id: ancestor_id,
                    element: ancestor.element.clone(),
                    score_result: calculate_score(&ancestor.element, score_config),
                });
                candidates.len() - 1
            });

            candidates[slot].score_result.final_score += score / (level as f64 + 2.0);
        }
    }
}

/// Highest score first; ties go to container tags, then to longer text.
fn compare_candidates(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    b.score()
        .partial_cmp(&a.score())
        .unwrap_or(Ordering::Equal)
        .then_with(|| candidate_priority(&b.element.tag_name()).cmp(&candidate_priority(&a.element.tag_name())))
        .then_with(|| b.element.text().chars().count().cmp(&a.element.text().chars().count()))
        .then_with(|| a.node_id.cmp(&b.node_id))
}

fn candidate_priority(tag_name: &str) -> u8 {
    match tag_name {
        "article" | "main" | "section" => 3,
        "div" => 2,
        _ => 1,
    }
}

/// Picks the best candidate, or fails if none clears `min_score`.
fn select_top_candidate<'c, 'a>(candidates: &'c [Candidate<'a>], config: &ReadabilityConfig) -> Result<&'c Candidate<'a>> {
    let top = candidates.first().ok_or(ExtractError::NoContent)?;

    if top.score() < config.min_score {
        return Err(ExtractError::NotReadable { score: top.score(), threshold: config.min_score });
    }

    Ok(top)
}

/// Replaces `top` with its nearest ancestor that contains at least
/// [`MIN_SHARED_ALTERNATIVES`] of the other strong candidates.
///
/// Articles split into several equally scored blocks would otherwise lose
/// every block but one.
fn promote_shared_ancestor<'a>(
    top: &Candidate<'a>, candidates: &[Candidate<'a>], tree: &DomTree<'a>, scores: &HashMap<usize, f64>,
    score_config: &ScoreConfig,
) -> Candidate<'a> {
    let alternatives: Vec<usize> = candidates
        .iter()
        .filter(|c| c.node_id != top.node_id && c.score() >= top.score() * ALTERNATIVE_RATIO)
        .map(|c| c.node_id)
        .collect();
    if alternatives.len() < MIN_SHARED_ALTERNATIVES {
        return top.clone();
    }

    for ancestor_id in tree.ancestors(top.node_id) {
        let Some(ancestor) = tree.get_node(ancestor_id) else {
            break;
        };
        if PROPAGATION_STOP_TAGS.contains(&ancestor.element.tag_name().as_str()) {
            break;
        }

        let contained = alternatives
            .iter()
            .filter(|&&id| tree.ancestors(id).any(|a| a == ancestor_id))
            .count();
        if contained >= MIN_SHARED_ALTERNATIVES {
            let mut score_result = calculate_score(&ancestor.element, score_config);
            if let Some(&score) = scores.get(&ancestor_id) {
                score_result.final_score = score;
            }
            return Candidate { node_id: ancestor_id, element: ancestor.element.clone(), score_result };
        }
    }

    top.clone()
}

/// Collects the top candidate and qualifying siblings in document order.
///
/// A sibling qualifies when it scored at least a fifth of the top score, or
/// when it is a paragraph of more than 80 characters with low link density.
fn select_siblings<'a>(top: &Candidate<'a>, scores: &HashMap<usize, f64>, tree: &DomTree<'a>) -> Vec<Element<'a>> {
    let Some(parent) = tree.parent_of(top.node_id).and_then(|id| tree.get_node(id)) else {
        return vec![top.element.clone()];
    };

    let threshold = (top.score() * SIBLING_THRESHOLD).max(0.0);

    parent
        .child_ids
        .iter()
        .filter_map(|&id| {
            let node = tree.get_node(id)?;
            if id == top.node_id {
                return Some(node.element.clone());
            }

            let scored = scores.get(&id).is_some_and(|&score| score >= threshold);
            let prose = node.element.tag_name() == "p"
                && node.element.text().trim().chars().count() > 80
                && link_density(&node.element) < 0.25;

            (scored || prose).then(|| node.element.clone())
        })
        .collect()
}

/// Extracts the main content from a preprocessed document.
///
/// 1. Scores candidate blocks
/// 2. Propagates scores to ancestors
/// 3. Selects the top candidate, promoted to a shared ancestor when several
///    of the best `nb_top_candidates` sit under it
/// 4. Includes relevant siblings
/// 5. Post-processes the extracted content
///
/// # Errors
///
/// [`ExtractError::NoContent`] when nothing could be scored, and
/// [`ExtractError::NotReadable`] when the best score is below
/// [`ReadabilityConfig::min_score`].
pub fn extract_content(doc: &Document, config: &ReadabilityConfig) -> Result<ExtractedContent> {
    let score_config = ScoreConfig::default();
    let tree = DomTree::build(doc);

    let mut candidates = identify_candidates(&tree, config, &score_config);
    propagate_scores(&mut candidates, &tree, &score_config);

    let scores: HashMap<usize, f64> = candidates.iter().map(|c| (c.node_id, c.score())).collect();

    candidates.sort_by(compare_candidates);
    candidates.truncate(config.nb_top_candidates.max(1));

    let top = select_top_candidate(&candidates, config)?;
    let top = promote_shared_ancestor(top, &candidates, &tree, &scores, &score_config);
    tracing::debug!(
        tag = %top.element.tag_name(),
        score = top.score(),
        candidates = scores.len(),
        "readability top candidate"
    );

    let selected = select_siblings(&top, &scores, &tree);
    let joined = selected.iter().map(Element::outer_html).collect::<Vec<_>>().join("\n");

    let postprocess = PostProcessConfig {
        strip_images: !config.preserve_images,
        keep_classes: config.keep_classes,
        ..Default::default()
    };
    let content = postprocess_html(&joined, &postprocess)?;

    Ok(ExtractedContent { content, top_score: top.score(), element_count: selected.len() })
}
