//! The independent retrieval strategies.
//!
//! Each strategy scores a single node against a [`PreparedQuery`] and
//! returns `None` when the node does not match. Strategies never look at
//! the graph and never mutate anything.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use mnemos_config::QueryConfig;
use mnemos_embed::Embedder;
use regex::Regex;
use serde::Serialize;

use super::QueryContext;
use crate::classifier::contains_word;
use crate::types::{MemoryLayer, MemoryNode};

// ─────────────────────────────────────────────────────────────────────────────
// Structural patterns
// ─────────────────────────────────────────────────────────────────────────────

/// Coarse shape of a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralPattern {
    Code,
    List,
    Question,
    Command,
    Error,
}

static LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.|[-*]\s").expect("valid list regex"));
static COMMAND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*[a-zA-Z_][a-zA-Z0-9_]*\s*\(").expect("valid command regex")
});

const CODE_MARKERS: &[&str] = &["def ", "class ", "import "];
const QUESTION_OPENERS: &[&str] = &["what", "how", "why", "when", "where"];
const ERROR_MARKERS: &[&str] = &["error", "exception", "failed"];

/// Detect the structural patterns present in `text`.
pub fn structural_patterns(text: &str) -> BTreeSet<StructuralPattern> {
    let mut patterns = BTreeSet::new();
    let lower = text.to_lowercase();

    if CODE_MARKERS.iter().any(|m| text.contains(m)) {
        patterns.insert(StructuralPattern::Code);
    }
    if LIST_RE.is_match(text) {
        patterns.insert(StructuralPattern::List);
    }
    let opener = lower.trim_start();
    if text.contains('?') || QUESTION_OPENERS.iter().any(|q| opener.starts_with(q)) {
        patterns.insert(StructuralPattern::Question);
    }
    if COMMAND_RE.is_match(text) {
        patterns.insert(StructuralPattern::Command);
    }
    if ERROR_MARKERS.iter().any(|m| lower.contains(m)) {
        patterns.insert(StructuralPattern::Error);
    }
    patterns
}

// ─────────────────────────────────────────────────────────────────────────────
// Goal keywords
// ─────────────────────────────────────────────────────────────────────────────

const GOAL_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "debugging",
        &["error", "bug", "fix", "debug", "issue", "problem", "troubleshoot"],
    ),
    (
        "optimization",
        &["performance", "speed", "efficiency", "optimize", "improve", "faster"],
    ),
    (
        "learning",
        &["learn", "understand", "study", "research", "explore", "discover"],
    ),
    (
        "creation",
        &["create", "build", "develop", "implement", "design", "construct"],
    ),
    (
        "analysis",
        &["analyze", "examine", "investigate", "review", "assess", "evaluate"],
    ),
    (
        "testing",
        &["test", "verify", "validate", "check", "ensure", "confirm"],
    ),
];

/// Keyword list for a goal type. An unknown goal is its own single keyword.
pub fn goal_keywords(goal: &str) -> Vec<String> {
    let goal = goal.trim().to_lowercase();
    GOAL_KEYWORDS
        .iter()
        .find(|(name, _)| *name == goal)
        .map(|(_, words)| words.iter().map(|w| w.to_string()).collect())
        .unwrap_or_else(|| if goal.is_empty() { Vec::new() } else { vec![goal] })
}

// ─────────────────────────────────────────────────────────────────────────────
// Prepared query
// ─────────────────────────────────────────────────────────────────────────────

/// Everything derived from a [`QueryContext`] once per search.
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    pub query_lower: String,
    pub tokens: BTreeSet<String>,
    pub tags_lower: Vec<String>,
    pub goal_keywords: Vec<String>,
    pub patterns: BTreeSet<StructuralPattern>,
    pub include_emotional: bool,
    pub embedding: Option<Vec<f32>>,
}

impl PreparedQuery {
    pub fn new(ctx: &QueryContext) -> Self {
        let query_lower = ctx.query.trim().to_lowercase();
        Self {
            tokens: tokenize(&query_lower),
            tags_lower: ctx.tags.iter().map(|t| t.trim().to_lowercase()).collect(),
            goal_keywords: ctx.goal.as_deref().map(goal_keywords).unwrap_or_default(),
            patterns: structural_patterns(ctx.query.trim()),
            include_emotional: ctx.include_emotional,
            embedding: None,
            query_lower,
        }
    }

    /// Attach the query embedding used by semantic scoring.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

fn tokenize(text_lower: &str) -> BTreeSet<String> {
    text_lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f32 / union as f32
}

/// A single- or multi-word phrase occurring in lowercase text.
fn mentions(text_lower: &str, phrase: &str) -> bool {
    let phrase = phrase.trim().to_lowercase();
    if phrase.is_empty() {
        return false;
    }
    if phrase.contains(|c: char| !c.is_alphanumeric()) {
        text_lower.contains(&phrase)
    } else {
        contains_word(text_lower, &phrase)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Strategies
// ─────────────────────────────────────────────────────────────────────────────

/// Textual relevance: the best of exact substring, tag mention, category
/// mention and token overlap.
pub fn content_score(q: &PreparedQuery, node: &MemoryNode, config: &QueryConfig) -> Option<f32> {
    if q.query_lower.is_empty() {
        return None;
    }
    let content_lower = node.content.to_lowercase();
    let mut score = jaccard(&q.tokens, &tokenize(&content_lower));

    if content_lower.contains(&q.query_lower) {
        score = score.max(config.substring_score);
    }
    if node.tags.iter().any(|t| mentions(&q.query_lower, t)) {
        score = score.max(config.tag_match_score);
    }
    if node.categories().any(|c| mentions(&q.query_lower, c)) {
        score = score.max(config.category_match_score);
    }

    (score > config.min_content_score).then_some(score)
}

/// Embedding similarity, boosted for episodic nodes.
pub fn semantic_score(
    q: &PreparedQuery,
    node: &MemoryNode,
    embedder: &dyn Embedder,
    config: &QueryConfig,
) -> Option<f32> {
    let query = q.embedding.as_deref()?;
    let vector = node.embedding.as_deref()?;
    let similarity = embedder.similarity(query, vector).clamp(0.0, 1.0);
    if similarity <= config.semantic_similarity {
        return None;
    }
    if node.metadata.layer == MemoryLayer::Episodic {
        Some(similarity * config.episodic_boost)
    } else {
        Some(similarity)
    }
}

/// Fraction of the requested tags the node carries.
pub fn tag_score(q: &PreparedQuery, node: &MemoryNode) -> Option<f32> {
    if q.tags_lower.is_empty() {
        return None;
    }
    let matched = q.tags_lower.iter().filter(|t| node.has_tag(t)).count();
    (matched > 0).then(|| matched as f32 / q.tags_lower.len() as f32)
}

/// Fraction of the goal's keywords found in the content.
pub fn goal_score(q: &PreparedQuery, node: &MemoryNode, config: &QueryConfig) -> Option<f32> {
    if q.goal_keywords.is_empty() {
        return None;
    }
    let content_lower = node.content.to_lowercase();
    let matched = q
        .goal_keywords
        .iter()
        .filter(|k| content_lower.contains(k.as_str()))
        .count();
    let fraction = matched as f32 / q.goal_keywords.len() as f32;
    (fraction > config.min_goal_fraction).then_some(fraction)
}

/// Similarity of structural pattern sets.
pub fn structural_score(q: &PreparedQuery, node: &MemoryNode, config: &QueryConfig) -> Option<f32> {
    if q.patterns.is_empty() {
        return None;
    }
    let score = jaccard(&q.patterns, &structural_patterns(&node.content));
    (score > config.min_structural_score).then_some(score)
}

/// High-significance nodes, scored by their weight.
pub fn emotional_score(q: &PreparedQuery, node: &MemoryNode, config: &QueryConfig) -> Option<f32> {
    if !q.include_emotional {
        return None;
    }
    let weight = node.metadata.emotional_weight;
    (weight > config.emotional_significance).then_some(weight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawMemory;
    use chrono::Utc;
    use mnemos_embed::MockEmbedder;

    fn node(raw: RawMemory) -> MemoryNode {
        MemoryNode::from_raw(raw, Utc::now(), 0.1)
    }

    fn prepared(query: &str) -> PreparedQuery {
        PreparedQuery::new(&QueryContext::new(query))
    }

    #[test]
    fn test_structural_patterns() {
        let p = structural_patterns("def main():\n    import os");
        assert!(p.contains(&StructuralPattern::Code));

        let p = structural_patterns("How do I fix this?");
        assert_eq!(p.iter().copied().collect::<Vec<_>>(), vec![StructuralPattern::Question]);

        let p = structural_patterns("1. install\n- run tests");
        assert!(p.contains(&StructuralPattern::List));

        let p = structural_patterns("connect(db) failed with Exception");
        assert!(p.contains(&StructuralPattern::Command));
        assert!(p.contains(&StructuralPattern::Error));

        assert!(structural_patterns("plain words").is_empty());
    }

    #[test]
    fn test_goal_keywords() {
        assert_eq!(goal_keywords("Debugging").len(), 7);
        assert_eq!(goal_keywords("deploy"), vec!["deploy"]);
        assert!(goal_keywords("  ").is_empty());
    }

    #[test]
    fn test_content_substring_beats_overlap() {
        let config = QueryConfig::default();
        let n = node(RawMemory::new("Use cargo nextest for faster test runs"));
        assert_eq!(content_score(&prepared("cargo nextest"), &n, &config), Some(0.8));
        assert!(content_score(&prepared("zebra"), &n, &config).is_none());
        assert!(content_score(&prepared(""), &n, &config).is_none());
    }

    #[test]
    fn test_content_tag_and_category_mentions() {
        let config = QueryConfig::default();
        let mut n = node(RawMemory::new("component rerenders").with_tag("react"));
        assert_eq!(content_score(&prepared("react hooks"), &n, &config), Some(0.6));

        n.tags.clear();
        n.metadata.topic_categories = vec!["Frontend".to_string()];
        assert_eq!(content_score(&prepared("frontend perf"), &n, &config), Some(0.4));
    }

    #[test]
    fn test_content_token_overlap() {
        let config = QueryConfig::default();
        let n = node(RawMemory::new("Python function to calculate fibonacci"));
        let score = content_score(&prepared("fibonacci performance"), &n, &config).unwrap();
        assert!((score - 1.0 / 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_tag_fraction() {
        let n = node(RawMemory::new("x").with_tags(["Rust", "async"]));
        let ctx = QueryContext::new("q").with_tags(["rust", "tokio"]);
        assert_eq!(tag_score(&PreparedQuery::new(&ctx), &n), Some(0.5));
        assert!(tag_score(&prepared("q"), &n).is_none());
    }

    #[test]
    fn test_goal_fraction_threshold() {
        let config = QueryConfig::default();
        let ctx = QueryContext::new("q").with_goal("debugging");
        let q = PreparedQuery::new(&ctx);

        let hit = node(RawMemory::new("fix the bug behind this error"));
        let score = goal_score(&q, &hit, &config).unwrap();
        assert!((score - 3.0 / 7.0).abs() < 1e-6);

        // one keyword out of seven is below the minimum fraction
        let weak = node(RawMemory::new("a small fix"));
        assert!(goal_score(&q, &weak, &config).is_none());
    }

    #[test]
    fn test_structural_similarity() {
        let config = QueryConfig::default();
        let q = prepared("why does it fail with error?");
        let n = node(RawMemory::new("what is this error?"));
        assert_eq!(structural_score(&q, &n, &config), Some(1.0));
        let plain = node(RawMemory::new("plain note"));
        assert!(structural_score(&q, &plain, &config).is_none());
    }

    #[test]
    fn test_emotional_surfaces_heavy_nodes() {
        let config = QueryConfig::default();
        let mut n = node(RawMemory::new("anything"));
        n.metadata.emotional_weight = 0.9;
        assert_eq!(emotional_score(&prepared("unrelated"), &n, &config), Some(0.9));

        let ctx = QueryContext::new("unrelated").with_emotional(false);
        assert!(emotional_score(&PreparedQuery::new(&ctx), &n, &config).is_none());

        n.metadata.emotional_weight = 0.7;
        assert!(emotional_score(&prepared("unrelated"), &n, &config).is_none());
    }

    #[tokio::test]
    async fn test_semantic_episodic_boost() {
        let config = QueryConfig::default();
        let embedder = MockEmbedder::new(256);
        let text = "deploy went wrong on friday";
        let vector = embedder.embed(text).await.unwrap();
        let q = prepared(text).with_embedding(vector.clone());

        let mut n = node(RawMemory::new(text));
        assert!(semantic_score(&q, &n, &embedder, &config).is_none());

        n.embedding = Some(vector);
        let plain = semantic_score(&q, &n, &embedder, &config).unwrap();
        n.metadata.layer = MemoryLayer::Episodic;
        let boosted = semantic_score(&q, &n, &embedder, &config).unwrap();
        assert!((boosted - plain * 1.2).abs() < 1e-4);
    }
}
