//! Maps raw text and tags to taxonomy paths, a memory layer and an
//! emotional weight.
//!
//! Classification is a pure function of the input: classifying the same
//! content twice always yields the same result.

use crate::taxonomy::{SKILLS, TOPICS, Taxonomy};
use crate::types::{MemoryLayer, MemoryNode};

/// Weight every node starts from before keyword boosts.
const BASE_EMOTIONAL_WEIGHT: f32 = 0.5;

/// Keywords that raise the emotional weight, with their increments.
const PRIORITY_WORDS: &[(&str, f32)] = &[
    ("critical", 0.4),
    ("urgent", 0.4),
    ("important", 0.3),
    ("must", 0.3),
    ("need", 0.2),
    ("should", 0.1),
    ("error", 0.3),
    ("bug", 0.3),
    ("fix", 0.2),
    ("deadline", 0.3),
    ("asap", 0.4),
];

const LONG_CONTENT_CHARS: usize = 200;
const LONG_CONTENT_BONUS: f32 = 0.1;
const RICH_TAGS_COUNT: usize = 3;
const RICH_TAGS_BONUS: f32 = 0.1;

const PROCEDURAL_PHRASES: &[&str] = &["procedure", "how to", "step"];
const EPISODIC_PHRASES: &[&str] = &["remember", "happened"];
const EPISODIC_WORDS: &[&str] = &["did", "was", "were"];
const SEMANTIC_TYPES: &[&str] = &["fact", "preference"];

/// Output of one classification pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub topic_path: Vec<String>,
    pub skill_path: Vec<String>,
    pub topic_categories: Vec<String>,
    pub skill_categories: Vec<String>,
    pub context_categories: Vec<String>,
    pub layer: MemoryLayer,
    pub emotional_weight: f32,
}

impl Classification {
    /// Write paths, categories and weight into `node`. The layer is only
    /// written when `assign_layer` is set.
    pub fn apply(self, node: &mut MemoryNode, assign_layer: bool) {
        node.topic_path = self.topic_path;
        node.skill_path = self.skill_path;
        node.metadata.topic_categories = self.topic_categories;
        node.metadata.skill_categories = self.skill_categories;
        node.metadata.context_categories = self.context_categories;
        node.metadata.emotional_weight = self.emotional_weight;
        if assign_layer {
            node.metadata.layer = self.layer;
        }
    }
}

/// Stateless heuristic classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier;

impl Classifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify raw fields.
    pub fn classify(
        &self,
        content: &str,
        memory_type: &str,
        tags: &[String],
        project: &str,
    ) -> Classification {
        let content_lower = content.to_lowercase();
        let tags_lower: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();

        let (topic_path, topic_categories) = match_taxonomy(&TOPICS, &content_lower, &tags_lower);
        let (skill_path, skill_categories) = match_taxonomy(&SKILLS, &content_lower, &tags_lower);

        let mut context_categories = vec![project.to_string()];
        for tag in tags {
            if !context_categories.contains(tag) {
                context_categories.push(tag.clone());
            }
        }

        Classification {
            topic_path,
            skill_path,
            topic_categories,
            skill_categories,
            context_categories,
            layer: self.assign_layer(content, memory_type),
            emotional_weight: self.emotional_weight(content, tags.len()),
        }
    }

    /// Classify the immutable fields of an existing node.
    pub fn classify_node(&self, node: &MemoryNode) -> Classification {
        self.classify(&node.content, &node.memory_type, &node.tags, &node.project)
    }

    /// Layer heuristics, first match wins:
    /// task with "todo" ⇒ short-term; procedural phrasing ⇒ procedural;
    /// narrative phrasing ⇒ episodic; fact/preference or definitional
    /// phrasing ⇒ semantic; anything else ⇒ long-term.
    pub fn assign_layer(&self, content: &str, memory_type: &str) -> MemoryLayer {
        let content = content.to_lowercase();
        let memory_type = memory_type.trim().to_lowercase();

        if memory_type == "task" && content.contains("todo") {
            MemoryLayer::ShortTerm
        } else if is_procedural(&content) {
            MemoryLayer::Procedural
        } else if is_episodic(&content) {
            MemoryLayer::Episodic
        } else if SEMANTIC_TYPES.contains(&memory_type.as_str())
            || contains_word(&content, "is")
            || content.contains("define")
        {
            MemoryLayer::Semantic
        } else {
            MemoryLayer::LongTerm
        }
    }

    /// Target layer for a short-term node that earned promotion. Never
    /// returns short-term.
    pub fn promotion_layer(&self, content: &str) -> MemoryLayer {
        let content = content.to_lowercase();
        if is_procedural(&content) {
            MemoryLayer::Procedural
        } else if is_episodic(&content) {
            MemoryLayer::Episodic
        } else {
            MemoryLayer::LongTerm
        }
    }

    /// Priority-keyword score clamped to `[0, 1]`.
    pub fn emotional_weight(&self, content: &str, tag_count: usize) -> f32 {
        let lower = content.to_lowercase();
        let mut weight = BASE_EMOTIONAL_WEIGHT;
        for (word, boost) in PRIORITY_WORDS {
            if lower.contains(word) {
                weight += boost;
            }
        }
        if content.chars().count() > LONG_CONTENT_CHARS {
            weight += LONG_CONTENT_BONUS;
        }
        if tag_count > RICH_TAGS_COUNT {
            weight += RICH_TAGS_BONUS;
        }
        weight.clamp(0.0, 1.0)
    }
}

fn is_procedural(content_lower: &str) -> bool {
    PROCEDURAL_PHRASES.iter().any(|p| content_lower.contains(p))
}

fn is_episodic(content_lower: &str) -> bool {
    EPISODIC_PHRASES.iter().any(|p| content_lower.contains(p))
        || EPISODIC_WORDS.iter().any(|w| contains_word(content_lower, w))
}

/// Whole-word match; `text` must already be lowercase.
pub(crate) fn contains_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|token| token == word)
}

/// Match one taxonomy against lowercase content and tags.
///
/// The path holds the first matched root and the first matched subcategory
/// under that root. Categories collect every match, deduplicated.
fn match_taxonomy(
    taxonomy: &Taxonomy,
    content_lower: &str,
    tags_lower: &[String],
) -> (Vec<String>, Vec<String>) {
    let mentions = |name: &str| {
        let name = name.to_lowercase();
        content_lower.contains(&name) || tags_lower.iter().any(|t| t.contains(&name))
    };

    let mut path: Vec<String> = Vec::new();
    let mut categories: Vec<String> = Vec::new();
    let push_category = |categories: &mut Vec<String>, name: &str| {
        if !categories.iter().any(|c| c == name) {
            categories.push(name.to_string());
        }
    };

    for root in taxonomy.roots {
        if !mentions(root.name) {
            continue;
        }
        push_category(&mut categories, root.name);
        let first_root = path.is_empty();
        if first_root {
            path.push(root.name.to_string());
        }
        for sub in root.subcategories {
            if mentions(sub) {
                push_category(&mut categories, sub);
                if first_root && path.len() == 1 {
                    path.push(sub.to_string());
                }
            }
        }
    }

    (path, categories)
}
