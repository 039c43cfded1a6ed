//! Aggregate statistics and recommendations over a set of nodes.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use mnemos_config::EngineConfig;
use serde::Serialize;

use crate::arena::NodeIndex;
use crate::graph::ConnectionGraph;
use crate::types::{ConnectionType, MemoryLayer, MemoryNode, MemoryState};

/// How many entries the top-topic and top-skill lists keep.
const TOP_CATEGORIES: usize = 10;

pub const CONSOLIDATE_RECOMMENDATION: &str =
    "Consider consolidating short-term memories - you have many temporary items";
pub const DORMANT_RECOMMENDATION: &str =
    "Many memories are dormant - consider reviewing and updating relevant knowledge";

/// Snapshot report over all nodes, or the nodes of one project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightsReport {
    pub project: Option<String>,
    pub total_memories: usize,
    /// Every layer, including empty ones.
    pub layer_distribution: BTreeMap<MemoryLayer, usize>,
    /// Every state, including empty ones.
    pub state_distribution: BTreeMap<MemoryState, usize>,
    pub type_distribution: BTreeMap<String, usize>,
    pub top_topics: Vec<(String, usize)>,
    pub top_skills: Vec<(String, usize)>,
    /// Edges leaving a node in the report, by type.
    pub connection_types: BTreeMap<ConnectionType, usize>,
    pub total_connections: usize,
    pub average_emotional_weight: f32,
    /// Nodes created per day.
    pub knowledge_growth: BTreeMap<NaiveDate, usize>,
    pub recommendations: Vec<String>,
}

/// Build the report. `nodes` must already be filtered to the project.
pub fn build(
    project: Option<&str>,
    nodes: &[(NodeIndex, MemoryNode)],
    graph: &ConnectionGraph,
    config: &EngineConfig,
) -> InsightsReport {
    let mut layers: BTreeMap<MemoryLayer, usize> =
        MemoryLayer::ALL.into_iter().map(|l| (l, 0)).collect();
    let mut states: BTreeMap<MemoryState, usize> =
        MemoryState::ALL.into_iter().map(|s| (s, 0)).collect();
    let mut types: BTreeMap<String, usize> = BTreeMap::new();
    let mut topics: HashMap<&str, usize> = HashMap::new();
    let mut skills: HashMap<&str, usize> = HashMap::new();
    let mut growth: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let mut weight_sum = 0.0f32;

    for (_, node) in nodes {
        let meta = &node.metadata;
        *layers.entry(meta.layer).or_default() += 1;
        *states.entry(meta.state).or_default() += 1;
        *types.entry(node.memory_type.clone()).or_default() += 1;
        for topic in &meta.topic_categories {
            *topics.entry(topic).or_default() += 1;
        }
        for skill in &meta.skill_categories {
            *skills.entry(skill).or_default() += 1;
        }
        *growth.entry(meta.created_at.date_naive()).or_default() += 1;
        weight_sum += meta.emotional_weight;
    }

    let members: BTreeSet<NodeIndex> = nodes.iter().map(|(i, _)| *i).collect();
    let mut connection_types: BTreeMap<ConnectionType, usize> = BTreeMap::new();
    for (source, _, ty, _) in graph.edges() {
        if members.contains(&source) {
            *connection_types.entry(ty).or_default() += 1;
        }
    }
    let total_connections = connection_types.values().sum();

    let total = nodes.len();
    let mut recommendations = Vec::new();
    if layers[&MemoryLayer::ShortTerm] > config.short_term_limit {
        recommendations.push(CONSOLIDATE_RECOMMENDATION.to_string());
    }
    if states[&MemoryState::Dormant] as f32 > total as f32 * config.dormant_fraction {
        recommendations.push(DORMANT_RECOMMENDATION.to_string());
    }

    InsightsReport {
        project: project.map(str::to_string),
        total_memories: total,
        layer_distribution: layers,
        state_distribution: states,
        type_distribution: types,
        top_topics: top(topics),
        top_skills: top(skills),
        connection_types,
        total_connections,
        average_emotional_weight: if total == 0 {
            0.0
        } else {
            weight_sum / total as f32
        },
        knowledge_growth: growth,
        recommendations,
    }
}

fn top(counts: HashMap<&str, usize>) -> Vec<(String, usize)> {
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(name, n)| (name.to_string(), n))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(TOP_CATEGORIES);
    ranked
}
