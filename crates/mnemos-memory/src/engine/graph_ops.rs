//! Edge maintenance, path finding and graph views.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use super::{MemoryEngine, Outcome};
use crate::arena::NodeIndex;
use crate::error::{MemoryError, Result};
use crate::graph::EdgeChange;
use crate::paths;
use crate::query::{QueryContext, QueryResult};
use crate::types::{ConnectionType, MemoryConnection, MemoryId, MemoryLayer};

/// Depth of the related-memory walk.
const RELATED_DEPTH: usize = 2;
/// Edges at or below this strength are not followed by the related walk.
const RELATED_MIN_STRENGTH: f32 = 0.4;
/// Score multiplier per hop of the related walk.
const RELATED_DECAY: f32 = 0.8;
/// Candidates per side when tracing between two concepts.
const CONCEPT_CANDIDATES: usize = 3;
/// Content preview length in graph views.
const PREVIEW_CHARS: usize = 100;
const GRAPH_NODE_TOPICS: usize = 3;

/// A node reached from another one over strong edges.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedMemory {
    pub memory_id: MemoryId,
    pub score: f32,
    pub content: String,
    pub layer: MemoryLayer,
}

/// Result of [`MemoryEngine::trace_concepts`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptTrace {
    pub from_candidates: Vec<MemoryId>,
    pub to_candidates: Vec<MemoryId>,
    pub path: Option<Vec<MemoryId>>,
}

/// One node of a [`KnowledgeGraph`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: MemoryId,
    pub preview: String,
    pub layer: MemoryLayer,
    pub emotional_weight: f32,
    pub access_count: u32,
    pub topics: Vec<String>,
}

/// Nodes around a topic and the edges among them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeGraph {
    pub center_topic: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<MemoryConnection>,
    pub layers: BTreeMap<MemoryLayer, Vec<MemoryId>>,
}

/// A topic shared by several results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalogicalPattern {
    pub topic: String,
    pub memory_ids: Vec<MemoryId>,
}

fn preview(content: &str) -> String {
    if content.chars().count() <= PREVIEW_CHARS {
        content.to_string()
    } else {
        let cut: String = content.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}...")
    }
}

impl MemoryEngine {
    fn require_index(&self, id: MemoryId) -> Result<NodeIndex> {
        self.inner
            .arena
            .index_of(&id)
            .ok_or_else(|| MemoryError::not_found(id))
    }

    /// Create or overwrite an edge by hand, e.g. for causal or functional
    /// relations the builder never proposes.
    ///
    /// An edge below the strength threshold is not stored (and an existing
    /// one is removed).
    pub fn connect(
        &self,
        source: MemoryId,
        target: MemoryId,
        connection_type: ConnectionType,
        strength: f32,
    ) -> Result<Outcome<EdgeChange>> {
        if source == target {
            return Err(MemoryError::InvalidInput(
                "a memory cannot be connected to itself".to_string(),
            ));
        }
        let s = self.require_index(source)?;
        let t = self.require_index(target)?;
        let strength = if strength.is_nan() { 0.0 } else { strength };

        let (change, edge) = {
            let mut graph = self.inner.graph.write();
            let change = graph.upsert(s, t, connection_type, strength, Utc::now());
            (change, graph.get(s, t, connection_type).cloned())
        };
        if !change.is_change() {
            return Ok(Outcome::new(change));
        }

        let mut failures = self.persist_edges(vec![(s, t, connection_type, edge)]);
        failures.extend(self.refresh_aggregates(&BTreeSet::from([s, t]), true));
        debug!(source = %source, target = %target, ?change, "Connected memories");
        Ok(Outcome::with_failures(change, failures))
    }

    /// Shift an edge's strength. Positive deltas count as reinforcement.
    /// An edge that drops below the threshold is removed and `None` returned.
    pub fn reinforce_connection(
        &self,
        source: MemoryId,
        target: MemoryId,
        connection_type: ConnectionType,
        delta: f32,
    ) -> Result<Outcome<Option<MemoryConnection>>> {
        let s = self.require_index(source)?;
        let t = self.require_index(target)?;
        let delta = if delta.is_nan() { 0.0 } else { delta };

        let (change, edge) = {
            let mut graph = self.inner.graph.write();
            let (change, _) = graph
                .adjust(s, t, connection_type, delta, Utc::now())
                .ok_or_else(|| {
                    MemoryError::NotFound(format!(
                        "{connection_type} connection {source} -> {target}"
                    ))
                })?;
            (change, graph.get(s, t, connection_type).cloned())
        };

        let connection = edge.as_ref().map(|e| MemoryConnection {
            source,
            target,
            connection_type,
            strength: e.strength,
            created_at: e.created_at,
            last_reinforced: e.last_reinforced,
            reinforcement_count: e.reinforcement_count,
        });
        let mut failures = self.persist_edges(vec![(s, t, connection_type, edge)]);
        failures.extend(self.refresh_aggregates(&BTreeSet::from([s, t]), true));
        debug!(source = %source, target = %target, ?change, "Reinforced connection");
        Ok(Outcome::with_failures(connection, failures))
    }

    /// Shortest path from any of `from` to any of `to` over edges stronger
    /// than the threshold, at most `max_hops` edges long. Unknown IDs are
    /// ignored.
    pub fn trace_path(
        &self,
        from: &[MemoryId],
        to: &[MemoryId],
        max_hops: usize,
    ) -> Option<Vec<MemoryId>> {
        let resolve = |ids: &[MemoryId]| -> Vec<NodeIndex> {
            ids.iter()
                .filter_map(|id| self.inner.arena.index_of(id))
                .collect()
        };
        let (from, to) = (resolve(from), resolve(to));
        if from.is_empty() || to.is_empty() {
            return None;
        }
        let path = paths::shortest_path(&self.inner.graph.read(), &from, &to, max_hops)?;
        Some(self.inner.arena.ids_of(&path))
    }

    /// Search both concepts and trace a path between their best matches.
    pub async fn trace_concepts(
        &self,
        from_query: &str,
        to_query: &str,
        project: Option<&str>,
        max_hops: usize,
    ) -> Outcome<ConceptTrace> {
        let context = |q: &str| {
            let ctx = QueryContext::new(q).with_max_results(CONCEPT_CANDIDATES);
            match project {
                Some(p) => ctx.with_project(p),
                None => ctx,
            }
        };
        let from = self.search(&context(from_query)).await;
        let to = self.search(&context(to_query)).await;

        let mut failures = from.soft_failures;
        failures.extend(to.soft_failures);
        failures.dedup_by(|a, b| a.kind == b.kind && a.message == b.message);

        let ids = |results: Vec<QueryResult>| -> Vec<MemoryId> {
            results.into_iter().map(|r| r.memory_id).collect()
        };
        let from_candidates = ids(from.value.results);
        let to_candidates = ids(to.value.results);
        let path = self.trace_path(&from_candidates, &to_candidates, max_hops);

        Outcome::with_failures(
            ConceptTrace {
                from_candidates,
                to_candidates,
                path,
            },
            failures,
        )
    }

    /// Nodes within two hops over strong outgoing edges, best first.
    pub fn suggest_related(&self, id: MemoryId, max: usize) -> Result<Vec<RelatedMemory>> {
        let start = self.require_index(id)?;
        let ranked = {
            let graph = self.inner.graph.read();
            paths::related(&graph, start, RELATED_DEPTH, RELATED_MIN_STRENGTH, RELATED_DECAY)
        };

        Ok(ranked
            .into_iter()
            .take(max)
            .filter_map(|(index, score)| {
                let node = self.inner.arena.get(index)?;
                let node = node.read();
                Some(RelatedMemory {
                    memory_id: node.id,
                    score,
                    content: node.content.clone(),
                    layer: node.metadata.layer,
                })
            })
            .collect())
    }

    /// Up to `max_nodes` nodes matching a topic, the edges among them, and
    /// their grouping by layer.
    pub async fn knowledge_graph(
        &self,
        center_topic: &str,
        project: Option<&str>,
        max_nodes: usize,
    ) -> Result<Outcome<KnowledgeGraph>> {
        let center_topic = center_topic.trim();
        if center_topic.is_empty() {
            return Err(MemoryError::InvalidInput(
                "center topic must not be empty".to_string(),
            ));
        }
        let mut ctx = QueryContext::new(center_topic).with_max_results(max_nodes.max(1));
        if let Some(p) = project {
            ctx = ctx.with_project(p);
        }
        let search = self.search(&ctx).await;

        let mut nodes = Vec::new();
        let mut members: BTreeMap<NodeIndex, MemoryId> = BTreeMap::new();
        let mut layers: BTreeMap<MemoryLayer, Vec<MemoryId>> = BTreeMap::new();
        for result in &search.value.results {
            let Some((index, handle)) = self.inner.arena.lookup(&result.memory_id) else {
                continue;
            };
            let node = handle.read();
            members.insert(index, node.id);
            layers.entry(node.metadata.layer).or_default().push(node.id);
            nodes.push(GraphNode {
                id: node.id,
                preview: preview(&node.content),
                layer: node.metadata.layer,
                emotional_weight: node.metadata.emotional_weight,
                access_count: node.metadata.access_count,
                topics: node
                    .metadata
                    .topic_categories
                    .iter()
                    .take(GRAPH_NODE_TOPICS)
                    .cloned()
                    .collect(),
            });
        }

        let edges = {
            let graph = self.inner.graph.read();
            let mut edges = Vec::new();
            for (&s, &source) in &members {
                for (t, ty, e) in graph.outgoing(s) {
                    if let Some(&target) = members.get(&t) {
                        edges.push(MemoryConnection {
                            source,
                            target,
                            connection_type: ty,
                            strength: e.strength,
                            created_at: e.created_at,
                            last_reinforced: e.last_reinforced,
                            reinforcement_count: e.reinforcement_count,
                        });
                    }
                }
            }
            edges
        };

        Ok(search.map(|_| KnowledgeGraph {
            center_topic: center_topic.to_string(),
            nodes,
            edges,
            layers,
        }))
    }

    /// Topics shared by at least two of `results`, most shared first.
    pub fn analogical_patterns(&self, results: &[QueryResult]) -> Vec<AnalogicalPattern> {
        let mut groups: BTreeMap<&str, Vec<MemoryId>> = BTreeMap::new();
        for result in results {
            for topic in &result.topic_categories {
                let ids = groups.entry(topic.as_str()).or_default();
                if !ids.contains(&result.memory_id) {
                    ids.push(result.memory_id);
                }
            }
        }
        let mut patterns: Vec<AnalogicalPattern> = groups
            .into_iter()
            .filter(|(_, ids)| ids.len() >= 2)
            .map(|(topic, memory_ids)| AnalogicalPattern {
                topic: topic.to_string(),
                memory_ids,
            })
            .collect();
        patterns.sort_by(|a, b| b.memory_ids.len().cmp(&a.memory_ids.len()));
        patterns
    }
}
