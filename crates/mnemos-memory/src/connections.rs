//! Proposes edges from a newly classified node to existing nodes.
//!
//! Three kinds of edges are proposed, all with the new node as source:
//! - semantic: embedding similarity above the strength threshold, weighted
//!   by the similarity itself (skipped when either side has no embedding)
//! - contextual: same project or at least one shared tag, fixed strength
//! - temporal: created within the trailing window, fixed strength, only the
//!   most recent few

use chrono::Duration;
use mnemos_config::EngineConfig;
use mnemos_embed::Embedder;

use crate::arena::NodeIndex;
use crate::query::ranking::hours;
use crate::types::{ConnectionType, MemoryNode};

/// One edge the builder wants to create.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposedEdge {
    pub target: NodeIndex,
    pub connection_type: ConnectionType,
    pub strength: f32,
}

#[derive(Debug, Clone)]
pub struct ConnectionBuilder {
    strength_threshold: f32,
    contextual_strength: f32,
    temporal_strength: f32,
    temporal_window: Duration,
    temporal_limit: usize,
}

impl ConnectionBuilder {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            strength_threshold: config.connection_strength_threshold,
            contextual_strength: config.contextual_strength,
            temporal_strength: config.temporal_strength,
            temporal_window: hours(config.temporal_window_hours.max(0)),
            temporal_limit: config.temporal_limit,
        }
    }

    /// Propose edges from `node` to `candidates`. Candidates equal to the
    /// node itself are ignored.
    ///
    /// `embedder` is only consulted for its similarity function; pass
    /// `None` when no provider is available.
    pub fn propose(
        &self,
        node: &MemoryNode,
        candidates: &[(NodeIndex, MemoryNode)],
        embedder: Option<&dyn Embedder>,
    ) -> Vec<ProposedEdge> {
        let others = || candidates.iter().filter(|(_, c)| c.id != node.id);
        let mut proposals = Vec::new();

        if let (Some(embedder), Some(vector)) = (embedder, node.embedding.as_deref()) {
            for (index, candidate) in others() {
                let Some(other) = candidate.embedding.as_deref() else {
                    continue;
                };
                let similarity = embedder.similarity(vector, other).clamp(0.0, 1.0);
                if similarity > self.strength_threshold {
                    proposals.push(ProposedEdge {
                        target: *index,
                        connection_type: ConnectionType::Semantic,
                        strength: similarity,
                    });
                }
            }
        }

        for (index, candidate) in others() {
            let same_project = candidate.project == node.project;
            let shared_tag = node.tags.iter().any(|t| candidate.has_tag(t));
            if same_project || shared_tag {
                proposals.push(ProposedEdge {
                    target: *index,
                    connection_type: ConnectionType::Contextual,
                    strength: self.contextual_strength,
                });
            }
        }

        let created = node.metadata.created_at;
        let cutoff = created.checked_sub_signed(self.temporal_window);
        let mut recent: Vec<&(NodeIndex, MemoryNode)> = others()
            .filter(|(_, c)| {
                cutoff.is_none_or(|cutoff| c.metadata.created_at > cutoff)
                    && c.metadata.created_at <= created
            })
            .collect();
        recent.sort_by(|(ia, a), (ib, b)| {
            b.metadata
                .created_at
                .cmp(&a.metadata.created_at)
                .then_with(|| ib.cmp(ia))
        });
        for (index, _) in recent.into_iter().take(self.temporal_limit) {
            proposals.push(ProposedEdge {
                target: *index,
                connection_type: ConnectionType::Temporal,
                strength: self.temporal_strength,
            });
        }

        proposals
    }
}
