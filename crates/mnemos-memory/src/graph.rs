//! Directed, typed adjacency over arena indices.
//!
//! The graph owns the strength threshold and enforces it on every mutation:
//! an edge whose strength falls below the threshold is removed, never kept
//! at a lower value. At most one edge exists per `(source, type, target)`.
//! `BTreeMap` adjacency keeps iteration order deterministic.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::arena::NodeIndex;
use crate::types::ConnectionType;

/// Edge payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub strength: f32,
    pub created_at: DateTime<Utc>,
    pub last_reinforced: DateTime<Utc>,
    pub reinforcement_count: u32,
}

impl Edge {
    pub fn new(strength: f32, now: DateTime<Utc>) -> Self {
        Self {
            strength: strength.clamp(0.0, 1.0),
            created_at: now,
            last_reinforced: now,
            reinforcement_count: 0,
        }
    }
}

/// What a mutation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeChange {
    Inserted,
    Updated,
    /// The edge existed and was removed because it fell below threshold.
    Removed,
    /// Nothing was stored (self-loop, or strength below threshold).
    Rejected,
}

impl EdgeChange {
    /// Whether the set of edges or their strengths changed.
    pub fn is_change(self) -> bool {
        !matches!(self, EdgeChange::Rejected)
    }
}

/// Key of one edge.
pub type EdgeKey = (NodeIndex, NodeIndex, ConnectionType);

#[derive(Debug, Clone)]
pub struct ConnectionGraph {
    threshold: f32,
    outgoing: BTreeMap<NodeIndex, BTreeMap<(NodeIndex, ConnectionType), Edge>>,
    incoming: BTreeMap<NodeIndex, BTreeSet<(NodeIndex, ConnectionType)>>,
}

impl ConnectionGraph {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
            outgoing: BTreeMap::new(),
            incoming: BTreeMap::new(),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Create or overwrite an edge with the given strength.
    ///
    /// Overwriting keeps the creation time and reinforcement count.
    pub fn upsert(
        &mut self,
        source: NodeIndex,
        target: NodeIndex,
        connection_type: ConnectionType,
        strength: f32,
        now: DateTime<Utc>,
    ) -> EdgeChange {
        if source == target {
            return EdgeChange::Rejected;
        }
        let strength = strength.clamp(0.0, 1.0);
        if strength < self.threshold {
            return match self.remove(source, target, connection_type) {
                Some(_) => EdgeChange::Removed,
                None => EdgeChange::Rejected,
            };
        }

        let edges = self.outgoing.entry(source).or_default();
        match edges.get_mut(&(target, connection_type)) {
            Some(edge) => {
                edge.strength = strength;
                edge.last_reinforced = now;
                EdgeChange::Updated
            }
            None => {
                edges.insert((target, connection_type), Edge::new(strength, now));
                self.incoming
                    .entry(target)
                    .or_default()
                    .insert((source, connection_type));
                EdgeChange::Inserted
            }
        }
    }

    /// Insert a fully formed edge, e.g. one loaded from storage.
    pub fn restore(
        &mut self,
        source: NodeIndex,
        target: NodeIndex,
        connection_type: ConnectionType,
        edge: Edge,
    ) -> EdgeChange {
        if source == target || edge.strength < self.threshold {
            return EdgeChange::Rejected;
        }
        let replaced = self
            .outgoing
            .entry(source)
            .or_default()
            .insert((target, connection_type), edge);
        self.incoming
            .entry(target)
            .or_default()
            .insert((source, connection_type));
        if replaced.is_some() {
            EdgeChange::Updated
        } else {
            EdgeChange::Inserted
        }
    }

    /// Shift an edge's strength by `delta`, clamped to `[0, 1]`.
    ///
    /// A positive delta counts as a reinforcement. Returns `None` when the
    /// edge does not exist.
    pub fn adjust(
        &mut self,
        source: NodeIndex,
        target: NodeIndex,
        connection_type: ConnectionType,
        delta: f32,
        now: DateTime<Utc>,
    ) -> Option<(EdgeChange, f32)> {
        let edge = self
            .outgoing
            .get_mut(&source)?
            .get_mut(&(target, connection_type))?;
        let strength = (edge.strength + delta).clamp(0.0, 1.0);
        if strength < self.threshold {
            self.remove(source, target, connection_type);
            return Some((EdgeChange::Removed, strength));
        }
        edge.strength = strength;
        if delta > 0.0 {
            edge.reinforcement_count = edge.reinforcement_count.saturating_add(1);
            edge.last_reinforced = now;
        }
        Some((EdgeChange::Updated, strength))
    }

    pub fn remove(
        &mut self,
        source: NodeIndex,
        target: NodeIndex,
        connection_type: ConnectionType,
    ) -> Option<Edge> {
        let edges = self.outgoing.get_mut(&source)?;
        let edge = edges.remove(&(target, connection_type))?;
        if edges.is_empty() {
            self.outgoing.remove(&source);
        }
        if let Some(sources) = self.incoming.get_mut(&target) {
            sources.remove(&(source, connection_type));
            if sources.is_empty() {
                self.incoming.remove(&target);
            }
        }
        Some(edge)
    }

    /// Remove every edge weaker than `threshold` (or the graph threshold,
    /// whichever is higher). Returns the removed keys.
    pub fn prune_below(&mut self, threshold: f32) -> Vec<EdgeKey> {
        let threshold = threshold.max(self.threshold);
        let doomed: Vec<EdgeKey> = self
            .edges()
            .filter(|(_, _, _, edge)| edge.strength < threshold)
            .map(|(s, t, ty, _)| (s, t, ty))
            .collect();
        for &(s, t, ty) in &doomed {
            self.remove(s, t, ty);
        }
        doomed
    }

    pub fn get(
        &self,
        source: NodeIndex,
        target: NodeIndex,
        connection_type: ConnectionType,
    ) -> Option<&Edge> {
        self.outgoing.get(&source)?.get(&(target, connection_type))
    }

    /// Outgoing edges of `source`, ordered by target then type.
    pub fn outgoing(
        &self,
        source: NodeIndex,
    ) -> impl Iterator<Item = (NodeIndex, ConnectionType, &Edge)> {
        self.outgoing
            .get(&source)
            .into_iter()
            .flat_map(|edges| edges.iter().map(|(&(t, ty), e)| (t, ty, e)))
    }

    /// Outgoing neighbours reachable over an edge strictly stronger than
    /// `min_strength`, with the strongest such edge per neighbour.
    pub fn neighbors_above(&self, source: NodeIndex, min_strength: f32) -> Vec<(NodeIndex, f32)> {
        let mut best: BTreeMap<NodeIndex, f32> = BTreeMap::new();
        for (target, _, edge) in self.outgoing(source) {
            if edge.strength > min_strength {
                let entry = best.entry(target).or_insert(edge.strength);
                if edge.strength > *entry {
                    *entry = edge.strength;
                }
            }
        }
        best.into_iter().collect()
    }

    /// Sum of incident strengths and number of distinct neighbours, over
    /// edges in both directions.
    pub fn aggregates(&self, node: NodeIndex) -> (f32, u32) {
        let mut total = 0.0f32;
        let mut neighbours = BTreeSet::new();
        for (target, _, edge) in self.outgoing(node) {
            total += edge.strength;
            neighbours.insert(target);
        }
        if let Some(sources) = self.incoming.get(&node) {
            for &(source, ty) in sources {
                if let Some(edge) = self.get(source, node, ty) {
                    total += edge.strength;
                    neighbours.insert(source);
                }
            }
        }
        (total, neighbours.len() as u32)
    }

    /// Every edge, ordered by source, target, type.
    pub fn edges(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex, ConnectionType, &Edge)> {
        self.outgoing.iter().flat_map(|(&s, edges)| {
            edges.iter().map(move |(&(t, ty), e)| (s, t, ty, e))
        })
    }

    pub fn edge_count(&self) -> usize {
        self.outgoing.values().map(BTreeMap::len).sum()
    }

    /// Edge count per connection type.
    pub fn counts_by_type(&self) -> BTreeMap<ConnectionType, usize> {
        let mut counts = BTreeMap::new();
        for (_, _, ty, _) in self.edges() {
            *counts.entry(ty).or_insert(0) += 1;
        }
        counts
    }
}
