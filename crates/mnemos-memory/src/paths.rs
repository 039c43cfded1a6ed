//! Breadth-first traversal over the connection graph.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::arena::NodeIndex;
use crate::graph::ConnectionGraph;

/// Shortest path from any of `from` to any of `to`, following outgoing edges
/// stronger than the graph threshold, at most `max_hops` edges long.
///
/// Ties between equally short paths go to the earlier `from` candidate.
/// A node present in both sets yields a single-node path.
pub fn shortest_path(
    graph: &ConnectionGraph,
    from: &[NodeIndex],
    to: &[NodeIndex],
    max_hops: usize,
) -> Option<Vec<NodeIndex>> {
    let targets: BTreeSet<NodeIndex> = to.iter().copied().collect();
    if targets.is_empty() {
        return None;
    }

    let mut best: Option<Vec<NodeIndex>> = None;
    for &start in from {
        let limit = match &best {
            Some(path) => path.len() - 1,
            None => max_hops,
        };
        if let Some(path) = bfs(graph, start, &targets, limit)
            && best.as_ref().is_none_or(|b| path.len() < b.len())
        {
            best = Some(path);
        }
    }
    best
}

fn bfs(
    graph: &ConnectionGraph,
    start: NodeIndex,
    targets: &BTreeSet<NodeIndex>,
    max_hops: usize,
) -> Option<Vec<NodeIndex>> {
    if targets.contains(&start) {
        return Some(vec![start]);
    }

    let threshold = graph.threshold();
    let mut parents: BTreeMap<NodeIndex, NodeIndex> = BTreeMap::new();
    let mut queue = VecDeque::from([(start, 0usize)]);
    let mut seen = BTreeSet::from([start]);

    while let Some((node, depth)) = queue.pop_front() {
        if depth >= max_hops {
            continue;
        }
        for (next, _) in graph.neighbors_above(node, threshold) {
            if !seen.insert(next) {
                continue;
            }
            parents.insert(next, node);
            if targets.contains(&next) {
                return Some(unwind(&parents, start, next));
            }
            queue.push_back((next, depth + 1));
        }
    }
    None
}

fn unwind(
    parents: &BTreeMap<NodeIndex, NodeIndex>,
    start: NodeIndex,
    end: NodeIndex,
) -> Vec<NodeIndex> {
    let mut path = vec![end];
    let mut current = end;
    while current != start {
        match parents.get(&current) {
            Some(&parent) => {
                path.push(parent);
                current = parent;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

/// Nodes reachable from `start` within `max_depth` hops over edges stronger
/// than `min_strength`, each scored `strength × decay^depth` using the edge
/// that reached it. Best score per node, highest first, `start` excluded.
pub fn related(
    graph: &ConnectionGraph,
    start: NodeIndex,
    max_depth: usize,
    min_strength: f32,
    decay: f32,
) -> Vec<(NodeIndex, f32)> {
    let mut scores: BTreeMap<NodeIndex, f32> = BTreeMap::new();
    let mut queue = VecDeque::from([(start, 0usize)]);
    let mut expanded = BTreeSet::from([start]);

    while let Some((node, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        let next_depth = depth + 1;
        for (next, strength) in graph.neighbors_above(node, min_strength) {
            if next == start {
                continue;
            }
            let score = strength * decay.powi(next_depth as i32);
            let entry = scores.entry(next).or_insert(score);
            if score > *entry {
                *entry = score;
            }
            if expanded.insert(next) {
                queue.push_back((next, next_depth));
            }
        }
    }

    let mut ranked: Vec<(NodeIndex, f32)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConnectionType;
    use chrono::Utc;

    fn idx(i: usize) -> NodeIndex {
        NodeIndex::from_usize(i)
    }

    /// 0 → 1 → 2 → 3, plus a weak shortcut 0 → 3 that sits exactly on the
    /// threshold.
    fn chain() -> ConnectionGraph {
        let mut g = ConnectionGraph::new(0.3);
        let now = Utc::now();
        g.upsert(idx(0), idx(1), ConnectionType::Semantic, 0.9, now);
        g.upsert(idx(1), idx(2), ConnectionType::Contextual, 0.6, now);
        g.upsert(idx(2), idx(3), ConnectionType::Temporal, 0.4, now);
        g.upsert(idx(0), idx(3), ConnectionType::Temporal, 0.3, now);
        g
    }

    #[test]
    fn test_shortest_path_respects_hops() {
        let g = chain();
        assert_eq!(
            shortest_path(&g, &[idx(0)], &[idx(3)], 3),
            Some(vec![idx(0), idx(1), idx(2), idx(3)])
        );
        assert_eq!(shortest_path(&g, &[idx(0)], &[idx(3)], 2), None);
    }

    #[test]
    fn test_shortest_path_is_directed() {
        let g = chain();
        assert_eq!(shortest_path(&g, &[idx(3)], &[idx(0)], 10), None);
    }

    #[test]
    fn test_same_node_and_multiple_candidates() {
        let g = chain();
        assert_eq!(shortest_path(&g, &[idx(2)], &[idx(2)], 0), Some(vec![idx(2)]));
        assert_eq!(
            shortest_path(&g, &[idx(0), idx(1)], &[idx(3), idx(2)], 5),
            Some(vec![idx(1), idx(2)])
        );
        assert_eq!(shortest_path(&g, &[idx(0)], &[], 5), None);
    }

    #[test]
    fn test_related_depth_and_strength() {
        let g = chain();
        let related = related(&g, idx(0), 2, 0.4, 0.8);
        // 0→3 is too weak, 3 is three hops away over strong edges
        assert_eq!(related.len(), 2);
        assert_eq!(related[0].0, idx(1));
        assert!((related[0].1 - 0.72).abs() < 1e-6);
        assert_eq!(related[1].0, idx(2));
        assert!((related[1].1 - 0.6 * 0.64).abs() < 1e-6);
    }
}
