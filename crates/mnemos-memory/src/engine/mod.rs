//! The engine facade.
//!
//! [`MemoryEngine`] owns every node (in a [`NodeArena`]) and every edge (in a
//! [`ConnectionGraph`] behind one reader-writer lock) and writes changes
//! through to a [`RecordStore`]. It is cheap to clone and safe to share
//! across tasks.
//!
//! Lock discipline: the graph lock and node locks are never held at the same
//! time. Operations read what they need from one, release it, then take the
//! other.
//!
//! Operations are split by concern:
//! - `memory_ops`: store, read, reclassify, promote, import
//! - `query_ops`: search, cache, statistics
//! - `graph_ops`: manual edges, reinforcement, paths, suggestions, views
//! - `maintenance_ops`: the layer/decay pass
//! - `insight_ops`: aggregate reports

mod graph_ops;
mod insight_ops;
mod maintenance_ops;
mod memory_ops;
mod query_ops;

use std::collections::BTreeSet;
use std::sync::Arc;

use mnemos_config::{EngineConfig, MnemosConfig, QueryConfig};
use mnemos_embed::{SharedEmbedder, UnavailableEmbedder};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{info, warn};

use crate::arena::{NodeArena, NodeIndex};
use crate::classifier::Classifier;
use crate::connections::ConnectionBuilder;
use crate::error::{Result, SoftFailure};
use crate::graph::{ConnectionGraph, Edge};
use crate::lifecycle::LifecycleManager;
use crate::query::QueryEngine;
use crate::store::{InMemoryRecordStore, RecordStore};
use crate::types::{ConnectionType, MemoryConnection, MemoryNode};

pub use graph_ops::{AnalogicalPattern, ConceptTrace, GraphNode, KnowledgeGraph, RelatedMemory};
pub use maintenance_ops::MaintenanceReport;
pub use memory_ops::PromotionReport;

// ─────────────────────────────────────────────────────────────────────────────
// Settings and outcomes
// ─────────────────────────────────────────────────────────────────────────────

/// Tunables the engine is built from.
#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub engine: EngineConfig,
    pub query: QueryConfig,
}

impl From<&MnemosConfig> for EngineSettings {
    fn from(config: &MnemosConfig) -> Self {
        Self {
            engine: config.engine(),
            query: config.query(),
        }
    }
}

/// A successful result plus the failures recovered from along the way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<T> {
    pub value: T,
    pub soft_failures: Vec<SoftFailure>,
}

impl<T> Outcome<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            soft_failures: Vec::new(),
        }
    }

    pub fn with_failures(value: T, soft_failures: Vec<SoftFailure>) -> Self {
        Self {
            value,
            soft_failures,
        }
    }

    /// No soft failures were recorded.
    pub fn is_clean(&self) -> bool {
        self.soft_failures.is_empty()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            soft_failures: self.soft_failures,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

struct EngineInner {
    config: EngineConfig,
    classifier: Classifier,
    builder: ConnectionBuilder,
    lifecycle: LifecycleManager,
    query: QueryEngine,
    arena: NodeArena,
    graph: RwLock<ConnectionGraph>,
    store: Arc<dyn RecordStore>,
    embedder: SharedEmbedder,
}

/// Layered, graph-connected memory engine.
#[derive(Clone)]
pub struct MemoryEngine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("nodes", &self.inner.arena.len())
            .field("edges", &self.inner.graph.read().edge_count())
            .field("embedder", &self.inner.embedder.name())
            .finish()
    }
}

impl MemoryEngine {
    /// An empty engine. Nothing is loaded from `store`.
    pub fn new(
        settings: EngineSettings,
        embedder: SharedEmbedder,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        let EngineSettings { engine, query } = settings;
        let inner = EngineInner {
            classifier: Classifier::new(),
            builder: ConnectionBuilder::new(&engine),
            lifecycle: LifecycleManager::new(&engine),
            query: QueryEngine::new(query),
            arena: NodeArena::new(),
            graph: RwLock::new(ConnectionGraph::new(engine.connection_strength_threshold)),
            config: engine,
            store,
            embedder,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// An engine warm-started from every record in `store`.
    ///
    /// Edges below the strength threshold, and edges whose endpoints are
    /// missing, are skipped.
    pub fn open(
        settings: EngineSettings,
        embedder: SharedEmbedder,
        store: Arc<dyn RecordStore>,
    ) -> Result<Self> {
        let engine = Self::new(settings, embedder, store);
        let inner = &engine.inner;

        let nodes = inner.store.load_nodes()?;
        let node_count = nodes.len();
        for node in nodes {
            inner.arena.insert(node);
        }

        let mut skipped = 0usize;
        {
            let mut graph = inner.graph.write();
            for conn in inner.store.load_connections()? {
                let (Some(source), Some(target)) = (
                    inner.arena.index_of(&conn.source),
                    inner.arena.index_of(&conn.target),
                ) else {
                    skipped += 1;
                    continue;
                };
                let edge = Edge {
                    strength: conn.strength,
                    created_at: conn.created_at,
                    last_reinforced: conn.last_reinforced,
                    reinforcement_count: conn.reinforcement_count,
                };
                if !graph.restore(source, target, conn.connection_type, edge).is_change() {
                    skipped += 1;
                }
            }
        }
        if skipped > 0 {
            warn!(count = skipped, "Skipped stored connections on load");
        }

        let all: BTreeSet<NodeIndex> = inner.arena.handles().into_iter().map(|(i, _)| i).collect();
        engine.refresh_aggregates(&all, false);

        info!(
            nodes = node_count,
            edges = inner.graph.read().edge_count(),
            embedder = inner.embedder.name(),
            "Memory engine opened"
        );
        Ok(engine)
    }

    /// Default settings, no embedding provider, volatile storage.
    pub fn in_memory() -> Self {
        Self::new(
            EngineSettings::default(),
            Arc::new(UnavailableEmbedder),
            Arc::new(InMemoryRecordStore::new()),
        )
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn query_config(&self) -> &QueryConfig {
        self.inner.query.config()
    }

    pub fn embedder(&self) -> &SharedEmbedder {
        &self.inner.embedder
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.inner.store
    }

    pub fn memory_count(&self) -> usize {
        self.inner.arena.len()
    }

    pub fn connection_count(&self) -> usize {
        self.inner.graph.read().edge_count()
    }

    // ── write-through helpers ───────────────────────────────────────────────

    /// Write one node to the store; a failure becomes a soft failure.
    fn persist_node(&self, node: &MemoryNode) -> Option<SoftFailure> {
        match self.inner.store.save_node(node) {
            Ok(()) => None,
            Err(e) => {
                warn!(memory_id = %node.id, error = %e, "Failed to persist node");
                Some(SoftFailure::persistence(Some(node.id), &e))
            }
        }
    }

    /// Write edges to the store. `None` payloads are deletions.
    fn persist_edges(
        &self,
        edges: Vec<(NodeIndex, NodeIndex, ConnectionType, Option<Edge>)>,
    ) -> Vec<SoftFailure> {
        let mut failures = Vec::new();
        for (s, t, ty, edge) in edges {
            let (Some(source), Some(target)) = (self.inner.arena.id_of(s), self.inner.arena.id_of(t))
            else {
                continue;
            };
            let result = match edge {
                Some(edge) => self.inner.store.save_connection(&MemoryConnection {
                    source,
                    target,
                    connection_type: ty,
                    strength: edge.strength,
                    created_at: edge.created_at,
                    last_reinforced: edge.last_reinforced,
                    reinforcement_count: edge.reinforcement_count,
                }),
                None => self.inner.store.delete_connection(source, target, ty),
            };
            if let Err(e) = result {
                warn!(source = %source, target = %target, error = %e, "Failed to persist connection");
                failures.push(SoftFailure::persistence(Some(source), &e));
            }
        }
        failures
    }

    /// Recompute derived connection metrics for `indices`.
    ///
    /// Aggregates are read under the graph lock, which is released before
    /// any node lock is taken. Nodes whose metrics changed are persisted
    /// when `persist` is set.
    fn refresh_aggregates(&self, indices: &BTreeSet<NodeIndex>, persist: bool) -> Vec<SoftFailure> {
        let aggregates: Vec<(NodeIndex, f32, u32)> = {
            let graph = self.inner.graph.read();
            indices
                .iter()
                .map(|&i| {
                    let (total, count) = graph.aggregates(i);
                    (i, total, count)
                })
                .collect()
        };

        let mut failures = Vec::new();
        for (index, total, count) in aggregates {
            let Some(handle) = self.inner.arena.get(index) else {
                continue;
            };
            let changed = {
                let mut node = handle.write();
                let meta = &mut node.metadata;
                if meta.connection_strength_total == total && meta.connected_count == count {
                    None
                } else {
                    meta.connection_strength_total = total;
                    meta.connected_count = count;
                    Some(node.clone())
                }
            };
            if persist
                && let Some(node) = changed
                && let Some(failure) = self.persist_node(&node)
            {
                failures.push(failure);
            }
        }
        failures
    }
}
