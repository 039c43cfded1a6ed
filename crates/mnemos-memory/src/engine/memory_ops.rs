//! Node creation, reads and in-place updates.

use std::collections::BTreeSet;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{MemoryEngine, Outcome};
use crate::arena::NodeIndex;
use crate::error::{MemoryError, Result, SoftFailure};
use crate::types::{
    DEFAULT_PROJECT, MemoryConnection, MemoryId, MemoryLayer, MemoryNode, MemoryState, RawMemory,
};

/// Result of [`MemoryEngine::promote_memories`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PromotionReport {
    pub promoted: Vec<MemoryId>,
    /// Requested IDs that do not exist.
    pub missing: Vec<MemoryId>,
}

/// Trim and deduplicate (case-insensitively) a tag list.
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
        .collect()
}

fn normalize_raw(raw: RawMemory) -> Result<RawMemory> {
    let content = raw.content.trim().to_string();
    if content.is_empty() {
        return Err(MemoryError::InvalidInput(
            "memory content must not be empty".to_string(),
        ));
    }
    let memory_type = match raw.memory_type.trim().to_lowercase() {
        t if t.is_empty() => "note".to_string(),
        t => t,
    };
    let project = match raw.project.trim() {
        "" => DEFAULT_PROJECT.to_string(),
        p => p.to_string(),
    };
    Ok(RawMemory {
        id: raw.id,
        content,
        memory_type,
        project,
        tags: normalize_tags(raw.tags),
    })
}

impl MemoryEngine {
    /// Classify a raw memory, link it to existing nodes and store it.
    ///
    /// Fails only on blank content or an ID that is already taken. A missing
    /// embedding provider skips semantic linking; a store failure keeps the
    /// node in memory. Both are reported as soft failures.
    pub async fn classify_and_store(&self, raw: RawMemory) -> Result<Outcome<MemoryId>> {
        let raw = normalize_raw(raw)?;
        if let Some(id) = raw.id
            && self.inner.arena.index_of(&id).is_some()
        {
            return Err(MemoryError::InvalidInput(format!("memory {id} already exists")));
        }

        let now = Utc::now();
        let mut failures = Vec::new();
        let mut node = MemoryNode::from_raw(raw, now, self.inner.config.default_decay_rate);
        self.inner.classifier.classify_node(&node).apply(&mut node, true);

        let embedder = &self.inner.embedder;
        match embedder.embed(&node.content).await {
            Ok(vector) => node.embedding = Some(vector),
            Err(e) => {
                debug!(memory_id = %node.id, error = %e, "Embedding skipped");
                failures.push(SoftFailure::provider_unavailable(Some(node.id), e.to_string()));
            }
        }

        let candidates = self.inner.arena.snapshot();
        let semantic = node.embedding.is_some().then_some(&**embedder);
        let proposals = self.inner.builder.propose(&node, &candidates, semantic);

        let id = node.id;
        // a store with the same ID may have landed during the embed await
        let index = self.inner.arena.insert_new(node)?;

        let mut changed = Vec::new();
        let mut touched = BTreeSet::from([index]);
        {
            let mut graph = self.inner.graph.write();
            for p in &proposals {
                let change = graph.upsert(index, p.target, p.connection_type, p.strength, now);
                if change.is_change() {
                    let edge = graph.get(index, p.target, p.connection_type).cloned();
                    changed.push((index, p.target, p.connection_type, edge));
                    touched.insert(p.target);
                }
            }
        }

        if let Some(handle) = self.inner.arena.get(index) {
            let snapshot = handle.read().clone();
            failures.extend(self.persist_node(&snapshot));
        }
        failures.extend(self.persist_edges(changed));
        failures.extend(self.refresh_aggregates(&touched, true));

        info!(
            memory_id = %id,
            edges = proposals.len(),
            soft_failures = failures.len(),
            "Stored memory"
        );
        Ok(Outcome::with_failures(id, failures))
    }

    /// Read a node, counting the read.
    pub fn get_memory(&self, id: MemoryId) -> Result<Outcome<MemoryNode>> {
        let (_, handle) = self
            .inner
            .arena
            .lookup(&id)
            .ok_or_else(|| MemoryError::not_found(id))?;
        let snapshot = {
            let mut node = handle.write();
            node.metadata.record_access(Utc::now());
            node.clone()
        };
        let failures = self.persist_node(&snapshot).into_iter().collect();
        Ok(Outcome::with_failures(snapshot, failures))
    }

    /// Read a node without counting the read.
    pub fn inspect(&self, id: MemoryId) -> Result<MemoryNode> {
        let (_, handle) = self
            .inner
            .arena
            .lookup(&id)
            .ok_or_else(|| MemoryError::not_found(id))?;
        let node = handle.read().clone();
        Ok(node)
    }

    /// Every node, optionally restricted to one project, oldest first.
    pub fn list_memories(&self, project: Option<&str>) -> Vec<MemoryNode> {
        self.inner
            .arena
            .snapshot()
            .into_iter()
            .map(|(_, node)| node)
            .filter(|n| project.is_none_or(|p| n.project == p))
            .collect()
    }

    /// Re-run the classifier on a node's content and tags. The layer is
    /// left alone.
    pub fn reclassify(&self, id: MemoryId) -> Result<Outcome<MemoryNode>> {
        let (_, handle) = self
            .inner
            .arena
            .lookup(&id)
            .ok_or_else(|| MemoryError::not_found(id))?;
        let snapshot = {
            let mut node = handle.write();
            let classification = self.inner.classifier.classify_node(&node);
            classification.apply(&mut node, false);
            node.clone()
        };
        debug!(memory_id = %id, topic = ?snapshot.topic_path, "Reclassified memory");
        let failures = self.persist_node(&snapshot).into_iter().collect();
        Ok(Outcome::with_failures(snapshot, failures))
    }

    /// Mark nodes as actively used, optionally moving them to a layer and
    /// setting their weight (clamped to `[0, 1]`).
    pub fn promote_memories(
        &self,
        ids: &[MemoryId],
        layer: Option<MemoryLayer>,
        emotional_weight: Option<f32>,
    ) -> Outcome<PromotionReport> {
        let now = Utc::now();
        let weight = emotional_weight.map(|w| if w.is_nan() { 0.5 } else { w.clamp(0.0, 1.0) });
        let mut report = PromotionReport::default();
        let mut failures = Vec::new();

        for &id in ids {
            let Some((_, handle)) = self.inner.arena.lookup(&id) else {
                warn!(memory_id = %id, "Cannot promote unknown memory");
                report.missing.push(id);
                continue;
            };
            let snapshot = {
                let mut node = handle.write();
                let meta = &mut node.metadata;
                if let Some(layer) = layer {
                    meta.layer = layer;
                }
                if let Some(weight) = weight {
                    meta.emotional_weight = weight;
                }
                meta.state = MemoryState::Active;
                meta.record_access(now);
                node.clone()
            };
            failures.extend(self.persist_node(&snapshot));
            report.promoted.push(id);
        }

        info!(
            promoted = report.promoted.len(),
            missing = report.missing.len(),
            "Promoted memories"
        );
        Outcome::with_failures(report, failures)
    }

    /// Add a fully formed node as-is, replacing any node with the same ID.
    ///
    /// No classification or linking happens. Out-of-range weights are
    /// clamped. Used for restoring exported nodes.
    pub fn import_node(&self, mut node: MemoryNode) -> Result<Outcome<MemoryId>> {
        if node.content.trim().is_empty() {
            return Err(MemoryError::InvalidInput(
                "memory content must not be empty".to_string(),
            ));
        }
        let meta = &mut node.metadata;
        meta.emotional_weight = clamp_unit(meta.emotional_weight, 0.5);
        meta.integration_depth = clamp_unit(meta.integration_depth, 0.0);
        if meta.decay_rate.is_nan() || meta.decay_rate < 0.0 {
            meta.decay_rate = self.inner.config.default_decay_rate;
        }

        let id = node.id;
        let index = self.inner.arena.insert(node);
        let mut failures = self.refresh_aggregates(&BTreeSet::from([index]), false);
        if let Some(handle) = self.inner.arena.get(index) {
            let snapshot = handle.read().clone();
            failures.extend(self.persist_node(&snapshot));
        }
        Ok(Outcome::with_failures(id, failures))
    }

    /// Outgoing edges of a node.
    pub fn connections_of(&self, id: MemoryId) -> Result<Vec<MemoryConnection>> {
        let index = self
            .inner
            .arena
            .index_of(&id)
            .ok_or_else(|| MemoryError::not_found(id))?;
        let edges: Vec<(NodeIndex, _, _)> = self
            .inner
            .graph
            .read()
            .outgoing(index)
            .map(|(t, ty, e)| (t, ty, e.clone()))
            .collect();
        Ok(edges
            .into_iter()
            .filter_map(|(t, ty, e)| {
                Some(MemoryConnection {
                    source: id,
                    target: self.inner.arena.id_of(t)?,
                    connection_type: ty,
                    strength: e.strength,
                    created_at: e.created_at,
                    last_reinforced: e.last_reinforced,
                    reinforcement_count: e.reinforcement_count,
                })
            })
            .collect())
    }
}

fn clamp_unit(value: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SoftFailureKind;
    use crate::store::InMemoryRecordStore;
    use crate::types::ConnectionType;
    use crate::engine::EngineSettings;
    use mnemos_embed::{Embedder, MockEmbedder};
    use std::sync::Arc;

    fn mock_engine() -> (MemoryEngine, Arc<InMemoryRecordStore>) {
        let store = Arc::new(InMemoryRecordStore::new());
        let engine = MemoryEngine::new(
            EngineSettings::default(),
            Arc::new(MockEmbedder::new(256)),
            store.clone(),
        );
        (engine, store)
    }

    /// Embedder that yields for a while before answering.
    struct SlowEmbedder(MockEmbedder);

    #[async_trait::async_trait]
    impl Embedder for SlowEmbedder {
        async fn embed(&self, text: &str) -> mnemos_embed::Result<Vec<f32>> {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            self.0.embed(text).await
        }

        fn dimensions(&self) -> usize {
            self.0.dimensions()
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_concurrent_stores_with_same_id_keep_first() {
        let engine = MemoryEngine::new(
            EngineSettings::default(),
            Arc::new(SlowEmbedder(MockEmbedder::new(64))),
            Arc::new(InMemoryRecordStore::new()),
        );
        let id = MemoryId::new();
        let (a, b) = tokio::join!(
            engine.classify_and_store(RawMemory::new("first content").with_id(id)),
            engine.classify_and_store(RawMemory::new("second content").with_id(id)),
        );

        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        let err = a.err().or(b.err()).unwrap();
        assert!(matches!(err, MemoryError::InvalidInput(_)));
        assert_eq!(engine.memory_count(), 1);
        let stored = engine.inspect(id).unwrap();
        assert_eq!(stored.content, "first content");
    }

    #[tokio::test]
    async fn test_store_rejects_blank_content() {
        let engine = MemoryEngine::in_memory();
        let err = engine.classify_and_store(RawMemory::new("   ")).await.unwrap_err();
        assert!(matches!(err, MemoryError::InvalidInput(_)));
        assert_eq!(engine.memory_count(), 0);
    }

    #[tokio::test]
    async fn test_store_rejects_taken_id() {
        let engine = MemoryEngine::in_memory();
        let id = MemoryId::new();
        engine
            .classify_and_store(RawMemory::new("first").with_id(id))
            .await
            .unwrap();
        let err = engine
            .classify_and_store(RawMemory::new("second").with_id(id))
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_store_without_provider_soft_fails() {
        let engine = MemoryEngine::in_memory();
        let outcome = engine
            .classify_and_store(RawMemory::new("Rust backend is memory safe").with_tag(" rust "))
            .await
            .unwrap();
        assert_eq!(outcome.soft_failures.len(), 1);
        assert_eq!(outcome.soft_failures[0].kind, SoftFailureKind::ProviderUnavailable);

        let node = engine.inspect(outcome.value).unwrap();
        assert!(node.embedding.is_none());
        assert_eq!(node.tags, vec!["rust"]);
        assert_eq!(node.project, DEFAULT_PROJECT);
        assert_eq!(node.metadata.layer, MemoryLayer::Semantic);
        assert_eq!(node.topic_path, vec!["Backend", "Rust"]);
    }

    #[tokio::test]
    async fn test_store_links_and_persists() {
        let (engine, store) = mock_engine();
        let a = engine
            .classify_and_store(RawMemory::new("rust borrow checker rules").with_project("p"))
            .await
            .unwrap();
        assert!(a.is_clean());
        let b = engine
            .classify_and_store(RawMemory::new("rust borrow checker errors").with_project("p"))
            .await
            .unwrap();

        let edges = engine.connections_of(b.value).unwrap();
        let types: BTreeSet<ConnectionType> = edges.iter().map(|e| e.connection_type).collect();
        assert!(types.contains(&ConnectionType::Contextual));
        assert!(types.contains(&ConnectionType::Temporal));
        assert!(edges.iter().all(|e| e.target == a.value));
        // edges go from the new node only
        assert!(engine.connections_of(a.value).unwrap().is_empty());

        let target = engine.inspect(a.value).unwrap();
        assert_eq!(target.metadata.connected_count, 1);
        assert_eq!(store.node_count(), 2);
        assert_eq!(store.connection_count(), edges.len());
        assert_eq!(store.node(&a.value).unwrap().metadata.connected_count, 1);
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_memory() {
        let (engine, store) = mock_engine();
        store.set_read_only(true);
        let outcome = engine
            .classify_and_store(RawMemory::new("kept in memory"))
            .await
            .unwrap();
        assert!(outcome
            .soft_failures
            .iter()
            .any(|f| f.kind == SoftFailureKind::PersistenceFailure));
        assert!(engine.inspect(outcome.value).is_ok());
        assert_eq!(store.node_count(), 0);
    }

    #[tokio::test]
    async fn test_get_memory_counts_reads() {
        let engine = MemoryEngine::in_memory();
        let id = engine
            .classify_and_store(RawMemory::new("note"))
            .await
            .unwrap()
            .value;
        engine.get_memory(id).unwrap();
        let node = engine.get_memory(id).unwrap().value;
        assert_eq!(node.metadata.access_count, 2);
        assert_eq!(engine.inspect(id).unwrap().metadata.access_count, 2);

        let missing = engine.get_memory(MemoryId::new()).unwrap_err();
        assert!(matches!(missing, MemoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_promote_memories() {
        let engine = MemoryEngine::in_memory();
        let id = engine
            .classify_and_store(RawMemory::new("TODO: write docs").with_type("task"))
            .await
            .unwrap()
            .value;
        let unknown = MemoryId::new();
        let outcome = engine.promote_memories(&[id, unknown], Some(MemoryLayer::LongTerm), Some(3.0));
        assert_eq!(outcome.value.promoted, vec![id]);
        assert_eq!(outcome.value.missing, vec![unknown]);

        let node = engine.inspect(id).unwrap();
        assert_eq!(node.metadata.layer, MemoryLayer::LongTerm);
        assert_eq!(node.metadata.state, MemoryState::Active);
        assert_eq!(node.metadata.emotional_weight, 1.0);
        assert_eq!(node.metadata.access_count, 1);
    }

    #[tokio::test]
    async fn test_reclassify_keeps_layer() {
        let engine = MemoryEngine::in_memory();
        let id = engine
            .classify_and_store(RawMemory::new("DevOps notes on Docker").with_type("task"))
            .await
            .unwrap()
            .value;
        engine.promote_memories(&[id], Some(MemoryLayer::Procedural), None);
        let node = engine.reclassify(id).unwrap().value;
        assert_eq!(node.metadata.layer, MemoryLayer::Procedural);
        assert_eq!(node.topic_path, vec!["DevOps", "Docker"]);
    }

    #[test]
    fn test_import_clamps() {
        let engine = MemoryEngine::in_memory();
        let mut node = MemoryNode::from_raw(RawMemory::new("imported"), Utc::now(), 0.1);
        node.metadata.emotional_weight = 4.0;
        node.metadata.integration_depth = -1.0;
        let id = engine.import_node(node).unwrap().value;
        let node = engine.inspect(id).unwrap();
        assert_eq!(node.metadata.emotional_weight, 1.0);
        assert_eq!(node.metadata.integration_depth, 0.0);
        assert!(engine.list_memories(Some("elsewhere")).is_empty());
        assert_eq!(engine.list_memories(None).len(), 1);
    }
}
