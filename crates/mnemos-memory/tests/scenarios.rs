//! End-to-end behaviour of the engine through its public API.

use std::sync::Arc;

use chrono::{Duration, Utc};
use mnemos_config::EngineConfig;
use mnemos_embed::{MockEmbedder, UnavailableEmbedder};
use mnemos_memory::insights::CONSOLIDATE_RECOMMENDATION;
use mnemos_memory::{
    ConnectionType, EngineSettings, InMemoryRecordStore, MemoryEngine, MemoryId, MemoryLayer,
    MemoryNode, MemoryState, QueryContext, RawMemory, RecordStore, SqliteRecordStore,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

async fn store(engine: &MemoryEngine, raw: RawMemory) -> MemoryId {
    engine.classify_and_store(raw).await.unwrap().value
}

#[tokio::test]
async fn fibonacci_items_rank_above_unrelated() {
    let engine = MemoryEngine::in_memory();
    let first = store(
        &engine,
        RawMemory::new("Python function to calculate fibonacci")
            .with_project("algos")
            .with_tags(["python", "recursion"]),
    )
    .await;
    let second = store(
        &engine,
        RawMemory::new("Function that computes fibonacci numbers in Python")
            .with_project("algos")
            .with_tags(["python", "math"]),
    )
    .await;
    let unrelated = store(&engine, RawMemory::new("commit message").with_project("algos")).await;

    let results = engine
        .search(&QueryContext::new("fibonacci performance").with_max_results(5))
        .await
        .value
        .results;

    let position = |id: MemoryId| results.iter().position(|r| r.memory_id == id);
    let first = position(first).expect("first fibonacci item");
    let second = position(second).expect("second fibonacci item");
    if let Some(unrelated) = position(unrelated) {
        assert!(first < unrelated && second < unrelated);
    }
    assert!(results.len() <= 5);
}

#[test]
fn idle_short_term_node_goes_dormant_without_promotion() {
    let engine = MemoryEngine::in_memory();
    let month_ago = Utc::now() - Duration::days(30);
    let mut node = MemoryNode::from_raw(RawMemory::new("scratch idea"), month_ago, 0.1);
    node.metadata.layer = MemoryLayer::ShortTerm;
    let id = engine.import_node(node).unwrap().value;

    let report = engine.run_maintenance(&CancellationToken::new());
    assert_eq!(report.processed, 1);

    let node = engine.inspect(id).unwrap();
    assert_eq!(node.metadata.state, MemoryState::Dormant);
    assert_eq!(node.metadata.layer, MemoryLayer::ShortTerm);
    assert!(node.metadata.decay_factor(Utc::now()) < 0.1);
}

#[tokio::test]
async fn many_short_term_items_trigger_consolidation_advice() {
    let settings = EngineSettings {
        engine: EngineConfig {
            short_term_limit: 10,
            ..EngineConfig::default()
        },
        ..EngineSettings::default()
    };
    let engine = MemoryEngine::new(
        settings,
        Arc::new(UnavailableEmbedder),
        Arc::new(InMemoryRecordStore::new()),
    );
    for i in 0..12 {
        store(
            &engine,
            RawMemory::new(format!("TODO react item {i}"))
                .with_type("task")
                .with_project("web")
                .with_tag("react"),
        )
        .await;
    }

    let report = engine.insights(Some("web"));
    assert_eq!(report.total_memories, 12);
    assert_eq!(report.layer_distribution.values().sum::<usize>(), 12);
    assert_eq!(report.state_distribution.values().sum::<usize>(), 12);
    assert_eq!(report.layer_distribution[&MemoryLayer::ShortTerm], 12);
    assert!(report.recommendations.iter().any(|r| r == CONSOLIDATE_RECOMMENDATION));
}

#[tokio::test]
async fn no_weak_edge_survives_maintenance() {
    let store_impl = Arc::new(InMemoryRecordStore::new());
    let engine = MemoryEngine::new(
        EngineSettings::default(),
        Arc::new(MockEmbedder::new(256)),
        store_impl.clone(),
    );
    let mut ids = Vec::new();
    for content in [
        "Deploy the API with Docker",
        "Docker compose file for the API",
        "API rate limiting notes",
        "Weekly planning",
    ] {
        ids.push(store(&engine, RawMemory::new(content).with_project("svc")).await);
    }
    for id in &ids {
        for conn in engine.connections_of(*id).unwrap() {
            engine
                .reinforce_connection(conn.source, conn.target, conn.connection_type, -0.25)
                .unwrap();
        }
    }

    engine.run_maintenance(&CancellationToken::new());

    let threshold = engine.config().connection_strength_threshold;
    for id in &ids {
        for conn in engine.connections_of(*id).unwrap() {
            assert!(conn.strength >= threshold);
        }
    }
    for conn in store_impl.load_connections().unwrap() {
        assert!(conn.strength >= threshold);
    }
}

#[tokio::test]
async fn classification_is_deterministic_and_weights_stay_bounded() {
    let engine = MemoryEngine::in_memory();
    let raw = || {
        RawMemory::new("URGENT critical bug: fix the Python API error asap, it must ship")
            .with_tags(["python", "api", "backend", "urgent"])
    };
    let a = engine.inspect(store(&engine, raw()).await).unwrap();
    let b = engine.inspect(store(&engine, raw()).await).unwrap();
    assert_eq!(a.topic_path, b.topic_path);
    assert_eq!(a.skill_path, b.skill_path);
    assert!((0.0..=1.0).contains(&a.metadata.emotional_weight));

    let again = engine.reclassify(a.id).unwrap().value;
    assert_eq!(again.topic_path, a.topic_path);

    engine.promote_memories(&[a.id, b.id], None, Some(7.5));
    engine.promote_memories(&[a.id], None, Some(-1.0));
    for node in engine.list_memories(None) {
        let meta = &node.metadata;
        assert!((0.0..=1.0).contains(&meta.emotional_weight));
        assert!((0.0..=1.0).contains(&meta.integration_depth));
        assert!((0.0..=1.0).contains(&meta.decay_factor(Utc::now())));
    }
}

#[tokio::test]
async fn repeated_search_is_stable_and_cached() {
    let engine = MemoryEngine::in_memory();
    for content in [
        "How to profile Rust code?",
        "Rust performance tuning notes",
        "Profiling the database layer",
    ] {
        store(&engine, RawMemory::new(content).with_project("perf")).await;
    }
    let ctx = QueryContext::new("rust profiling").with_project("perf");

    let first = engine.search(&ctx).await.value;
    let second = engine.search(&ctx).await.value;
    assert!(!first.from_cache);
    assert!(second.from_cache);
    let order = |r: &[mnemos_memory::QueryResult]| r.iter().map(|r| r.memory_id).collect::<Vec<_>>();
    assert_eq!(order(&first.results), order(&second.results));
}

#[test]
fn traced_paths_respect_hop_bound() {
    let engine = MemoryEngine::in_memory();
    let ids: Vec<MemoryId> = (0..5)
        .map(|i| {
            let created = Utc::now() - Duration::days(5 * i);
            let raw = RawMemory::new(format!("link {i}")).with_project(format!("p{i}"));
            engine
                .import_node(MemoryNode::from_raw(raw, created, 0.1))
                .unwrap()
                .value
        })
        .collect();
    for pair in ids.windows(2) {
        engine
            .connect(pair[0], pair[1], ConnectionType::Causal, 0.8)
            .unwrap();
    }

    for max_hops in 0..6 {
        match engine.trace_path(&[ids[0]], &[ids[4]], max_hops) {
            Some(path) => {
                assert!(path.len() - 1 <= max_hops);
                assert_eq!(path.first(), Some(&ids[0]));
                assert_eq!(path.last(), Some(&ids[4]));
            }
            None => assert!(max_hops < 4),
        }
    }
    // edges are directed
    assert!(engine.trace_path(&[ids[4]], &[ids[0]], 10).is_none());
}

#[tokio::test]
async fn sqlite_store_warm_starts_engine() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data").join("mnemos.db");

    let (ids, edges) = {
        let store = Arc::new(SqliteRecordStore::open(&path).unwrap());
        let engine = MemoryEngine::new(
            EngineSettings::default(),
            Arc::new(UnavailableEmbedder),
            store,
        );
        let a = store_in(&engine, "Kubernetes rollout checklist").await;
        let b = store_in(&engine, "Kubernetes pod restarts").await;
        engine.get_memory(a).unwrap();
        (vec![a, b], engine.connection_count())
    };

    let store = Arc::new(SqliteRecordStore::open(&path).unwrap());
    let engine = MemoryEngine::open(
        EngineSettings::default(),
        Arc::new(UnavailableEmbedder),
        store,
    )
    .unwrap();
    assert_eq!(engine.memory_count(), 2);
    assert_eq!(engine.connection_count(), edges);
    assert_eq!(engine.inspect(ids[0]).unwrap().metadata.access_count, 1);
}

async fn store_in(engine: &MemoryEngine, content: &str) -> MemoryId {
    store(engine, RawMemory::new(content).with_project("infra")).await
}
