//! Layered, graph-connected memory engine.
//!
//! Incoming memories are classified against fixed topic and skill
//! taxonomies, linked to related memories by typed, weighted edges, moved
//! between layers as they are used or forgotten, and retrieved by a
//! multi-strategy ranked search.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  MemoryEngine (clone-able facade)                                       │
//! │  - Classifier: taxonomy paths, layer, emotional weight                  │
//! │  - ConnectionBuilder: semantic / contextual / temporal edges            │
//! │  - LifecycleManager: state and layer transitions during maintenance     │
//! │  - QueryEngine: six strategies, ranking boosts, TTL result cache        │
//! │  - paths / insights: traversal and aggregate reports                    │
//! └──────────────┬───────────────────────────────┬──────────────────────────┘
//!                │                               │
//! ┌──────────────▼──────────────┐   ┌────────────▼────────────────────────┐
//! │  NodeArena                  │   │  ConnectionGraph (RwLock)           │
//! │  one RwLock per node        │   │  directed adjacency by arena index  │
//! └──────────────┬──────────────┘   └────────────┬────────────────────────┘
//!                └───────────────┬───────────────┘
//!                ┌───────────────▼───────────────┐
//!                │  RecordStore                  │
//!                │  SQLite (WAL) or in-memory    │
//!                └───────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use mnemos_memory::{MemoryEngine, QueryContext, RawMemory};
//!
//! # async fn demo() -> mnemos_memory::Result<()> {
//! let engine = MemoryEngine::in_memory();
//!
//! let stored = engine
//!     .classify_and_store(RawMemory::new("Fix the React render loop").with_project("web"))
//!     .await?;
//!
//! let hits = engine
//!     .search(&QueryContext::new("react").with_project("web"))
//!     .await;
//! for result in &hits.value.results {
//!     println!("{} {:.2} {}", result.memory_id, result.score, result.match_type);
//! }
//! # let _ = stored;
//! # Ok(())
//! # }
//! ```
//!
//! # Failures
//!
//! Hard failures (unknown IDs, blank content) are `Err(MemoryError)`.
//! Recovered conditions, an unusable embedding provider or a failed store
//! write, come back as [`SoftFailure`]s on an [`Outcome`] next to the value.

pub mod arena;
pub mod classifier;
pub mod connections;
pub mod engine;
pub mod error;
pub mod graph;
pub mod insights;
pub mod lifecycle;
pub mod paths;
pub mod query;
pub mod store;
pub mod taxonomy;
pub mod types;

// Re-export the engine facade
pub use engine::{
    AnalogicalPattern, ConceptTrace, EngineSettings, GraphNode, KnowledgeGraph,
    MaintenanceReport, MemoryEngine, Outcome, PromotionReport, RelatedMemory,
};

// Re-export error types
pub use error::{MemoryError, Result, SoftFailure, SoftFailureKind};

// Re-export query types
pub use insights::InsightsReport;
pub use query::{MatchType, QueryContext, QueryResult, QueryStats, SearchResponse};

// Re-export storage
pub use store::{InMemoryRecordStore, RecordStore, SqliteRecordStore};

// Re-export data model
pub use types::{
    ConnectionType, MemoryConnection, MemoryId, MemoryLayer, MemoryMetadata, MemoryNode,
    MemoryState, RawMemory,
};
