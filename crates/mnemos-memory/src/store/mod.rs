//! Durable persistence for nodes and connections.
//!
//! The engine keeps the authoritative copy of every node and edge in memory
//! and writes through to a [`RecordStore`]. Writes are per node and per edge;
//! nothing spans more than one record.

mod memory;
mod sqlite;

pub use memory::InMemoryRecordStore;
pub use sqlite::SqliteRecordStore;

use crate::error::Result;
use crate::types::{ConnectionType, MemoryConnection, MemoryId, MemoryNode};

/// Save/load contract for node and edge records.
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    /// Insert or replace one node, metadata and classification included.
    fn save_node(&self, node: &MemoryNode) -> Result<()>;

    /// Insert or replace one edge, keyed by source, target and type.
    fn save_connection(&self, connection: &MemoryConnection) -> Result<()>;

    /// Remove one edge. Removing an absent edge is not an error.
    fn delete_connection(
        &self,
        source: MemoryId,
        target: MemoryId,
        connection_type: ConnectionType,
    ) -> Result<()>;

    /// Every node, oldest first.
    fn load_nodes(&self) -> Result<Vec<MemoryNode>>;

    /// Every edge.
    fn load_connections(&self) -> Result<Vec<MemoryConnection>>;
}
