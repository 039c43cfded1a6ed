//! Volatile record store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::RecordStore;
use crate::error::{MemoryError, Result};
use crate::types::{ConnectionType, MemoryConnection, MemoryId, MemoryNode};

#[derive(Debug, Default)]
struct Records {
    nodes: HashMap<MemoryId, MemoryNode>,
    connections: HashMap<(MemoryId, MemoryId, ConnectionType), MemoryConnection>,
}

/// Record store that keeps everything in process memory.
///
/// Writes can be switched off with [`set_read_only`](Self::set_read_only),
/// after which every write fails with [`MemoryError::Persistence`].
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: Mutex<Records>,
    read_only: AtomicBool,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    pub fn node_count(&self) -> usize {
        self.records.lock().nodes.len()
    }

    pub fn connection_count(&self) -> usize {
        self.records.lock().connections.len()
    }

    /// Stored copy of one node.
    pub fn node(&self, id: &MemoryId) -> Option<MemoryNode> {
        self.records.lock().nodes.get(id).cloned()
    }

    fn check_writable(&self) -> Result<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(MemoryError::Persistence("store is read-only".to_string()));
        }
        Ok(())
    }
}

impl RecordStore for InMemoryRecordStore {
    fn save_node(&self, node: &MemoryNode) -> Result<()> {
        self.check_writable()?;
        self.records.lock().nodes.insert(node.id, node.clone());
        Ok(())
    }

    fn save_connection(&self, connection: &MemoryConnection) -> Result<()> {
        self.check_writable()?;
        let key = (
            connection.source,
            connection.target,
            connection.connection_type,
        );
        self.records.lock().connections.insert(key, connection.clone());
        Ok(())
    }

    fn delete_connection(
        &self,
        source: MemoryId,
        target: MemoryId,
        connection_type: ConnectionType,
    ) -> Result<()> {
        self.check_writable()?;
        self.records
            .lock()
            .connections
            .remove(&(source, target, connection_type));
        Ok(())
    }

    fn load_nodes(&self) -> Result<Vec<MemoryNode>> {
        let mut nodes: Vec<MemoryNode> = self.records.lock().nodes.values().cloned().collect();
        nodes.sort_by(|a, b| {
            a.metadata
                .created_at
                .cmp(&b.metadata.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(nodes)
    }

    fn load_connections(&self) -> Result<Vec<MemoryConnection>> {
        let mut connections: Vec<MemoryConnection> =
            self.records.lock().connections.values().cloned().collect();
        connections.sort_by(|a, b| {
            (a.source, a.target, a.connection_type).cmp(&(b.source, b.target, b.connection_type))
        });
        Ok(connections)
    }
}
