//! Dense node storage.
//!
//! Nodes live in slots addressed by a [`NodeIndex`]. Each slot has its own
//! lock so updates to one node never block reads of another; the directory
//! lock is only held long enough to resolve an index or ID to a slot.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{MemoryError, Result};
use crate::types::{MemoryId, MemoryNode};

/// Position of a node in the arena. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(u32);

impl NodeIndex {
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_usize(index: usize) -> Self {
        Self(index as u32)
    }
}

/// Shared handle to one node's lock.
pub type NodeHandle = Arc<RwLock<MemoryNode>>;

#[derive(Default)]
struct Directory {
    slots: Vec<NodeHandle>,
    ids: Vec<MemoryId>,
    by_id: HashMap<MemoryId, NodeIndex>,
}

fn push_slot(dir: &mut Directory, node: MemoryNode) -> NodeIndex {
    let index = NodeIndex::from_usize(dir.slots.len());
    dir.ids.push(node.id);
    dir.by_id.insert(node.id, index);
    dir.slots.push(Arc::new(RwLock::new(node)));
    index
}

/// Arena of nodes with one lock per node.
#[derive(Default)]
pub struct NodeArena {
    directory: RwLock<Directory>,
}

impl std::fmt::Debug for NodeArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeArena")
            .field("len", &self.len())
            .finish()
    }
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. If a node with the same ID already exists its contents
    /// are replaced and the existing index is returned.
    pub fn insert(&self, node: MemoryNode) -> NodeIndex {
        if let Some((index, handle)) = self.lookup(&node.id) {
            *handle.write() = node;
            return index;
        }

        let mut dir = self.directory.write();
        // another writer may have inserted the same ID meanwhile
        if let Some(&index) = dir.by_id.get(&node.id) {
            let handle = Arc::clone(&dir.slots[index.as_usize()]);
            drop(dir);
            *handle.write() = node;
            return index;
        }
        push_slot(&mut dir, node)
    }

    /// Add a node whose ID must not be taken yet. The check and the insert
    /// happen under one directory write lock.
    pub fn insert_new(&self, node: MemoryNode) -> Result<NodeIndex> {
        let mut dir = self.directory.write();
        if dir.by_id.contains_key(&node.id) {
            return Err(MemoryError::InvalidInput(format!(
                "memory {} already exists",
                node.id
            )));
        }
        Ok(push_slot(&mut dir, node))
    }

    /// Handle for a slot.
    pub fn get(&self, index: NodeIndex) -> Option<NodeHandle> {
        self.directory.read().slots.get(index.as_usize()).cloned()
    }

    /// Index and handle for an ID.
    pub fn lookup(&self, id: &MemoryId) -> Option<(NodeIndex, NodeHandle)> {
        let dir = self.directory.read();
        let index = *dir.by_id.get(id)?;
        Some((index, Arc::clone(&dir.slots[index.as_usize()])))
    }

    pub fn index_of(&self, id: &MemoryId) -> Option<NodeIndex> {
        self.directory.read().by_id.get(id).copied()
    }

    pub fn id_of(&self, index: NodeIndex) -> Option<MemoryId> {
        self.directory.read().ids.get(index.as_usize()).copied()
    }

    /// Resolve many indices to IDs under one directory lock.
    pub fn ids_of(&self, indices: &[NodeIndex]) -> Vec<MemoryId> {
        let dir = self.directory.read();
        indices
            .iter()
            .filter_map(|i| dir.ids.get(i.as_usize()).copied())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.directory.read().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every slot handle, in index order. The directory lock is released
    /// before this returns.
    pub fn handles(&self) -> Vec<(NodeIndex, NodeHandle)> {
        self.directory
            .read()
            .slots
            .iter()
            .enumerate()
            .map(|(i, h)| (NodeIndex::from_usize(i), Arc::clone(h)))
            .collect()
    }

    /// Cloned copy of every node, each read under its own lock.
    pub fn snapshot(&self) -> Vec<(NodeIndex, MemoryNode)> {
        self.handles()
            .into_iter()
            .map(|(i, h)| (i, h.read().clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawMemory;
    use chrono::Utc;

    fn node(content: &str) -> MemoryNode {
        MemoryNode::from_raw(RawMemory::new(content), Utc::now(), 0.1)
    }

    #[test]
    fn test_insert_assigns_dense_indices() {
        let arena = NodeArena::new();
        let a = arena.insert(node("a"));
        let b = arena.insert(node("b"));
        assert_eq!(a.as_usize(), 0);
        assert_eq!(b.as_usize(), 1);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_insert_same_id_replaces() {
        let arena = NodeArena::new();
        let mut n = node("first");
        let index = arena.insert(n.clone());
        n.content = "second".to_string();
        assert_eq!(arena.insert(n.clone()), index);
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.get(index).unwrap().read().content, "second");
    }

    #[test]
    fn test_insert_new_refuses_taken_id() {
        let arena = NodeArena::new();
        let mut n = node("first");
        let index = arena.insert_new(n.clone()).unwrap();
        n.content = "second".to_string();
        let err = arena.insert_new(n).unwrap_err();
        assert!(matches!(err, MemoryError::InvalidInput(_)));
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.get(index).unwrap().read().content, "first");
    }

    #[test]
    fn test_lookup_and_ids() {
        let arena = NodeArena::new();
        let n = node("x");
        let id = n.id;
        let index = arena.insert(n);
        assert_eq!(arena.index_of(&id), Some(index));
        assert_eq!(arena.id_of(index), Some(id));
        assert_eq!(arena.ids_of(&[index]), vec![id]);
        assert!(arena.lookup(&MemoryId::new()).is_none());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let arena = NodeArena::new();
        let index = arena.insert(node("x"));
        let snap = arena.snapshot();
        arena.get(index).unwrap().write().metadata.access_count = 9;
        assert_eq!(snap[0].1.metadata.access_count, 0);
    }
}
