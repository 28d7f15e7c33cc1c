//! # Node Arena
//!
//! All nodes of a tree live in a per-tree [`NodeStore`] and are addressed
//! by [`NodeId`], a 32-bit slot index. Links between nodes (parent to
//! child, leaf to sibling) are ids, never references, which gives the tree
//! a single owner for every node: the store. The parent's child link is
//! the logical owning reference; sibling links are non-owning lookups into
//! the same arena, so the doubly-linked leaf chain cannot alias an owner.
//!
//! Freed slots are kept on a free list and reused by later allocations,
//! mirroring page reuse in a pager. Dropping or clearing the store drops
//! every node in one flat pass; no recursion over the tree shape is
//! involved, so arbitrarily deep trees release in constant stack space.

use eyre::{ensure, Result};

use super::node::Node;

/// Index of a node slot within a [`NodeStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(u32);

impl NodeId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Slab of nodes plus a free list of reusable slots.
#[derive(Debug)]
pub(crate) struct NodeStore<K, V> {
    slots: Vec<Option<Node<K, V>>>,
    free: Vec<NodeId>,
}

impl<K, V> NodeStore<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Place `node` into a fresh or recycled slot.
    ///
    /// Fails only when the 32-bit id space is exhausted; the caller is
    /// expected to roll back any half-linked structure it was building.
    pub(crate) fn allocate(&mut self, node: Node<K, V>) -> Result<NodeId> {
        if let Some(id) = self.free.pop() {
            self.slots[id.index()] = Some(node);
            return Ok(id);
        }

        ensure!(
            self.slots.len() < u32::MAX as usize,
            "node arena exhausted: {} slots in use",
            self.slots.len()
        );

        let id = NodeId(self.slots.len() as u32);
        self.slots.push(Some(node));
        Ok(id)
    }

    #[inline]
    pub(crate) fn node(&self, id: NodeId) -> &Node<K, V> {
        self.slots[id.index()].as_ref().expect("live node id")
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        self.slots[id.index()].as_mut().expect("live node id")
    }

    /// Check a node out of its slot for a multi-node mutation. The slot
    /// stays reserved; the node must be returned with [`Self::put`].
    pub(crate) fn take(&mut self, id: NodeId) -> Node<K, V> {
        self.slots[id.index()].take().expect("live node id")
    }

    /// Return a node checked out with [`Self::take`].
    pub(crate) fn put(&mut self, id: NodeId, node: Node<K, V>) {
        debug_assert!(self.slots[id.index()].is_none());
        self.slots[id.index()] = Some(node);
    }

    /// Drop a node and recycle its slot.
    pub(crate) fn remove(&mut self, id: NodeId) -> Node<K, V> {
        let node = self.slots[id.index()].take().expect("live node id");
        self.free.push(id);
        node
    }

    /// Number of live nodes.
    pub(crate) fn live_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Drop every node and forget every slot.
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}
