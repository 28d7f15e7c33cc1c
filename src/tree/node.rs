//! # Node Representation
//!
//! A node is either an interior node (routing keys plus child links, one
//! more link than keys) or a leaf (keys plus parallel values plus the two
//! sibling links of the leaf chain). The kind is a tagged variant rather
//! than a header bit over shared storage; the arrays are plain `Vec`s with
//! capacity fixed at allocation from the [`Fanout`] constants, so a node's
//! keys stay contiguous for the binary searches and no reallocation
//! happens during normal operation.
//!
//! For sets the value type is `()` and the value array stores nothing.

use super::layout::Fanout;
use super::store::NodeId;

/// Routing keys and child links. `children.len() == keys.len() + 1` for
/// every node reachable from the tree.
#[derive(Debug)]
pub(crate) struct InteriorNode<K> {
    pub(crate) keys: Vec<K>,
    pub(crate) children: Vec<NodeId>,
}

impl<K> InteriorNode<K> {
    pub(crate) fn with_capacity(fanout: &Fanout) -> Self {
        Self {
            keys: Vec::with_capacity(fanout.interior_max),
            children: Vec::with_capacity(fanout.interior_max + 1),
        }
    }
}

/// Keys, parallel values and the doubly-linked leaf-chain links.
#[derive(Debug)]
pub(crate) struct LeafNode<K, V> {
    pub(crate) keys: Vec<K>,
    pub(crate) values: Vec<V>,
    pub(crate) prev: Option<NodeId>,
    pub(crate) next: Option<NodeId>,
}

impl<K, V> LeafNode<K, V> {
    pub(crate) fn with_capacity(fanout: &Fanout) -> Self {
        Self {
            keys: Vec::with_capacity(fanout.leaf_max),
            values: Vec::with_capacity(fanout.leaf_max),
            prev: None,
            next: None,
        }
    }
}

#[derive(Debug)]
pub(crate) enum Node<K, V> {
    Interior(InteriorNode<K>),
    Leaf(LeafNode<K, V>),
}

impl<K, V> Node<K, V> {
    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    #[inline]
    pub(crate) fn key_count(&self) -> usize {
        match self {
            Node::Interior(node) => node.keys.len(),
            Node::Leaf(node) => node.keys.len(),
        }
    }

    /// At capacity for its kind.
    #[inline]
    pub(crate) fn is_full(&self, fanout: &Fanout) -> bool {
        match self {
            Node::Interior(node) => node.keys.len() == fanout.interior_max,
            Node::Leaf(node) => node.keys.len() == fanout.leaf_max,
        }
    }

    /// Sitting exactly at the minimum key count for its kind.
    #[inline]
    pub(crate) fn at_min_keys(&self, fanout: &Fanout) -> bool {
        match self {
            Node::Interior(node) => node.keys.len() == fanout.interior_min,
            Node::Leaf(node) => node.keys.len() == fanout.leaf_min,
        }
    }

    #[inline]
    pub(crate) fn as_interior(&self) -> &InteriorNode<K> {
        match self {
            Node::Interior(node) => node,
            Node::Leaf(_) => unreachable!("interior node expected"),
        }
    }

    #[inline]
    pub(crate) fn as_interior_mut(&mut self) -> &mut InteriorNode<K> {
        match self {
            Node::Interior(node) => node,
            Node::Leaf(_) => unreachable!("interior node expected"),
        }
    }

    #[inline]
    pub(crate) fn as_leaf(&self) -> &LeafNode<K, V> {
        match self {
            Node::Leaf(node) => node,
            Node::Interior(_) => unreachable!("leaf node expected"),
        }
    }

    #[inline]
    pub(crate) fn as_leaf_mut(&mut self) -> &mut LeafNode<K, V> {
        match self {
            Node::Leaf(node) => node,
            Node::Interior(_) => unreachable!("leaf node expected"),
        }
    }
}
