//! # Unique-Key Ordered Set
//!
//! [`TreeSet`] stores keys only. It is a façade over [`BPlusTree`] with
//! the unit type as value: `()` is zero-sized, so the leaf value array
//! stores nothing and the full leaf budget goes to keys.

use eyre::Result;

use crate::comparator::{Comparator, OrdComparator};
use crate::tree::{BPlusTree, Cursor, DEFAULT_NODE_SIZE};

/// Ordered set of unique keys.
#[derive(Debug)]
pub struct TreeSet<K, C = OrdComparator, const NODE_SIZE: usize = DEFAULT_NODE_SIZE> {
    tree: BPlusTree<K, (), C, false, NODE_SIZE>,
}

impl<K, C, const NODE_SIZE: usize> TreeSet<K, C, NODE_SIZE>
where
    K: Clone,
    C: Comparator<K>,
{
    pub fn new() -> Self
    where
        C: Default,
    {
        Self::with_comparator(C::default())
    }

    pub fn with_comparator(comparator: C) -> Self {
        Self {
            tree: BPlusTree::with_comparator(comparator),
        }
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Drop every key.
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Insert a key. `Ok(true)` means the key was new. Fails only on node
    /// allocation failure, leaving the set unchanged.
    pub fn insert(&mut self, key: K) -> Result<bool> {
        self.tree.insert(key, ())
    }

    /// Remove `key`, reporting whether it was present.
    pub fn erase(&mut self, key: &K) -> bool {
        self.tree.erase(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.tree.contains_key(key)
    }

    /// Cursor on the smallest key.
    pub fn first(&self) -> Option<Cursor<'_, K, (), C, false, NODE_SIZE>> {
        self.tree.first()
    }

    /// Cursor on the largest key (on it, not past it).
    pub fn last(&self) -> Option<Cursor<'_, K, (), C, false, NODE_SIZE>> {
        self.tree.last()
    }

    /// Cursor on the key equal to `key`.
    pub fn find(&self, key: &K) -> Option<Cursor<'_, K, (), C, false, NODE_SIZE>> {
        self.tree.find(key)
    }

    /// Cursor on the key equal to `key`; `None` unless it is present.
    pub fn lower_bound(&self, key: &K) -> Option<Cursor<'_, K, (), C, false, NODE_SIZE>> {
        self.tree.lower_bound(key)
    }

    /// Cursor on the key after the one equal to `key`; `None` unless it
    /// is present and a key follows it.
    pub fn upper_bound(&self, key: &K) -> Option<Cursor<'_, K, (), C, false, NODE_SIZE>> {
        self.tree.upper_bound(key)
    }

    /// Iterate all keys in comparator order.
    pub fn iter(&self) -> SetIter<'_, K, C, NODE_SIZE> {
        SetIter {
            inner: self.tree.iter(),
        }
    }

    /// Check the structural invariants of the underlying tree.
    pub fn validate(&self) -> Result<()> {
        self.tree.validate()
    }
}

impl<K, C, const NODE_SIZE: usize> Default for TreeSet<K, C, NODE_SIZE>
where
    K: Clone,
    C: Comparator<K> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the keys of a [`TreeSet`] in comparator order.
pub struct SetIter<'a, K, C, const NODE_SIZE: usize> {
    inner: crate::tree::Iter<'a, K, (), C, false, NODE_SIZE>,
}

impl<'a, K, C, const NODE_SIZE: usize> Iterator for SetIter<'a, K, C, NODE_SIZE> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, C, const NODE_SIZE: usize> ExactSizeIterator for SetIter<'_, K, C, NODE_SIZE> {}
