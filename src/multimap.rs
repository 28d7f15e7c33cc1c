//! # Duplicate-Key Ordered Multimap
//!
//! [`TreeMultimap`] permits any number of entries per key. Equal keys
//! iterate in insertion order, and [`TreeMultimap::erase`] removes the
//! earliest-inserted occurrence. A thin façade over [`BPlusTree`] with
//! duplicates enabled.

use eyre::Result;

use crate::comparator::{Comparator, OrdComparator};
use crate::tree::{BPlusTree, Cursor, CursorMut, EqualRange, Iter, DEFAULT_NODE_SIZE};

/// Ordered multimap from `K` to `V`; duplicate keys keep insertion order.
#[derive(Debug)]
pub struct TreeMultimap<K, V, C = OrdComparator, const NODE_SIZE: usize = DEFAULT_NODE_SIZE> {
    tree: BPlusTree<K, V, C, true, NODE_SIZE>,
}

impl<K, V, C, const NODE_SIZE: usize> TreeMultimap<K, V, C, NODE_SIZE>
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

    /// Number of entries, duplicates included.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Insert an entry after any existing entries with an equal key.
    /// Fails only on node allocation failure, leaving the multimap
    /// unchanged.
    pub fn insert(&mut self, key: K, value: V) -> Result<()> {
        self.tree.insert(key, value)?;
        Ok(())
    }

    /// Remove the earliest-inserted entry equal to `key`, reporting
    /// whether one existed.
    pub fn erase(&mut self, key: &K) -> bool {
        self.tree.erase(key)
    }

    /// Value of the earliest-inserted entry equal to `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.tree.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.tree.contains_key(key)
    }

    /// Cursor on the smallest entry.
    pub fn first(&self) -> Option<Cursor<'_, K, V, C, true, NODE_SIZE>> {
        self.tree.first()
    }

    /// Cursor on the largest entry (on it, not past it).
    pub fn last(&self) -> Option<Cursor<'_, K, V, C, true, NODE_SIZE>> {
        self.tree.last()
    }

    /// Cursor on the earliest-inserted entry equal to `key`.
    pub fn find(&self, key: &K) -> Option<Cursor<'_, K, V, C, true, NODE_SIZE>> {
        self.tree.find(key)
    }

    /// Mutable cursor on the earliest-inserted entry equal to `key`.
    pub fn find_mut(&mut self, key: &K) -> Option<CursorMut<'_, K, V, C, true, NODE_SIZE>> {
        self.tree.find_mut(key)
    }

    /// Cursor on the first entry equal to `key`; `None` unless the key
    /// is present.
    pub fn lower_bound(&self, key: &K) -> Option<Cursor<'_, K, V, C, true, NODE_SIZE>> {
        self.tree.lower_bound(key)
    }

    /// Cursor on the first entry past the run of entries equal to `key`;
    /// `None` unless the key is present and an entry follows its run.
    pub fn upper_bound(&self, key: &K) -> Option<Cursor<'_, K, V, C, true, NODE_SIZE>> {
        self.tree.upper_bound(key)
    }

    /// Iterate exactly the entries equal to `key`, in insertion order.
    pub fn equal_range<'t, 'q>(
        &'t self,
        key: &'q K,
    ) -> EqualRange<'t, 'q, K, V, C, true, NODE_SIZE> {
        self.tree.equal_range(key)
    }

    /// Iterate all entries in key order; equal keys in insertion order.
    pub fn iter(&self) -> Iter<'_, K, V, C, true, NODE_SIZE> {
        self.tree.iter()
    }

    /// Check the structural invariants of the underlying tree.
    pub fn validate(&self) -> Result<()> {
        self.tree.validate()
    }
}

impl<K, V, C, const NODE_SIZE: usize> Default for TreeMultimap<K, V, C, NODE_SIZE>
where
    K: Clone,
    C: Comparator<K> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}
