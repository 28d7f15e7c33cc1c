//! # Unique-Key Ordered Map
//!
//! [`TreeMap`] keeps at most one entry per key; inserting an existing key
//! overwrites its value. A thin façade over [`BPlusTree`] with duplicates
//! disabled.

use eyre::Result;

use crate::comparator::{Comparator, OrdComparator};
use crate::tree::{BPlusTree, Cursor, CursorMut, EqualRange, Iter, DEFAULT_NODE_SIZE};

/// Ordered map from `K` to `V` with unique keys.
///
/// `C` supplies the key order (defaults to [`OrdComparator`]); `NODE_SIZE`
/// is the node byte budget (defaults to [`DEFAULT_NODE_SIZE`]).
#[derive(Debug)]
pub struct TreeMap<K, V, C = OrdComparator, const NODE_SIZE: usize = DEFAULT_NODE_SIZE> {
    tree: BPlusTree<K, V, C, false, NODE_SIZE>,
}

impl<K, V, C, const NODE_SIZE: usize> TreeMap<K, V, C, NODE_SIZE>
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

    /// Number of entries.
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

    /// Insert or overwrite. `Ok(true)` means the key was new; `Ok(false)`
    /// means an existing value was replaced. Fails only on node
    /// allocation failure, leaving the map unchanged.
    pub fn insert(&mut self, key: K, value: V) -> Result<bool> {
        self.tree.insert(key, value)
    }

    /// Remove the entry for `key`, reporting whether one existed.
    pub fn erase(&mut self, key: &K) -> bool {
        self.tree.erase(key)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.tree.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.tree.get_mut(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.tree.contains_key(key)
    }

    /// Cursor on the smallest entry.
    pub fn first(&self) -> Option<Cursor<'_, K, V, C, false, NODE_SIZE>> {
        self.tree.first()
    }

    /// Cursor on the largest entry (on it, not past it).
    pub fn last(&self) -> Option<Cursor<'_, K, V, C, false, NODE_SIZE>> {
        self.tree.last()
    }

    /// Cursor on the entry equal to `key`.
    pub fn find(&self, key: &K) -> Option<Cursor<'_, K, V, C, false, NODE_SIZE>> {
        self.tree.find(key)
    }

    /// Mutable cursor on the entry equal to `key`.
    pub fn find_mut(&mut self, key: &K) -> Option<CursorMut<'_, K, V, C, false, NODE_SIZE>> {
        self.tree.find_mut(key)
    }

    /// Cursor on the entry equal to `key`; `None` unless the key is
    /// present.
    pub fn lower_bound(&self, key: &K) -> Option<Cursor<'_, K, V, C, false, NODE_SIZE>> {
        self.tree.lower_bound(key)
    }

    /// Cursor on the entry after the one equal to `key`; `None` unless
    /// the key is present and an entry follows it.
    pub fn upper_bound(&self, key: &K) -> Option<Cursor<'_, K, V, C, false, NODE_SIZE>> {
        self.tree.upper_bound(key)
    }

    /// Iterate the entries equal to `key` (at most one for a map).
    pub fn equal_range<'t, 'q>(
        &'t self,
        key: &'q K,
    ) -> EqualRange<'t, 'q, K, V, C, false, NODE_SIZE> {
        self.tree.equal_range(key)
    }

    /// Iterate all entries in key order.
    pub fn iter(&self) -> Iter<'_, K, V, C, false, NODE_SIZE> {
        self.tree.iter()
    }

    /// Check the structural invariants of the underlying tree.
    pub fn validate(&self) -> Result<()> {
        self.tree.validate()
    }
}

impl<K, V, C, const NODE_SIZE: usize> Default for TreeMap<K, V, C, NODE_SIZE>
where
    K: Clone,
    C: Comparator<K> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}
