//! # B+Tree Core
//!
//! This module implements the tree proper: descent, proactive splitting on
//! insert, proactive rebalance-or-merge on erase, point lookup and the
//! bound searches backing the cursors.
//!
//! ## Architecture Overview
//!
//! The tree owns a `NodeStore` arena and the id of the root node. All
//! data (key-value entries) lives in leaves; interior nodes carry routing
//! keys and child ids; leaves are doubly linked for range scans:
//!
//! ```text
//!                    [Interior]
//!                    /    |    \
//!           [Leaf]    [Leaf]    [Leaf]
//!              <------->  <------->      (doubly-linked chain)
//! ```
//!
//! Routing keys are copies of the leftmost key of the subtree to their
//! right: a leaf split copies the new sibling's first key up, an interior
//! split moves the median key up.
//!
//! ## Insert Algorithm
//!
//! ```text
//! 1. No root: allocate a leaf root.
//! 2. Root full: allocate a new interior root over it and split.
//! 3. Descend by upper_bound. Before entering a full child, split it,
//!    then re-aim one slot right if the new separator is <= the key.
//! 4. At the leaf, insert at upper_bound (duplicates land after their
//!    equals), or overwrite in unique mode.
//! ```
//!
//! The path from root to leaf is traversed exactly once; no ancestor can
//! overflow afterwards because every full node on the path was split on
//! the way down.
//!
//! ## Erase Algorithm
//!
//! ```text
//! 1. Descend by lower_bound. Before entering a child that sits at the
//!    minimum, borrow from a sibling or merge with one.
//! 2. A merge that drains the root promotes the merged child and restarts
//!    the descent from the new root.
//! 3. In duplicate mode a tie against a routing key also walks the left
//!    spine of the right-hand subtree (the first equal entry may live on
//!    either side) and raises a carry flag; at the leaf, a miss with the
//!    carry set falls through to slot 0 of the successor leaf.
//! 4. Delete at the leaf; no ancestor can underflow afterwards.
//! ```
//!
//! ## Memory Safety
//!
//! Nodes are addressed by arena id, never by pointer. Multi-node steps
//! (rebalance, merge) check one node out of the arena, mutate, and check
//! it back in, so no two live `&mut` borrows can alias. Cursors borrow
//! the tree, so the borrow checker rejects mutation while one is live.

use std::cmp::Ordering;
use std::mem;

use eyre::{ensure, Result};
use tracing::{debug, trace};

use crate::comparator::Comparator;

use super::cursor::{Cursor, CursorMut, EqualRange, Iter};
use super::layout::Fanout;
use super::node::{InteriorNode, LeafNode, Node};
use super::search;
use super::store::{NodeId, NodeStore};

/// Outcome of a proactive descent-time maintenance step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RebalanceOutcome {
    /// Child was not at the minimum; nothing to do.
    Noop,
    /// Borrowed one entry from the left sibling.
    RebalancedLeftToRight,
    /// Borrowed one entry from the right sibling.
    RebalancedRightToLeft,
    /// Merged the child with a sibling.
    Merged,
    /// The merge drained the root; the tree lost one level.
    Shrunk,
}

/// An in-memory B+tree over keys of type `K` and values of type `V`,
/// ordered by a [`Comparator`].
///
/// `DUPLICATES` selects multimap semantics (equal keys kept in insertion
/// order) versus unique semantics (insert overwrites). `NODE_SIZE` is the
/// node byte budget the fanout constants are derived from; see
/// [`Fanout`].
///
/// This is the engine underneath the [`TreeMap`](crate::TreeMap),
/// [`TreeMultimap`](crate::TreeMultimap) and [`TreeSet`](crate::TreeSet)
/// façades.
#[derive(Debug)]
pub struct BPlusTree<K, V, C, const DUPLICATES: bool, const NODE_SIZE: usize> {
    pub(crate) comparator: C,
    pub(crate) store: NodeStore<K, V>,
    pub(crate) root: Option<NodeId>,
    pub(crate) len: usize,
}

impl<K, V, C, const DUPLICATES: bool, const NODE_SIZE: usize>
    BPlusTree<K, V, C, DUPLICATES, NODE_SIZE>
{
    /// Capacity constants for this instantiation, derived at compile time
    /// from the node byte budget and the key and value sizes.
    pub const FANOUT: Fanout = Fanout::compute(NODE_SIZE, mem::size_of::<K>(), mem::size_of::<V>());

    pub fn new() -> Self
    where
        C: Default,
    {
        Self::with_comparator(C::default())
    }

    pub fn with_comparator(comparator: C) -> Self {
        Self {
            comparator,
            store: NodeStore::new(),
            root: None,
            len: 0,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drop every entry and every node.
    pub fn clear(&mut self) {
        self.store.clear();
        self.root = None;
        self.len = 0;
    }
}

impl<K, V, C, const DUPLICATES: bool, const NODE_SIZE: usize> Default
    for BPlusTree<K, V, C, DUPLICATES, NODE_SIZE>
where
    C: Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C, const DUPLICATES: bool, const NODE_SIZE: usize>
    BPlusTree<K, V, C, DUPLICATES, NODE_SIZE>
where
    K: Clone,
    C: Comparator<K>,
{
    /// Insert an entry.
    ///
    /// Unique mode overwrites the value of an existing equal key and
    /// returns `Ok(false)`; duplicate mode inserts after all equal keys.
    /// `Ok(true)` means the entry count grew. `Err` is reported only for
    /// node allocation failure, in which case the tree is unchanged.
    pub fn insert(&mut self, key: K, value: V) -> Result<bool> {
        let root = match self.root {
            None => {
                let root = self
                    .store
                    .allocate(Node::Leaf(LeafNode::with_capacity(&Self::FANOUT)))?;
                debug!(root = root.index(), "created leaf root");
                self.root = Some(root);
                root
            }
            Some(root) if self.store.node(root).is_full(&Self::FANOUT) => {
                let mut interior = InteriorNode::with_capacity(&Self::FANOUT);
                interior.children.push(root);
                let new_root = self.store.allocate(Node::Interior(interior))?;
                if let Err(err) = self.split_child(new_root, 0) {
                    // Roll back the half-built root; the old root and its
                    // subtree are untouched.
                    self.store.remove(new_root);
                    return Err(err);
                }
                self.root = Some(new_root);
                debug!(root = new_root.index(), "root split, height increased");
                new_root
            }
            Some(root) => root,
        };

        self.insert_non_full(root, key, value)
    }

    /// Descend from a non-full node and insert at the leaf, splitting any
    /// full child immediately ahead of the descent.
    fn insert_non_full(&mut self, mut x: NodeId, key: K, value: V) -> Result<bool> {
        loop {
            let (slot, child) = match self.store.node(x) {
                Node::Leaf(_) => break,
                Node::Interior(interior) => {
                    let slot = search::upper_bound(&interior.keys, &key, &self.comparator).pos();
                    (slot, interior.children[slot])
                }
            };

            if self.store.node(child).is_full(&Self::FANOUT) {
                self.split_child(x, slot)?;
                // The separator that just moved up may direct the key into
                // the new right sibling. `<=` keeps duplicates behind
                // their equals.
                let interior = self.store.node(x).as_interior();
                let slot = if self.comparator.compare(&interior.keys[slot], &key)
                    != Ordering::Greater
                {
                    slot + 1
                } else {
                    slot
                };
                x = interior.children[slot];
            } else {
                x = child;
            }
        }

        let result = {
            let leaf = self.store.node(x).as_leaf();
            search::upper_bound(&leaf.keys, &key, &self.comparator)
        };
        let pos = result.pos();

        if result.is_found() && !DUPLICATES {
            // The matching entry sits immediately left of the upper bound.
            self.store.node_mut(x).as_leaf_mut().values[pos - 1] = value;
            return Ok(false);
        }

        let leaf = self.store.node_mut(x).as_leaf_mut();
        leaf.keys.insert(pos, key);
        leaf.values.insert(pos, value);
        self.len += 1;
        Ok(true)
    }

    /// Split the full child at `slot` of interior node `x` into itself and
    /// a new right sibling, pushing one separator into `x`.
    fn split_child(&mut self, x: NodeId, slot: usize) -> Result<()> {
        let fanout = &Self::FANOUT;
        let y = self.store.node(x).as_interior().children[slot];

        // Allocate the sibling before moving anything so an allocation
        // failure leaves the tree untouched.
        let z = if self.store.node(y).is_leaf() {
            self.store
                .allocate(Node::Leaf(LeafNode::with_capacity(fanout)))?
        } else {
            self.store
                .allocate(Node::Interior(InteriorNode::with_capacity(fanout)))?
        };

        let mut znode = self.store.take(z);
        let mut relink = None;
        let up_key = match (self.store.node_mut(y), &mut znode) {
            (Node::Interior(ynode), Node::Interior(znew)) => {
                // The median key moves up; the upper keys and children
                // move into the sibling.
                znew.keys
                    .extend(ynode.keys.drain(fanout.interior_median + 1..));
                znew.children
                    .extend(ynode.children.drain(fanout.interior_median + 1..));
                ynode.keys.pop().expect("median key of a full node")
            }
            (Node::Leaf(yleaf), Node::Leaf(znew)) => {
                // The upper entries move into the sibling; its first key
                // is copied up as the separator and spliced into the leaf
                // chain after `y`.
                znew.keys.extend(yleaf.keys.drain(fanout.leaf_median..));
                znew.values.extend(yleaf.values.drain(fanout.leaf_median..));
                znew.prev = Some(y);
                znew.next = yleaf.next;
                yleaf.next = Some(z);
                relink = znew.next;
                znew.keys[0].clone()
            }
            _ => unreachable!("split sibling kind mismatch"),
        };
        self.store.put(z, znode);

        if let Some(succ) = relink {
            self.store.node_mut(succ).as_leaf_mut().prev = Some(z);
        }

        let parent = self.store.node_mut(x).as_interior_mut();
        parent.keys.insert(slot, up_key);
        parent.children.insert(slot + 1, z);

        trace!(
            parent = x.index(),
            left = y.index(),
            right = z.index(),
            "split child"
        );
        Ok(())
    }

    /// Remove one entry matching `key`; in duplicate mode the earliest
    /// inserted one. Returns whether an entry was removed.
    pub fn erase(&mut self, key: &K) -> bool {
        let Some(mut x) = self.root else {
            return false;
        };
        let mut search_in_next_node = false;

        loop {
            let result = match self.store.node(x) {
                Node::Leaf(_) => break,
                Node::Interior(interior) => {
                    search::lower_bound(&interior.keys, key, &self.comparator)
                }
            };
            let mut slot = result.pos();

            if result.is_found() {
                if !DUPLICATES {
                    // The unique match is the leftmost key of the right
                    // subtree.
                    slot += 1;
                } else {
                    // The first equal entry may be on either side of the
                    // tied routing key; keep the right-hand subtree safe
                    // too and remember to fall through at the leaf.
                    match self.try_rebalance_or_merge_subtree(x, slot + 1) {
                        RebalanceOutcome::RebalancedLeftToRight => {
                            let moved = &self.store.node(x).as_interior().keys[slot];
                            if self.comparator.compare(key, moved) == Ordering::Greater {
                                slot += 1;
                                search_in_next_node = false;
                            } else {
                                search_in_next_node = true;
                            }
                        }
                        RebalanceOutcome::Shrunk => {
                            x = self.root.expect("root after shrink");
                            search_in_next_node = false;
                            continue;
                        }
                        _ => search_in_next_node = true,
                    }
                }
            }

            if self.try_rebalance_or_merge(x, &mut slot) == RebalanceOutcome::Shrunk {
                x = self.root.expect("root after shrink");
                search_in_next_node = false;
                continue;
            }

            x = self.store.node(x).as_interior().children[slot];
        }

        let result = {
            let leaf = self.store.node(x).as_leaf();
            search::lower_bound(&leaf.keys, key, &self.comparator)
        };

        let (target, pos) = if result.is_found() {
            (x, result.pos())
        } else {
            if !DUPLICATES || !search_in_next_node {
                return false;
            }
            // A duplicate observed at an interior node may have been
            // carried over the leaf boundary by the rebalancing above.
            let Some(next) = self.store.node(x).as_leaf().next else {
                return false;
            };
            let first = &self.store.node(next).as_leaf().keys[0];
            if self.comparator.compare(key, first) != Ordering::Equal {
                return false;
            }
            (next, 0)
        };

        let leaf = self.store.node_mut(target).as_leaf_mut();
        leaf.keys.remove(pos);
        leaf.values.remove(pos);
        self.len -= 1;
        trace!(leaf = target.index(), slot = pos, "erased entry");

        if self.len == 0 {
            let root = self.root.take().expect("root of non-empty tree");
            self.store.remove(root);
            debug!("last entry erased, root dropped");
        }

        true
    }

    /// If `x`'s child at `slot` sits at the minimum key count, borrow one
    /// entry from a sibling or merge with one. `slot` is adjusted when a
    /// merge folds the child into its left sibling.
    fn try_rebalance_or_merge(&mut self, x: NodeId, slot: &mut usize) -> RebalanceOutcome {
        let fanout = &Self::FANOUT;
        let (child, key_count) = {
            let interior = self.store.node(x).as_interior();
            (interior.children[*slot], interior.keys.len())
        };
        if !self.store.node(child).at_min_keys(fanout) {
            return RebalanceOutcome::Noop;
        }

        if *slot > 0 {
            let left = self.store.node(x).as_interior().children[*slot - 1];
            if !self.store.node(left).at_min_keys(fanout) {
                self.rebalance_left_to_right(x, *slot);
                return RebalanceOutcome::RebalancedLeftToRight;
            }
            if *slot < key_count {
                let right = self.store.node(x).as_interior().children[*slot + 1];
                if !self.store.node(right).at_min_keys(fanout) {
                    self.rebalance_right_to_left(x, *slot);
                    return RebalanceOutcome::RebalancedRightToLeft;
                }
            }
            *slot -= 1;
            self.merge_children(x, *slot)
        } else {
            let right = self.store.node(x).as_interior().children[1];
            if !self.store.node(right).at_min_keys(fanout) {
                self.rebalance_right_to_left(x, 0);
                return RebalanceOutcome::RebalancedRightToLeft;
            }
            self.merge_children(x, 0)
        }
    }

    /// [`Self::try_rebalance_or_merge`] on `x`'s child at `slot`, then the
    /// same discipline down the left spine of that subtree, so the leaf
    /// that may hold an earlier-found duplicate is also safe to delete
    /// from.
    fn try_rebalance_or_merge_subtree(&mut self, x: NodeId, slot: usize) -> RebalanceOutcome {
        let mut slot = slot;
        let outcome = self.try_rebalance_or_merge(x, &mut slot);
        if matches!(
            outcome,
            RebalanceOutcome::Merged | RebalanceOutcome::Shrunk
        ) {
            return outcome;
        }

        let mut current = self.store.node(x).as_interior().children[slot];
        while !self.store.node(current).is_leaf() {
            let mut first = 0;
            self.try_rebalance_or_merge(current, &mut first);
            current = self.store.node(current).as_interior().children[0];
        }

        outcome
    }

    /// Move one entry from the left sibling (`slot - 1`) into the minimal
    /// child at `slot`, rotating through the separator in `x`.
    fn rebalance_left_to_right(&mut self, x: NodeId, slot: usize) {
        let (y, z) = {
            let interior = self.store.node(x).as_interior();
            (interior.children[slot - 1], interior.children[slot])
        };
        let mut znode = self.store.take(z);

        match &mut znode {
            Node::Interior(zreceiver) => {
                // Separator comes down as z's new leftmost key; the
                // donor's last key replaces it and the donor's last child
                // follows.
                let (up_key, moved_child) = {
                    let ynode = self.store.node_mut(y).as_interior_mut();
                    (
                        ynode.keys.pop().expect("donor above minimum"),
                        ynode.children.pop().expect("donor above minimum"),
                    )
                };
                let down_key = {
                    let interior = self.store.node_mut(x).as_interior_mut();
                    mem::replace(&mut interior.keys[slot - 1], up_key)
                };
                zreceiver.keys.insert(0, down_key);
                zreceiver.children.insert(0, moved_child);
            }
            Node::Leaf(zreceiver) => {
                // The donor's last entry moves over; the separator mirrors
                // the receiver's new leftmost key.
                let (moved_key, moved_value) = {
                    let yleaf = self.store.node_mut(y).as_leaf_mut();
                    (
                        yleaf.keys.pop().expect("donor above minimum"),
                        yleaf.values.pop().expect("donor above minimum"),
                    )
                };
                zreceiver.keys.insert(0, moved_key);
                zreceiver.values.insert(0, moved_value);
                let separator = zreceiver.keys[0].clone();
                self.store.node_mut(x).as_interior_mut().keys[slot - 1] = separator;
            }
        }

        self.store.put(z, znode);
        trace!(parent = x.index(), slot = slot, "rebalanced left to right");
    }

    /// Mirror image: move one entry from the right sibling (`slot + 1`)
    /// into the minimal child at `slot`.
    fn rebalance_right_to_left(&mut self, x: NodeId, slot: usize) {
        let (y, z) = {
            let interior = self.store.node(x).as_interior();
            (interior.children[slot], interior.children[slot + 1])
        };
        let mut znode = self.store.take(z);

        match &mut znode {
            Node::Interior(zdonor) => {
                let up_key = zdonor.keys.remove(0);
                let moved_child = zdonor.children.remove(0);
                let down_key = {
                    let interior = self.store.node_mut(x).as_interior_mut();
                    mem::replace(&mut interior.keys[slot], up_key)
                };
                let ynode = self.store.node_mut(y).as_interior_mut();
                ynode.keys.push(down_key);
                ynode.children.push(moved_child);
            }
            Node::Leaf(zdonor) => {
                let moved_key = zdonor.keys.remove(0);
                let moved_value = zdonor.values.remove(0);
                {
                    let yleaf = self.store.node_mut(y).as_leaf_mut();
                    yleaf.keys.push(moved_key);
                    yleaf.values.push(moved_value);
                }
                let separator = zdonor.keys[0].clone();
                self.store.node_mut(x).as_interior_mut().keys[slot] = separator;
            }
        }

        self.store.put(z, znode);
        trace!(parent = x.index(), slot = slot, "rebalanced right to left");
    }

    /// Merge `x`'s children at `slot` and `slot + 1` into the left one,
    /// folding the separator down (interior) or discarding it (leaf) and
    /// splicing the right sibling out of the leaf chain.
    fn merge_children(&mut self, x: NodeId, slot: usize) -> RebalanceOutcome {
        let (y, z) = {
            let interior = self.store.node(x).as_interior();
            (interior.children[slot], interior.children[slot + 1])
        };
        let mut znode = self.store.remove(z);

        let separator = {
            let interior = self.store.node_mut(x).as_interior_mut();
            interior.children.remove(slot + 1);
            interior.keys.remove(slot)
        };

        let relink = match (self.store.node_mut(y), &mut znode) {
            (Node::Interior(ynode), Node::Interior(zold)) => {
                ynode.keys.push(separator);
                ynode.keys.append(&mut zold.keys);
                ynode.children.append(&mut zold.children);
                None
            }
            (Node::Leaf(yleaf), Node::Leaf(zold)) => {
                // Leaf separators are copies, so the parent's is simply
                // dropped.
                yleaf.keys.append(&mut zold.keys);
                yleaf.values.append(&mut zold.values);
                yleaf.next = zold.next;
                zold.next
            }
            _ => unreachable!("merge sibling kind mismatch"),
        };

        if let Some(succ) = relink {
            self.store.node_mut(succ).as_leaf_mut().prev = Some(y);
        }

        trace!(parent = x.index(), merged = y.index(), "merged siblings");

        if self.store.node(x).as_interior().keys.is_empty() {
            // Only the root can drain completely; the merged child takes
            // over and the caller restarts its descent.
            self.store.remove(x);
            self.root = Some(y);
            debug!(root = y.index(), "root collapsed, height decreased");
            return RebalanceOutcome::Shrunk;
        }

        RebalanceOutcome::Merged
    }

    /// Position of the first entry equal to `key`, honoring the duplicate
    /// carry across a leaf boundary.
    fn find_pos(&self, key: &K) -> Option<(NodeId, usize)> {
        let mut x = self.root?;
        let mut search_in_next_node = false;

        loop {
            let result = match self.store.node(x) {
                Node::Leaf(_) => break,
                Node::Interior(interior) => {
                    search::lower_bound(&interior.keys, key, &self.comparator)
                }
            };
            let mut slot = result.pos();
            if result.is_found() {
                if !DUPLICATES {
                    slot += 1;
                } else {
                    search_in_next_node = true;
                }
            }
            x = self.store.node(x).as_interior().children[slot];
        }

        let leaf = self.store.node(x).as_leaf();
        let result = search::lower_bound(&leaf.keys, key, &self.comparator);
        if result.is_found() {
            return Some((x, result.pos()));
        }
        if !DUPLICATES || !search_in_next_node {
            return None;
        }

        let next = leaf.next?;
        let first = &self.store.node(next).as_leaf().keys[0];
        if self.comparator.compare(key, first) == Ordering::Equal {
            Some((next, 0))
        } else {
            None
        }
    }

    /// Position of the first entry past the run of entries equal to
    /// `key`; `None` unless an equal key exists. Succeeding is keyed to
    /// the leaf search observing equality, exactly like the node-level
    /// `upper_bound`.
    fn upper_bound_pos(&self, key: &K) -> Option<(NodeId, usize)> {
        let mut x = self.root?;

        loop {
            match self.store.node(x) {
                Node::Leaf(_) => break,
                Node::Interior(interior) => {
                    let slot = search::upper_bound(&interior.keys, key, &self.comparator).pos();
                    x = interior.children[slot];
                }
            }
        }

        let leaf = self.store.node(x).as_leaf();
        let result = search::upper_bound(&leaf.keys, key, &self.comparator);
        if !result.is_found() {
            return None;
        }

        let pos = result.pos();
        if pos < leaf.keys.len() {
            Some((x, pos))
        } else {
            // The matched run ends this leaf; the entry past it opens the
            // successor leaf. With no successor there is no bound at all.
            Some((leaf.next?, 0))
        }
    }

    /// Whether any entry compares equal to `key`.
    pub fn contains_key(&self, key: &K) -> bool {
        let Some(mut x) = self.root else {
            return false;
        };
        loop {
            match self.store.node(x) {
                Node::Leaf(leaf) => {
                    return search::exact(&leaf.keys, key, &self.comparator).is_found();
                }
                Node::Interior(interior) => {
                    let slot = search::upper_bound(&interior.keys, key, &self.comparator).pos();
                    x = interior.children[slot];
                }
            }
        }
    }

    /// Value of the first entry equal to `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        let (node, pos) = self.find_pos(key)?;
        Some(&self.store.node(node).as_leaf().values[pos])
    }

    /// Mutable value of the first entry equal to `key`.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let (node, pos) = self.find_pos(key)?;
        Some(&mut self.store.node_mut(node).as_leaf_mut().values[pos])
    }

    /// Cursor on the smallest entry.
    pub fn first(&self) -> Option<Cursor<'_, K, V, C, DUPLICATES, NODE_SIZE>> {
        let mut x = self.root?;
        while let Node::Interior(interior) = self.store.node(x) {
            x = interior.children[0];
        }
        Some(Cursor::new(self, x, 0))
    }

    /// Cursor on the largest entry. The cursor sits on the entry itself,
    /// not past it; `next` from here reports the end of the chain.
    pub fn last(&self) -> Option<Cursor<'_, K, V, C, DUPLICATES, NODE_SIZE>> {
        let mut x = self.root?;
        while let Node::Interior(interior) = self.store.node(x) {
            x = *interior.children.last().expect("interior has children");
        }
        let pos = self.store.node(x).key_count() - 1;
        Some(Cursor::new(self, x, pos))
    }

    /// Cursor on the first entry equal to `key`.
    pub fn find(&self, key: &K) -> Option<Cursor<'_, K, V, C, DUPLICATES, NODE_SIZE>> {
        let (node, pos) = self.find_pos(key)?;
        Some(Cursor::new(self, node, pos))
    }

    /// Cursor on the first entry equal to `key`; `None` unless an equal
    /// key exists. The lower bound and [`Self::find`] coincide, as the
    /// bound search only succeeds on an exact match.
    pub fn lower_bound(&self, key: &K) -> Option<Cursor<'_, K, V, C, DUPLICATES, NODE_SIZE>> {
        let (node, pos) = self.find_pos(key)?;
        Some(Cursor::new(self, node, pos))
    }

    /// Cursor on the first entry past the run of entries equal to `key`;
    /// `None` unless an equal key exists and an entry follows its run.
    pub fn upper_bound(&self, key: &K) -> Option<Cursor<'_, K, V, C, DUPLICATES, NODE_SIZE>> {
        let (node, pos) = self.upper_bound_pos(key)?;
        Some(Cursor::new(self, node, pos))
    }

    /// Mutable cursor on the smallest entry.
    pub fn first_mut(&mut self) -> Option<CursorMut<'_, K, V, C, DUPLICATES, NODE_SIZE>> {
        let mut x = self.root?;
        while let Node::Interior(interior) = self.store.node(x) {
            x = interior.children[0];
        }
        Some(CursorMut::new(self, x, 0))
    }

    /// Mutable cursor on the largest entry.
    pub fn last_mut(&mut self) -> Option<CursorMut<'_, K, V, C, DUPLICATES, NODE_SIZE>> {
        let mut x = self.root?;
        while let Node::Interior(interior) = self.store.node(x) {
            x = *interior.children.last().expect("interior has children");
        }
        let pos = self.store.node(x).key_count() - 1;
        Some(CursorMut::new(self, x, pos))
    }

    /// Mutable cursor on the first entry equal to `key`.
    pub fn find_mut(&mut self, key: &K) -> Option<CursorMut<'_, K, V, C, DUPLICATES, NODE_SIZE>> {
        let (node, pos) = self.find_pos(key)?;
        Some(CursorMut::new(self, node, pos))
    }

    /// Iterate all entries in comparator order.
    pub fn iter(&self) -> Iter<'_, K, V, C, DUPLICATES, NODE_SIZE> {
        Iter::new(self.first(), self.len)
    }

    /// Iterate exactly the entries equal to `key`, in insertion order.
    pub fn equal_range<'t, 'q>(
        &'t self,
        key: &'q K,
    ) -> EqualRange<'t, 'q, K, V, C, DUPLICATES, NODE_SIZE> {
        EqualRange::new(self.lower_bound(key), key)
    }

    /// Walk the whole tree and check the structural invariants: equal
    /// leaf depth, per-node ordering, occupancy bounds, child counts,
    /// routing-key bounds, leaf-chain coherence and the size counter.
    pub fn validate(&self) -> Result<()> {
        let Some(root) = self.root else {
            ensure!(self.len == 0, "empty tree records {} entries", self.len);
            ensure!(
                self.store.live_count() == 0,
                "empty tree retains {} nodes",
                self.store.live_count()
            );
            return Ok(());
        };

        let mut walk = ValidationWalk {
            leaf_depth: None,
            leaves: Vec::new(),
            entries: 0,
            nodes: 0,
        };
        self.validate_node(root, true, 0, &mut walk)?;

        ensure!(
            walk.entries == self.len,
            "size mismatch: counted {}, recorded {}",
            walk.entries,
            self.len
        );
        ensure!(
            walk.nodes == self.store.live_count(),
            "node leak: walked {}, arena holds {}",
            walk.nodes,
            self.store.live_count()
        );

        // The leaf chain must visit the in-order leaves exactly once in
        // both directions.
        let first = walk.leaves[0];
        let last = *walk.leaves.last().expect("at least one leaf");
        ensure!(
            self.store.node(first).as_leaf().prev.is_none(),
            "leftmost leaf has a predecessor"
        );
        ensure!(
            self.store.node(last).as_leaf().next.is_none(),
            "rightmost leaf has a successor"
        );
        for pair in walk.leaves.windows(2) {
            ensure!(
                self.store.node(pair[0]).as_leaf().next == Some(pair[1]),
                "forward leaf chain diverges from in-order traversal"
            );
            ensure!(
                self.store.node(pair[1]).as_leaf().prev == Some(pair[0]),
                "backward leaf chain diverges from in-order traversal"
            );
        }

        // Global key ordering over the chain.
        let mut previous: Option<&K> = None;
        for &leaf in &walk.leaves {
            for key in &self.store.node(leaf).as_leaf().keys {
                if let Some(prev) = previous {
                    let order = self.comparator.compare(prev, key);
                    if DUPLICATES {
                        ensure!(order != Ordering::Greater, "keys out of order");
                    } else {
                        ensure!(order == Ordering::Less, "keys out of order or duplicated");
                    }
                }
                previous = Some(key);
            }
        }

        Ok(())
    }

    fn validate_node(
        &self,
        id: NodeId,
        is_root: bool,
        depth: usize,
        walk: &mut ValidationWalk,
    ) -> Result<()> {
        let fanout = &Self::FANOUT;
        walk.nodes += 1;

        match self.store.node(id) {
            Node::Leaf(leaf) => {
                ensure!(
                    leaf.keys.len() == leaf.values.len(),
                    "leaf key/value arrays diverge"
                );
                ensure!(
                    leaf.keys.len() <= fanout.leaf_max,
                    "leaf over capacity: {}",
                    leaf.keys.len()
                );
                if !is_root {
                    ensure!(
                        leaf.keys.len() >= fanout.leaf_min,
                        "leaf under minimum: {}",
                        leaf.keys.len()
                    );
                }
                match walk.leaf_depth {
                    None => walk.leaf_depth = Some(depth),
                    Some(expected) => {
                        ensure!(expected == depth, "leaves at unequal depths");
                    }
                }
                walk.entries += leaf.keys.len();
                walk.leaves.push(id);
            }
            Node::Interior(interior) => {
                ensure!(!interior.keys.is_empty(), "interior node with no keys");
                ensure!(
                    interior.children.len() == interior.keys.len() + 1,
                    "interior child count {} does not match {} keys",
                    interior.children.len(),
                    interior.keys.len()
                );
                ensure!(
                    interior.keys.len() <= fanout.interior_max,
                    "interior over capacity"
                );
                if !is_root {
                    ensure!(
                        interior.keys.len() >= fanout.interior_min,
                        "interior under minimum: {}",
                        interior.keys.len()
                    );
                }
                for pair in interior.keys.windows(2) {
                    ensure!(
                        self.comparator.compare(&pair[0], &pair[1]) != Ordering::Greater,
                        "routing keys out of order"
                    );
                }

                for i in 0..interior.keys.len() {
                    let routing = &interior.keys[i];
                    let left_max = self.subtree_max(interior.children[i]);
                    let right_min = self.subtree_min(interior.children[i + 1]);
                    let left_order = self.comparator.compare(left_max, routing);
                    if DUPLICATES {
                        ensure!(
                            left_order != Ordering::Greater,
                            "left subtree exceeds routing key"
                        );
                    } else {
                        ensure!(
                            left_order == Ordering::Less,
                            "left subtree reaches routing key"
                        );
                    }
                    ensure!(
                        self.comparator.compare(right_min, routing) != Ordering::Less,
                        "right subtree undercuts routing key"
                    );
                }

                for &child in &interior.children {
                    self.validate_node(child, false, depth + 1, walk)?;
                }
            }
        }

        Ok(())
    }

    fn subtree_min(&self, mut id: NodeId) -> &K {
        loop {
            match self.store.node(id) {
                Node::Interior(interior) => id = interior.children[0],
                Node::Leaf(leaf) => return leaf.keys.first().expect("non-empty leaf"),
            }
        }
    }

    fn subtree_max(&self, mut id: NodeId) -> &K {
        loop {
            match self.store.node(id) {
                Node::Interior(interior) => {
                    id = *interior.children.last().expect("interior has children")
                }
                Node::Leaf(leaf) => return leaf.keys.last().expect("non-empty leaf"),
            }
        }
    }
}

struct ValidationWalk {
    leaf_depth: Option<usize>,
    leaves: Vec<NodeId>,
    entries: usize,
    nodes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::OrdComparator;

    // A 64-byte budget keeps the fanout small enough that a handful of
    // keys exercises splits, merges and multi-level descent.
    type SmallMap = BPlusTree<i32, i32, OrdComparator, false, 64>;
    type SmallMulti = BPlusTree<i32, i32, OrdComparator, true, 64>;

    #[test]
    fn empty_tree_reports_nothing() {
        let tree = SmallMap::new();

        assert_eq!(tree.len(), 0);
        assert!(tree.is_empty());
        assert!(tree.get(&1).is_none());
        assert!(tree.first().is_none());
        assert!(tree.last().is_none());
    }

    #[test]
    fn erase_on_empty_tree_returns_false() {
        let mut tree = SmallMap::new();

        assert!(!tree.erase(&42));
    }

    #[test]
    fn insert_and_get_single_entry() {
        let mut tree = SmallMap::new();

        assert!(tree.insert(7, 70).unwrap());

        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(&7), Some(&70));
        assert!(tree.get(&8).is_none());
        tree.validate().unwrap();
    }

    #[test]
    fn unique_insert_overwrites_existing_value() {
        let mut tree = SmallMap::new();

        assert!(tree.insert(7, 70).unwrap());
        assert!(!tree.insert(7, 700).unwrap());

        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(&7), Some(&700));
        tree.validate().unwrap();
    }

    #[test]
    fn unique_overwrite_after_splits_hits_the_right_slot() {
        let mut tree = SmallMap::new();

        for i in 0..200 {
            tree.insert(i, i).unwrap();
        }
        for i in 0..200 {
            assert!(!tree.insert(i, i + 1000).unwrap());
        }

        assert_eq!(tree.len(), 200);
        for i in 0..200 {
            assert_eq!(tree.get(&i), Some(&(i + 1000)), "key {}", i);
        }
        tree.validate().unwrap();
    }

    #[test]
    fn sequential_insert_splits_and_stays_ordered() {
        let mut tree = SmallMap::new();

        for i in 0..500 {
            tree.insert(i, i * 10).unwrap();
        }

        assert_eq!(tree.len(), 500);
        tree.validate().unwrap();
        for i in 0..500 {
            assert_eq!(tree.get(&i), Some(&(i * 10)), "key {}", i);
        }
    }

    #[test]
    fn reverse_insert_splits_and_stays_ordered() {
        let mut tree = SmallMap::new();

        for i in (0..500).rev() {
            tree.insert(i, i).unwrap();
        }

        tree.validate().unwrap();
        let collected: Vec<i32> = tree.iter().map(|(k, _)| *k).collect();
        let expected: Vec<i32> = (0..500).collect();
        assert_eq!(collected, expected);
    }

    #[test]
    fn erase_everything_in_insertion_order() {
        let mut tree = SmallMap::new();

        for i in 0..300 {
            tree.insert(i, i).unwrap();
        }
        for i in 0..300 {
            assert!(tree.erase(&i), "key {}", i);
            if i % 37 == 0 {
                tree.validate().unwrap();
            }
        }

        assert_eq!(tree.len(), 0);
        assert!(tree.first().is_none());
        tree.validate().unwrap();
    }

    #[test]
    fn erase_everything_in_reverse_order() {
        let mut tree = SmallMap::new();

        for i in 0..300 {
            tree.insert(i, i).unwrap();
        }
        for i in (0..300).rev() {
            assert!(tree.erase(&i), "key {}", i);
            if i % 37 == 0 {
                tree.validate().unwrap();
            }
        }

        assert_eq!(tree.len(), 0);
        tree.validate().unwrap();
    }

    #[test]
    fn erase_missing_key_leaves_tree_intact() {
        let mut tree = SmallMap::new();

        for i in (0..100).step_by(2) {
            tree.insert(i, i).unwrap();
        }

        assert!(!tree.erase(&1));
        assert!(!tree.erase(&-5));
        assert!(!tree.erase(&1000));
        assert_eq!(tree.len(), 50);
        tree.validate().unwrap();
    }

    #[test]
    fn erase_interleaved_triggers_borrow_and_merge() {
        let mut tree = SmallMap::new();

        for i in 0..400 {
            tree.insert(i, i).unwrap();
        }
        // Knock out every other key first, then the rest, so minimal
        // leaves appear all over the tree.
        for i in (0..400).step_by(2) {
            assert!(tree.erase(&i));
        }
        tree.validate().unwrap();
        for i in (1..400).step_by(2) {
            assert!(tree.erase(&i));
        }

        assert!(tree.is_empty());
        tree.validate().unwrap();
    }

    #[test]
    fn root_collapse_restores_single_leaf() {
        let mut tree = SmallMap::new();

        for i in 0..50 {
            tree.insert(i, i).unwrap();
        }
        for i in 0..48 {
            assert!(tree.erase(&i));
        }

        assert_eq!(tree.len(), 2);
        tree.validate().unwrap();
        assert_eq!(tree.get(&48), Some(&48));
        assert_eq!(tree.get(&49), Some(&49));
    }

    #[test]
    fn clear_resets_and_is_reusable() {
        let mut tree = SmallMap::new();

        for i in 0..100 {
            tree.insert(i, i).unwrap();
        }
        tree.clear();

        assert_eq!(tree.len(), 0);
        assert!(tree.first().is_none());
        tree.validate().unwrap();

        tree.insert(5, 5).unwrap();
        assert_eq!(tree.get(&5), Some(&5));
        tree.validate().unwrap();
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut tree = SmallMap::new();

        tree.insert(1, 10).unwrap();
        *tree.get_mut(&1).unwrap() += 5;

        assert_eq!(tree.get(&1), Some(&15));
    }

    #[test]
    fn contains_key_matches_get() {
        let mut tree = SmallMap::new();

        for i in (0..200).step_by(3) {
            tree.insert(i, i).unwrap();
        }
        for i in 0..200 {
            assert_eq!(tree.contains_key(&i), tree.get(&i).is_some(), "key {}", i);
        }
    }

    #[test]
    fn multimap_keeps_duplicates_in_insertion_order() {
        let mut tree = SmallMulti::new();

        for round in 0..3 {
            for key in 0..40 {
                assert!(tree.insert(key, key * 10 + round).unwrap());
            }
        }

        assert_eq!(tree.len(), 120);
        tree.validate().unwrap();

        let collected: Vec<(i32, i32)> = tree.iter().map(|(k, v)| (*k, *v)).collect();
        let mut expected = Vec::new();
        for key in 0..40 {
            for round in 0..3 {
                expected.push((key, key * 10 + round));
            }
        }
        assert_eq!(collected, expected);
    }

    #[test]
    fn multimap_erase_removes_earliest_duplicate_first() {
        let mut tree = SmallMulti::new();

        tree.insert(5, 1).unwrap();
        tree.insert(5, 2).unwrap();
        tree.insert(5, 3).unwrap();

        assert!(tree.erase(&5));
        assert_eq!(tree.get(&5), Some(&2));
        assert!(tree.erase(&5));
        assert_eq!(tree.get(&5), Some(&3));
        assert!(tree.erase(&5));
        assert!(tree.get(&5).is_none());
        assert!(!tree.erase(&5));
    }

    #[test]
    fn multimap_long_duplicate_run_spans_leaves() {
        let mut tree = SmallMulti::new();

        // Neighbors on both sides plus a run far longer than one leaf.
        for i in 0..10 {
            tree.insert(i, -1).unwrap();
        }
        for serial in 0..60 {
            tree.insert(100, serial).unwrap();
        }
        for i in 200..210 {
            tree.insert(i, -1).unwrap();
        }
        tree.validate().unwrap();

        // The run must come back in insertion order.
        let run: Vec<i32> = tree.equal_range(&100).map(|(_, v)| *v).collect();
        assert_eq!(run, (0..60).collect::<Vec<_>>());

        // Erasing pops the front of the run each time, including when the
        // front sits in the successor leaf after rebalancing.
        for serial in 0..60 {
            assert_eq!(tree.get(&100), Some(&serial));
            assert!(tree.erase(&100), "serial {}", serial);
            tree.validate().unwrap();
        }
        assert!(tree.get(&100).is_none());
        assert_eq!(tree.len(), 20);
    }

    #[test]
    fn multimap_erase_interleaved_with_duplicates() {
        let mut tree = SmallMulti::new();

        for key in 0..30 {
            for serial in 0..5 {
                tree.insert(key, serial).unwrap();
            }
        }
        for serial in 0..5 {
            for key in 0..30 {
                assert_eq!(tree.get(&key), Some(&serial), "key {}", key);
                assert!(tree.erase(&key));
            }
            tree.validate().unwrap();
        }

        assert!(tree.is_empty());
    }

    #[test]
    fn bound_queries_require_an_exact_match() {
        let mut tree = SmallMap::new();

        for i in (10..100).step_by(10) {
            tree.insert(i, i).unwrap();
        }

        assert_eq!(*tree.lower_bound(&10).unwrap().key(), 10);
        assert_eq!(*tree.lower_bound(&50).unwrap().key(), 50);
        assert!(tree.lower_bound(&11).is_none());
        assert!(tree.lower_bound(&0).is_none());
        assert!(tree.lower_bound(&91).is_none());

        assert_eq!(*tree.upper_bound(&10).unwrap().key(), 20);
        assert_eq!(*tree.upper_bound(&80).unwrap().key(), 90);
        assert!(tree.upper_bound(&9).is_none());
        assert!(tree.upper_bound(&15).is_none());
        // The largest key matches but nothing follows it.
        assert!(tree.upper_bound(&90).is_none());
    }

    #[test]
    fn bounds_cross_leaf_boundaries() {
        let mut tree = SmallMap::new();

        for i in 0..200 {
            tree.insert(i * 2, i).unwrap();
        }

        // For every matched key the entry past it may live in the
        // successor leaf.
        for i in 0..199 {
            let key = i * 2;
            assert_eq!(*tree.lower_bound(&key).unwrap().key(), key);
            assert_eq!(*tree.upper_bound(&key).unwrap().key(), key + 2);
        }

        // Probes between keys match nothing and have no bound.
        for i in 0..199 {
            let probe = i * 2 + 1;
            assert!(tree.lower_bound(&probe).is_none());
            assert!(tree.upper_bound(&probe).is_none());
        }
    }

    #[test]
    fn multimap_upper_bound_skips_the_whole_run() {
        let mut tree = SmallMulti::new();

        for serial in 0..20 {
            tree.insert(5, serial).unwrap();
        }
        tree.insert(9, 0).unwrap();

        assert_eq!(*tree.lower_bound(&5).unwrap().key(), 5);
        assert_eq!(*tree.lower_bound(&5).unwrap().value(), 0);
        assert_eq!(*tree.upper_bound(&5).unwrap().key(), 9);
        assert!(tree.lower_bound(&6).is_none());
        assert!(tree.upper_bound(&9).is_none());
    }

    #[test]
    fn equal_range_delimits_exactly_the_run() {
        let mut tree = SmallMulti::new();

        for key in [1, 2, 2, 2, 3, 3, 5] {
            tree.insert(key, key).unwrap();
        }

        assert_eq!(tree.equal_range(&2).count(), 3);
        assert_eq!(tree.equal_range(&3).count(), 2);
        assert_eq!(tree.equal_range(&4).count(), 0);
        assert_eq!(tree.equal_range(&0).count(), 0);
        assert_eq!(tree.equal_range(&9).count(), 0);
    }

    #[test]
    fn find_positions_on_first_duplicate() {
        let mut tree = SmallMulti::new();

        for serial in 0..20 {
            tree.insert(7, serial).unwrap();
        }

        let cursor = tree.find(&7).unwrap();
        assert_eq!(*cursor.key(), 7);
        assert_eq!(*cursor.value(), 0);
    }

    #[test]
    fn iter_is_exact_sized_and_ordered() {
        let mut tree = SmallMap::new();

        for i in (0..150).rev() {
            tree.insert(i, i).unwrap();
        }

        let iter = tree.iter();
        assert_eq!(iter.len(), 150);
        let keys: Vec<i32> = iter.map(|(k, _)| *k).collect();
        assert_eq!(keys, (0..150).collect::<Vec<_>>());
    }

    #[test]
    fn cursor_mut_edits_value_in_place() {
        let mut tree = SmallMap::new();

        for i in 0..50 {
            tree.insert(i, 0).unwrap();
        }
        let mut cursor = tree.find_mut(&25).unwrap();
        *cursor.value_mut() = 99;

        assert_eq!(tree.get(&25), Some(&99));
    }

    #[test]
    fn fanout_floor_still_builds_a_working_tree() {
        // A budget far below the overhead clamps every capacity to the
        // floor of 3.
        let mut tree: BPlusTree<i64, i64, OrdComparator, false, 16> = BPlusTree::new();
        assert_eq!(BPlusTree::<i64, i64, OrdComparator, false, 16>::FANOUT.leaf_max, 3);

        for i in 0..200 {
            tree.insert(i, i).unwrap();
        }
        tree.validate().unwrap();
        for i in (0..200).step_by(2) {
            assert!(tree.erase(&i));
        }
        tree.validate().unwrap();
        assert_eq!(tree.len(), 100);
    }

    #[test]
    fn custom_comparator_reverses_iteration_order() {
        let reverse = |a: &i32, b: &i32| b.cmp(a);
        let mut tree: BPlusTree<i32, i32, _, false, 64> = BPlusTree::with_comparator(reverse);

        for i in 0..100 {
            tree.insert(i, i).unwrap();
        }

        tree.validate().unwrap();
        let keys: Vec<i32> = tree.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, (0..100).rev().collect::<Vec<_>>());
    }
}
