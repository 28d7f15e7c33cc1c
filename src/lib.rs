//! # ordtree - In-Memory B+Tree Ordered Containers
//!
//! ordtree provides three ordered associative containers backed by a
//! cache-friendly in-memory B+tree: a unique-key map, a duplicate-key
//! multimap and a unique-key set. Keys are ordered by a pluggable
//! three-way [`Comparator`], nodes are sized from a compile-time byte
//! budget, and all entries live in leaves linked into a doubly-linked
//! chain for bidirectional iteration.
//!
//! ## Quick Start
//!
//! ```
//! use ordtree::TreeMap;
//!
//! let mut map: TreeMap<i64, &str> = TreeMap::new();
//! map.insert(2, "two")?;
//! map.insert(1, "one")?;
//! map.insert(3, "three")?;
//!
//! assert_eq!(map.get(&2), Some(&"two"));
//! let keys: Vec<i64> = map.iter().map(|(k, _)| *k).collect();
//! assert_eq!(keys, [1, 2, 3]);
//! # Ok::<(), eyre::Report>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Façades (TreeMap / TreeMultimap /      │
//! │           TreeSet)                      │
//! ├─────────────────────────────────────────┤
//! │  BPlusTree core                         │
//! │  (descent, split, rebalance, merge)     │
//! ├──────────────────┬──────────────────────┤
//! │  Search          │  Cursors             │
//! │  (per-node       │  (leaf-chain         │
//! │   binary search) │   iteration)         │
//! ├──────────────────┴──────────────────────┤
//! │  Nodes (interior / leaf, fanout-sized)  │
//! ├─────────────────────────────────────────┤
//! │  Node arena (id-addressed slab)         │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Design Highlights
//!
//! - **Proactive descent.** Insert splits full children and erase
//!   rebalances or merges minimal children on the way down, so a single
//!   root-to-leaf pass maintains every invariant and no operation walks
//!   back up the tree.
//! - **Byte-budget fanout.** Node capacities are derived from a
//!   `NODE_SIZE` const parameter (default 256) and the key/value sizes,
//!   keeping the key arrays of a node within a couple of cache lines.
//! - **Statically checked cursor invalidation.** Cursors borrow the
//!   tree; code that mutates the tree while holding one does not compile.
//! - **Duplicate insertion order.** In the multimap, equal keys iterate
//!   in insertion order and erase removes the earliest occurrence.
//!
//! ## Module Overview
//!
//! - [`tree`]: the parameterized B+tree engine and its cursors
//! - [`comparator`]: the ordering seam
//! - [`map`], [`multimap`], [`set`]: the public container façades

pub mod comparator;
pub mod map;
pub mod multimap;
pub mod set;
pub mod tree;

pub use comparator::{Comparator, OrdComparator};
pub use map::TreeMap;
pub use multimap::TreeMultimap;
pub use set::TreeSet;
pub use tree::{BPlusTree, Cursor, CursorMut, EqualRange, Fanout, Iter, DEFAULT_NODE_SIZE};
