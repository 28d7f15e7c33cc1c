//! # B+Tree Engine
//!
//! The parameterized B+tree underneath the container façades. The design
//! follows three rules:
//!
//! - **Arena addressing.** Nodes live in a per-tree slab and reference
//!   each other by 32-bit ids, never by pointer. The parent's child link
//!   is the owning reference; the doubly-linked leaf chain is a pair of
//!   non-owning ids, so ownership stays a tree even though the chain is a
//!   list.
//!
//! - **Typed nodes, derived capacities.** A node is an interior
//!   (routing keys + child ids) or a leaf (keys + values + sibling ids).
//!   Capacities come from a byte budget through the [`Fanout`] formulas,
//!   clamped to a floor of 3, all evaluated at compile time per
//!   instantiation.
//!
//! - **Top-down maintenance.** Insert splits any full child before
//!   stepping into it; erase rebalances or merges any minimal child
//!   before stepping into it. Both walk the root-to-leaf path exactly
//!   once and never revisit ancestors, so every operation is O(depth)
//!   with no parent stack.
//!
//! ## Module Layout
//!
//! - [`layout`]: byte-budget accounting and the six fanout constants
//! - `store`: the node arena (`NodeId`-addressed slab with a free list)
//! - `node`: interior/leaf node representation and state predicates
//! - [`search`]: per-node binary searches (exact, lower, upper)
//! - `tree`: [`BPlusTree`]: descent, split, rebalance, merge, validate
//! - `cursor`: [`Cursor`]/[`CursorMut`] and the iterator adapters

pub mod layout;
pub mod search;

mod cursor;
mod node;
mod store;
#[allow(clippy::module_inception)]
mod tree;

pub use cursor::{Cursor, CursorMut, EqualRange, Iter};
pub use layout::{Fanout, DEFAULT_NODE_SIZE, MIN_FANOUT};
pub use search::SearchResult;
pub use tree::BPlusTree;
