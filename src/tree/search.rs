//! # Per-Node Search Primitives
//!
//! Three binary searches over the sorted key array of a single node. All
//! of them report a slot position together with whether an equal key was
//! observed, which the descent logic uses to steer duplicate handling.
//!
//! - [`exact`]: any matching slot, or the insertion point on a miss.
//! - [`lower_bound`]: the first slot whose key is `>=` the probe.
//! - [`upper_bound`]: the first slot whose key is `>` the probe.
//!
//! `lower_bound` and `upper_bound` both report `Found` when equality was
//! seen anywhere during the bisection, even though the returned position
//! may not hold an equal key (for `upper_bound` it never does).

use std::cmp::Ordering;

use crate::comparator::Comparator;

/// Outcome of a node-local key search: a slot index, tagged with whether
/// the probe key was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchResult {
    Found(usize),
    NotFound(usize),
}

impl SearchResult {
    /// The slot position regardless of match outcome.
    #[inline]
    pub fn pos(self) -> usize {
        match self {
            SearchResult::Found(pos) | SearchResult::NotFound(pos) => pos,
        }
    }

    #[inline]
    pub fn is_found(self) -> bool {
        matches!(self, SearchResult::Found(_))
    }
}

/// Classic binary search. `Found(pos)` is a matching slot (not necessarily
/// the first of an equal run); `NotFound(pos)` is the first slot with a
/// key greater than the probe.
pub(crate) fn exact<K, C: Comparator<K>>(keys: &[K], key: &K, comp: &C) -> SearchResult {
    let mut left = 0;
    let mut right = keys.len();

    while left < right {
        let mid = (left + right) / 2;
        match comp.compare(&keys[mid], key) {
            Ordering::Less => left = mid + 1,
            Ordering::Greater => right = mid,
            Ordering::Equal => return SearchResult::Found(mid),
        }
    }

    SearchResult::NotFound(left)
}

/// Position of the first slot with a key `>=` the probe; `Found` iff an
/// equal key was seen, in which case the position holds the first equal
/// key.
pub(crate) fn lower_bound<K, C: Comparator<K>>(keys: &[K], key: &K, comp: &C) -> SearchResult {
    let mut left = 0;
    let mut right = keys.len();
    let mut found = false;

    while left != right {
        // Invariant: keys[left - 1] < key and keys[right] >= key.
        let mid = (left + right) / 2;
        match comp.compare(&keys[mid], key) {
            Ordering::Less => left = mid + 1,
            Ordering::Greater => right = mid,
            Ordering::Equal => {
                right = mid;
                found = true;
            }
        }
    }

    if found {
        SearchResult::Found(left)
    } else {
        SearchResult::NotFound(left)
    }
}

/// Position of the first slot with a key `>` the probe; `Found` iff an
/// equal key was seen (the position is then one past the last equal key).
pub(crate) fn upper_bound<K, C: Comparator<K>>(keys: &[K], key: &K, comp: &C) -> SearchResult {
    let mut left = 0;
    let mut right = keys.len();
    let mut found = false;

    while left != right {
        // Invariant: keys[left - 1] <= key and keys[right] > key.
        let mid = (left + right) / 2;
        match comp.compare(&keys[mid], key) {
            Ordering::Less => left = mid + 1,
            Ordering::Greater => right = mid,
            Ordering::Equal => {
                left = mid + 1;
                found = true;
            }
        }
    }

    if found {
        SearchResult::Found(left)
    } else {
        SearchResult::NotFound(left)
    }
}
