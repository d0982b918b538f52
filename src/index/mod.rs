//! The in-memory key index: maps a key to the position of its most recent
//! live record. See spec.md §4.4.

mod sorted_tree;

pub(crate) use sorted_tree::SortedTreeIndex;

use crate::error::{Error, Result};
use crate::options::IndexKind;
use crate::record::RecordPosition;

/// Capability set a key index must provide. Polymorphic: the engine holds
/// a `Box<dyn Index>` and never depends on a concrete implementation.
///
/// Implementations must be safe for single-writer / multi-reader access;
/// the engine serializes `put`/`delete` under its own write lock but
/// `get` may run concurrently with those, so implementations guard their
/// own internal state (the reference implementation uses a
/// `std::sync::RwLock`).
pub(crate) trait Index: Send + Sync {
    /// Inserts or replaces the position for `key`. Returns `true` on
    /// success; the sorted-tree implementation always succeeds.
    fn put(&self, key: Vec<u8>, position: RecordPosition) -> bool;
    /// Returns the current position for `key`, or `None` if absent.
    fn get(&self, key: &[u8]) -> Option<RecordPosition>;
    /// Removes `key`. Returns `true` iff an entry existed.
    fn delete(&self, key: &[u8]) -> bool;
    /// Returns every live key, in index order.
    fn keys(&self) -> Vec<Vec<u8>>;
    /// Returns the number of live keys.
    fn len(&self) -> usize;
}

/// Builds the index implementation selected by `kind`.
///
/// Selecting [`IndexKind::AdaptiveRadixTree`] is a valid configuration
/// value but has no implementation yet; it is a fatal configuration error
/// at open time, per spec.md §4.4.
pub(crate) fn new_index(kind: IndexKind) -> Result<Box<dyn Index>> {
    match kind {
        IndexKind::SortedTree => Ok(Box::new(SortedTreeIndex::new())),
        IndexKind::AdaptiveRadixTree => {
            Err(Error::config_invalid("adaptive radix tree index is not implemented"))
        }
    }
}
