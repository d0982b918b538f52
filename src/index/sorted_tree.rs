//! The required sorted-tree [`Index`] implementation: a
//! `BTreeMap<Vec<u8>, RecordPosition>` behind a reader-writer lock.
//!
//! This is the direct generalization of the teacher's
//! `KeyDir = BTreeMap<Vec<u8>, (u64, u32)>` from a single-file offset+len
//! pair to the segmented model's `{file_id, offset}` position.

use std::collections::BTreeMap;
use std::sync::RwLock;

use super::Index;
use crate::record::RecordPosition;

/// Keys compare lexicographically by unsigned byte value, which is exactly
/// `Vec<u8>`'s `Ord` impl — no custom comparator needed.
pub(crate) struct SortedTreeIndex {
    tree: RwLock<BTreeMap<Vec<u8>, RecordPosition>>,
}

impl SortedTreeIndex {
    pub(crate) fn new() -> Self {
        Self { tree: RwLock::new(BTreeMap::new()) }
    }
}

impl Index for SortedTreeIndex {
    fn put(&self, key: Vec<u8>, position: RecordPosition) -> bool {
        let mut tree = self.tree.write().expect("index lock poisoned");
        tree.insert(key, position);
        true
    }

    fn get(&self, key: &[u8]) -> Option<RecordPosition> {
        let tree = self.tree.read().expect("index lock poisoned");
        tree.get(key).copied()
    }

    fn delete(&self, key: &[u8]) -> bool {
        let mut tree = self.tree.write().expect("index lock poisoned");
        tree.remove(key).is_some()
    }

    fn keys(&self) -> Vec<Vec<u8>> {
        let tree = self.tree.read().expect("index lock poisoned");
        tree.keys().cloned().collect()
    }

    fn len(&self) -> usize {
        let tree = self.tree.read().expect("index lock poisoned");
        tree.len()
    }
}
