//! Id index: `id -> file offset`, O(1) lookup.

use edb_core::EntityId;
use std::collections::HashMap;

/// Maps every non-purged entity id to the byte offset of its most recent
/// record in `entities.db`.
///
/// Rebuildable from a full scan of the main file alone — this structure,
/// like every index in this crate, is an accelerator, never the source of
/// truth.
#[derive(Debug, Clone, Default)]
pub struct IdIndex {
    offsets: HashMap<EntityId, u64>,
}

impl IdIndex {
    /// An empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or overwrite) `id`'s offset.
    pub fn insert(&mut self, id: EntityId, offset: u64) {
        self.offsets.insert(id, offset);
    }

    /// Drop `id` from the index (called on purge).
    pub fn remove(&mut self, id: EntityId) -> Option<u64> {
        self.offsets.remove(&id)
    }

    /// The offset of `id`'s most recent record, if present.
    pub fn get(&self, id: &EntityId) -> Option<u64> {
        self.offsets.get(id).copied()
    }

    /// True if `id` is tracked.
    pub fn contains(&self, id: &EntityId) -> bool {
        self.offsets.contains_key(id)
    }

    /// Number of tracked ids.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// True if no ids are tracked.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Every tracked id, in arbitrary order.
    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.offsets.keys()
    }

    /// Rebuild from scratch given an iterator of `(id, offset)` pairs, as
    /// produced by a full scan of the main file. Later entries for the same
    /// id win, matching append-only overwrite semantics.
    pub fn rebuild(entries: impl IntoIterator<Item = (EntityId, u64)>) -> Self {
        let mut index = Self::new();
        for (id, offset) in entries {
            index.insert(id, offset);
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let mut idx = IdIndex::new();
        let id = EntityId::new();
        idx.insert(id, 64);
        assert_eq!(idx.get(&id), Some(64));
    }

    #[test]
    fn remove_drops_entry() {
        let mut idx = IdIndex::new();
        let id = EntityId::new();
        idx.insert(id, 64);
        assert_eq!(idx.remove(id), Some(64));
        assert!(!idx.contains(&id));
    }

    #[test]
    fn rebuild_keeps_latest_offset_for_duplicate_ids() {
        let id = EntityId::new();
        let idx = IdIndex::rebuild(vec![(id, 10), (id, 20)]);
        assert_eq!(idx.get(&id), Some(20));
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn empty_index_reports_empty() {
        assert!(IdIndex::new().is_empty());
    }
}
