//! Per-entity temporal skiplist: binary search for "state as of time T".
//!
//! An entity's tag list is kept in non-decreasing `t_ns` order by the write
//! path (append-only, stamped with the current wall clock), so this is a
//! thin `partition_point` wrapper rather than a standalone owned structure,
//! generalized from a `BTreeMap<Timestamp, HashSet<Key>>` binary-searched
//! via `.range(..=now)` to the read-only, per-entity case where the entries
//! already live in the entity's own `Vec`.

use edb_core::Tag;

/// A read-only view over one entity's tags, ordered by `t_ns`.
///
/// Ties on `t_ns` break by insertion (vector) order, matching the
/// ordering guarantee — `partition_point` preserves this because it only
/// ever looks at the `t_ns <= cutoff` predicate, never re-sorts.
pub struct TemporalSkiplist<'a> {
    tags: &'a [Tag],
}

impl<'a> TemporalSkiplist<'a> {
    /// Wrap an entity's tag list, assumed to already be in non-decreasing
    /// `t_ns` order (the invariant the write path maintains).
    pub fn new(tags: &'a [Tag]) -> Self {
        Self { tags }
    }

    /// Index one past the last tag with `t_ns <= cutoff` — i.e. the number
    /// of tags visible at `cutoff`.
    pub fn cut_index(&self, cutoff: i64) -> usize {
        self.tags.partition_point(|t| t.t_ns <= cutoff)
    }

    /// The tags visible at `cutoff`: every tag with `t_ns <= cutoff`.
    pub fn as_of(&self, cutoff: i64) -> &'a [Tag] {
        &self.tags[..self.cut_index(cutoff)]
    }

    /// True if this entity had any tag at all by `cutoff` — i.e. it existed.
    pub fn existed_at(&self, cutoff: i64) -> bool {
        self.cut_index(cutoff) > 0
    }
}
