//! In-memory indexes: id -> offset, tag -> ids (with namespace/wildcard
//! support), and the per-entity temporal cut used by as-of queries.
//!
//! Every structure here is rebuildable from `entities.db` alone; none is a
//! source of truth.

#![warn(missing_docs)]

pub mod id_index;
pub mod tag_index;
pub mod temporal;

pub use id_index::IdIndex;
pub use tag_index::TagIndex;
pub use temporal::TemporalSkiplist;
