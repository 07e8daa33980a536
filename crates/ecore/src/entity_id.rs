//! Entity identifier: a 128-bit id displayed as 32 lowercase hex characters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for an entity.
///
/// Wraps a UUID v4 but displays/parses as plain 32-char lowercase hex
/// (no hyphens), matching the on-disk `id` field's 16 raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Generate a new random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Construct from raw 16 bytes (as stored in the EBF record).
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Raw 16 bytes, as written to the EBF record.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Parse from a 32-char hex string (with or without hyphens).
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }

    /// Derive the id of chunk `index` belonging to this parent.
    ///
    /// Deterministic: `<parent>-chunk-<i>`. Chunk children are discovered by
    /// this derivation rather than a stored back-pointer.
    pub fn chunk_id(&self, index: u32) -> ChunkId {
        ChunkId {
            parent: *self,
            index,
        }
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for EntityId {
    type Err = EntityIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or(EntityIdParseError)
    }
}

/// Error returned when a string does not parse as an [`EntityId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid entity id")]
pub struct EntityIdParseError;

/// Identity of a chunk child: `<parent>-chunk-<index>`.
///
/// Pure arena+index addressing — chunk children have no independent
/// identity beyond their parent and position, so no cycle is representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkId {
    /// The parent entity that owns this chunk.
    pub parent: EntityId,
    /// Zero-based chunk index.
    pub index: u32,
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-chunk-{}", self.parent, self.index)
    }
}
