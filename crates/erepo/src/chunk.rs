//! Content chunking: splitting oversized content into child entities on
//! write, and reassembling it on read.
//!
//! Grounded on `core/src/limits.rs`'s `Limits` struct for the thresholds;
//! chunk identity is pure arena+index addressing (`<parent>-chunk-<i>`, no
//! back-pointers). A [`ChunkId`] is an addressing key,
//! not storable on its own — [`entity_id_for`] derives the 128-bit id the
//! child is actually stored under, deterministically from the parent and
//! index, so no separate parent/child lookup table is needed.

use edb_core::{ChunkId, EntityId, Limits, Tag, TimestampNs};

/// Deterministically derive the [`EntityId`] a chunk child is stored under.
///
/// Mixes the index into the low bytes of the parent's id and flips one bit
/// of the high byte so a chunk's id can never collide with its own parent;
/// collisions across distinct parents are no more likely than two random
/// ids colliding.
pub fn entity_id_for(chunk: ChunkId) -> EntityId {
    let mut bytes = *chunk.parent.as_bytes();
    bytes[0] ^= 0xC3;
    let index_bytes = chunk.index.to_le_bytes();
    for (b, i) in bytes[12..16].iter_mut().zip(index_bytes) {
        *b ^= i;
    }
    EntityId::from_bytes(bytes)
}

/// The three tags stamped on a chunked parent.
pub fn parent_tags(t_ns: TimestampNs, chunk_count: u32, chunk_size: usize, total_len: usize) -> Vec<Tag> {
    vec![
        Tag::new(t_ns, format!("content:chunks:{chunk_count}")),
        Tag::new(t_ns, format!("content:chunk-size:{chunk_size}")),
        Tag::new(t_ns, format!("content:size:{total_len}")),
    ]
}

/// The tags stamped on a chunk child: its type, parent back-reference, and index.
pub fn child_tags(t_ns: TimestampNs, parent: EntityId, index: u32) -> Vec<Tag> {
    vec![
        Tag::new(t_ns, "type:chunk"),
        Tag::new(t_ns, format!("content:parent:{parent}")),
        Tag::new(t_ns, format!("content:chunk-index:{index}")),
    ]
}

/// One chunk child ready to be written: its storage id, index, and bytes.
pub struct ChunkPiece {
    /// The id this piece is stored under.
    pub id: EntityId,
    /// Zero-based position within the parent's content.
    pub index: u32,
    /// This piece's slice of the original content.
    pub bytes: Vec<u8>,
}

/// Split `content` into `chunk_size`-sized pieces, in order.
pub fn split(parent: EntityId, content: &[u8], chunk_size: usize) -> Vec<ChunkPiece> {
    content
        .chunks(chunk_size.max(1))
        .enumerate()
        .map(|(i, slice)| {
            let index = i as u32;
            ChunkPiece {
                id: entity_id_for(parent.chunk_id(index)),
                index,
                bytes: slice.to_vec(),
            }
        })
        .collect()
}

/// Parse the `content:chunks:N` tag value, if present.
pub fn chunk_count(tags: &[Tag]) -> Option<u32> {
    tags.iter()
        .find(|t| t.text.starts_with("content:chunks:"))
        .and_then(|t| t.value().rsplit(':').next())
        .and_then(|s| s.parse().ok())
}

/// True if `content.len()` exceeds the auto-chunk threshold.
pub fn needs_chunking(content_len: usize, limits: &Limits) -> bool {
    content_len >= limits.auto_chunk_threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_produces_expected_chunk_count_and_sizes() {
        let parent = EntityId::new();
        let content = vec![0u8; 10];
        let pieces = split(parent, &content, 4);
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[0].bytes.len(), 4);
        assert_eq!(pieces[2].bytes.len(), 2);
    }

    #[test]
    fn chunk_entity_ids_are_deterministic_and_distinct() {
        let parent = EntityId::new();
        let a = entity_id_for(parent.chunk_id(0));
        let b = entity_id_for(parent.chunk_id(0));
        let c = entity_id_for(parent.chunk_id(1));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, parent);
    }

    #[test]
    fn chunk_count_reads_back_from_parent_tags() {
        let tags = parent_tags(1, 5, 1024, 5000);
        assert_eq!(chunk_count(&tags), Some(5));
    }

    #[test]
    fn needs_chunking_respects_threshold() {
        let limits = Limits::with_small_limits();
        assert!(!needs_chunking(limits.auto_chunk_threshold - 1, &limits));
        assert!(needs_chunking(limits.auto_chunk_threshold, &limits));
    }
}
