//! Index footer: a rebuildable accelerator written at checkpoint time.
//!
//! The footer is never a source of truth — it is a "hint"
//! that is rebuilt from scratch if its own CRC fails. Layout:
//! `entry_count u32 | entries... | tag_count u32 | tag_entries... | crc32 u32`
//! where each id entry is `id 16B | offset u64 | len u32` and each tag entry
//! is `text_len u32 | text | id_count u32 | ids...` (16 bytes each).

use crate::error::FormatError;
use edb_core::EntityId;
use std::collections::HashMap;

/// One entity's location in the main file, as recorded in the footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdEntry {
    /// Entity identity.
    pub id: EntityId,
    /// Byte offset of its record in `entities.db`.
    pub offset: u64,
    /// Encoded length of the record, including the `record_len` prefix and CRC suffix.
    pub len: u32,
}

/// The full index footer: id locations plus the inverted tag map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexFooter {
    /// Sorted by id for deterministic encoding.
    pub entries: Vec<IdEntry>,
    /// Every distinct tag text ever written, mapped to the ids that carry it
    /// at any point in their history (a hint for `list_by_tag`; exactness is
    /// reverified against the main file by the index layer on load).
    pub tag_index: HashMap<String, Vec<EntityId>>,
}

impl IndexFooter {
    /// Encode the footer to its on-disk byte representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(self.entries.len() as u32).to_le_bytes());
        for e in &self.entries {
            out.extend_from_slice(e.id.as_bytes());
            out.extend_from_slice(&e.offset.to_le_bytes());
            out.extend_from_slice(&e.len.to_le_bytes());
        }

        // Deterministic tag ordering keeps byte-identical footers across
        // checkpoints of an unchanged index, which is handy in tests.
        let mut tags: Vec<&String> = self.tag_index.keys().collect();
        tags.sort();
        out.extend_from_slice(&(tags.len() as u32).to_le_bytes());
        for tag in tags {
            let ids = &self.tag_index[tag];
            let text_bytes = tag.as_bytes();
            out.extend_from_slice(&(text_bytes.len() as u32).to_le_bytes());
            out.extend_from_slice(text_bytes);
            out.extend_from_slice(&(ids.len() as u32).to_le_bytes());
            for id in ids {
                out.extend_from_slice(id.as_bytes());
            }
        }

        let crc = crc32fast::hash(&out);
        out.extend_from_slice(&crc.to_le_bytes());
        out
    }

    /// Decode a footer previously written by [`IndexFooter::to_bytes`].
    ///
    /// Returns [`FormatError::ChecksumMismatch`] if the trailing CRC does not
    /// match; callers are expected to treat that as "rebuild from scratch"
    /// rather than a fatal error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < 8 {
            return Err(FormatError::TruncatedRecord {
                needed: 8,
                available: bytes.len(),
            });
        }
        let crc_offset = bytes.len() - 4;
        let expected_crc = u32::from_le_bytes(bytes[crc_offset..].try_into().unwrap());
        let actual_crc = crc32fast::hash(&bytes[..crc_offset]);
        if expected_crc != actual_crc {
            return Err(FormatError::ChecksumMismatch {
                expected: expected_crc,
                actual: actual_crc,
            });
        }

        let mut cursor = 0usize;
        let entry_count = read_u32(bytes, &mut cursor)?;
        let mut entries = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            let id = read_id(bytes, &mut cursor)?;
            let offset = read_u64(bytes, &mut cursor)?;
            let len = read_u32(bytes, &mut cursor)?;
            entries.push(IdEntry { id, offset, len });
        }

        let tag_count = read_u32(bytes, &mut cursor)?;
        let mut tag_index = HashMap::with_capacity(tag_count as usize);
        for _ in 0..tag_count {
            let text_len = read_u32(bytes, &mut cursor)? as usize;
            need(bytes, cursor, text_len)?;
            let text = String::from_utf8(bytes[cursor..cursor + text_len].to_vec())?;
            cursor += text_len;
            let id_count = read_u32(bytes, &mut cursor)?;
            let mut ids = Vec::with_capacity(id_count as usize);
            for _ in 0..id_count {
                ids.push(read_id(bytes, &mut cursor)?);
            }
            tag_index.insert(text, ids);
        }

        Ok(Self { entries, tag_index })
    }
}

fn need(bytes: &[u8], cursor: usize, len: usize) -> Result<(), FormatError> {
    if bytes.len() < cursor + len {
        return Err(FormatError::TruncatedRecord {
            needed: cursor + len,
            available: bytes.len(),
        });
    }
    Ok(())
}

fn read_u32(bytes: &[u8], cursor: &mut usize) -> Result<u32, FormatError> {
    need(bytes, *cursor, 4)?;
    let v = u32::from_le_bytes(bytes[*cursor..*cursor + 4].try_into().unwrap());
    *cursor += 4;
    Ok(v)
}

fn read_u64(bytes: &[u8], cursor: &mut usize) -> Result<u64, FormatError> {
    need(bytes, *cursor, 8)?;
    let v = u64::from_le_bytes(bytes[*cursor..*cursor + 8].try_into().unwrap());
    *cursor += 8;
    Ok(v)
}

fn read_id(bytes: &[u8], cursor: &mut usize) -> Result<EntityId, FormatError> {
    need(bytes, *cursor, 16)?;
    let mut raw = [0u8; 16];
    raw.copy_from_slice(&bytes[*cursor..*cursor + 16]);
    *cursor += 16;
    Ok(EntityId::from_bytes(raw))
}
