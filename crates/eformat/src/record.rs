//! Entity record encode/decode — the repeating unit of `entities.db`.
//!
//! Layout (little-endian):
//! `record_len u32 | id 16B | created_at i64 | updated_at i64 | state u8 |
//!  tag_count u32 | tags... | content_len u32 | content_bytes | crc32 u32`
//!
//! `record_len` counts every byte that follows it, including the trailing
//! CRC. The CRC is computed over every byte from the start of the record
//! (including `record_len`) up to, but excluding, the CRC field itself.

use crate::error::FormatError;
use edb_core::{EntityId, LifecycleState, Tag};

/// One decoded entity record plus how many bytes it occupied on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRecord {
    /// Entity identity.
    pub id: EntityId,
    /// System-assigned creation time, ns.
    pub created_at: i64,
    /// System-assigned last-update time, ns.
    pub updated_at: i64,
    /// Lifecycle state at the time this record was written.
    pub state: LifecycleState,
    /// Temporal tags, in append order.
    pub tags: Vec<Tag>,
    /// Raw content bytes; empty when the entity is chunked.
    pub content: Vec<u8>,
}

/// Encode an entity record to its on-disk byte representation.
pub fn encode_entity_record(r: &EntityRecord) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(r.id.as_bytes());
    body.extend_from_slice(&r.created_at.to_le_bytes());
    body.extend_from_slice(&r.updated_at.to_le_bytes());
    body.push(r.state.as_byte());
    body.extend_from_slice(&(r.tags.len() as u32).to_le_bytes());
    for tag in &r.tags {
        body.extend_from_slice(&tag.t_ns.to_le_bytes());
        let text_bytes = tag.text.as_bytes();
        body.extend_from_slice(&(text_bytes.len() as u32).to_le_bytes());
        body.extend_from_slice(text_bytes);
    }
    body.extend_from_slice(&(r.content.len() as u32).to_le_bytes());
    body.extend_from_slice(&r.content);

    // record_len counts everything after the record_len field, including
    // the trailing CRC (4 bytes).
    let record_len = (body.len() + 4) as u32;
    let mut out = Vec::with_capacity(4 + body.len() + 4);
    out.extend_from_slice(&record_len.to_le_bytes());
    out.extend_from_slice(&body);
    let crc = crc32fast::hash(&out);
    out.extend_from_slice(&crc.to_le_bytes());
    out
}

/// Decode one entity record starting at the front of `bytes`.
///
/// Returns the decoded record and the number of bytes it consumed, so the
/// caller can advance its read cursor.
pub fn decode_entity_record(bytes: &[u8]) -> Result<(EntityRecord, usize), FormatError> {
    if bytes.len() < 4 {
        return Err(FormatError::TruncatedRecord {
            needed: 4,
            available: bytes.len(),
        });
    }
    let record_len = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
    let total_len = 4 + record_len;
    if bytes.len() < total_len {
        return Err(FormatError::TruncatedRecord {
            needed: total_len,
            available: bytes.len(),
        });
    }
    let crc_offset = total_len - 4;
    let expected_crc = u32::from_le_bytes(bytes[crc_offset..total_len].try_into().unwrap());
    let actual_crc = crc32fast::hash(&bytes[..crc_offset]);
    if expected_crc != actual_crc {
        return Err(FormatError::ChecksumMismatch {
            expected: expected_crc,
            actual: actual_crc,
        });
    }

    let mut cursor = 4usize;
    let mut id_bytes = [0u8; 16];
    id_bytes.copy_from_slice(&bytes[cursor..cursor + 16]);
    let id = EntityId::from_bytes(id_bytes);
    cursor += 16;

    let created_at = i64::from_le_bytes(bytes[cursor..cursor + 8].try_into().unwrap());
    cursor += 8;
    let updated_at = i64::from_le_bytes(bytes[cursor..cursor + 8].try_into().unwrap());
    cursor += 8;

    let state_byte = bytes[cursor];
    cursor += 1;
    let state = LifecycleState::from_byte(state_byte).ok_or(FormatError::TruncatedRecord {
        needed: cursor + 1,
        available: bytes.len(),
    })?;

    let tag_count = u32::from_le_bytes(bytes[cursor..cursor + 4].try_into().unwrap());
    cursor += 4;

    let mut tags = Vec::with_capacity(tag_count as usize);
    for _ in 0..tag_count {
        let t_ns = i64::from_le_bytes(bytes[cursor..cursor + 8].try_into().unwrap());
        cursor += 8;
        let len = u32::from_le_bytes(bytes[cursor..cursor + 4].try_into().unwrap()) as usize;
        cursor += 4;
        let text = String::from_utf8(bytes[cursor..cursor + len].to_vec())?;
        cursor += len;
        tags.push(Tag { t_ns, text });
    }

    let content_len = u32::from_le_bytes(bytes[cursor..cursor + 4].try_into().unwrap()) as usize;
    cursor += 4;
    let content = bytes[cursor..cursor + content_len].to_vec();

    Ok((
        EntityRecord {
            id,
            created_at,
            updated_at,
            state,
            tags,
            content,
        },
        total_len,
    ))
}
