//! WAL entry vocabulary: the six named operations, plus their
//! on-disk payload encoding.

use crate::error::WalError;
use edb_core::{EntityId, LifecycleState, Tag};

/// One logical mutation recorded in the WAL.
///
/// A single repository call may emit several entries (e.g. `update` emits
/// one per appended tag) followed by a [`WalEntry::Commit`] that closes the
/// transaction; see `edb-wal`'s writer for the grouping contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalEntry {
    /// A brand-new entity: initial tags and content.
    Create {
        /// The new entity's id.
        id: EntityId,
        /// Initial temporal tags, already timestamped.
        tags: Vec<Tag>,
        /// Initial content bytes (empty if the entity will be chunked).
        content: Vec<u8>,
    },
    /// Replace an entity's content and append new tags.
    Update {
        /// Target entity.
        id: EntityId,
        /// Tags appended by this update, already timestamped.
        tags: Vec<Tag>,
        /// New content bytes, or `None` to leave content unchanged.
        content: Option<Vec<u8>>,
    },
    /// Append a single tag (the `add_tag` operation).
    AddTag {
        /// Target entity.
        id: EntityId,
        /// The tag being added.
        tag: Tag,
    },
    /// Remove a set of tags outright — used by the retention worker to prune
    /// `value:*` tags past their window. Unlike every other entry, this is
    /// the one operation that is not purely append-only at the tag-list
    /// level, per the "may be compacted by retention" carve-out.
    DeleteTagSet {
        /// Target entity.
        id: EntityId,
        /// Exact tag texts to remove (all occurrences, any timestamp).
        tags: Vec<String>,
    },
    /// Transition an entity's lifecycle state.
    SetState {
        /// Target entity.
        id: EntityId,
        /// The new lifecycle state.
        state: LifecycleState,
        /// Timestamp the transition is recorded at.
        t_ns: i64,
    },
    /// Closes a transaction. Every group of entries sharing one logical
    /// write ends with exactly one `Commit`; recovery discards any group
    /// that is not terminated by a valid `Commit` frame.
    Commit,
}

const OP_CREATE: u8 = 0;
const OP_UPDATE: u8 = 1;
const OP_ADD_TAG: u8 = 2;
const OP_DELETE_TAG_SET: u8 = 3;
const OP_SET_STATE: u8 = 4;
const OP_COMMIT: u8 = 5;

impl WalEntry {
    /// The op byte this entry encodes as.
    pub fn op_byte(&self) -> u8 {
        match self {
            WalEntry::Create { .. } => OP_CREATE,
            WalEntry::Update { .. } => OP_UPDATE,
            WalEntry::AddTag { .. } => OP_ADD_TAG,
            WalEntry::DeleteTagSet { .. } => OP_DELETE_TAG_SET,
            WalEntry::SetState { .. } => OP_SET_STATE,
            WalEntry::Commit => OP_COMMIT,
        }
    }

    /// Encode the payload (everything after the op byte, before the CRC).
    pub fn encode_payload(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            WalEntry::Create { id, tags, content } => {
                out.extend_from_slice(id.as_bytes());
                write_tags(&mut out, tags);
                write_bytes(&mut out, content);
            }
            WalEntry::Update { id, tags, content } => {
                out.extend_from_slice(id.as_bytes());
                write_tags(&mut out, tags);
                match content {
                    Some(bytes) => {
                        out.push(1);
                        write_bytes(&mut out, bytes);
                    }
                    None => out.push(0),
                }
            }
            WalEntry::AddTag { id, tag } => {
                out.extend_from_slice(id.as_bytes());
                write_tag(&mut out, tag);
            }
            WalEntry::DeleteTagSet { id, tags } => {
                out.extend_from_slice(id.as_bytes());
                out.extend_from_slice(&(tags.len() as u32).to_le_bytes());
                for t in tags {
                    write_str(&mut out, t);
                }
            }
            WalEntry::SetState { id, state, t_ns } => {
                out.extend_from_slice(id.as_bytes());
                out.push(state.as_byte());
                out.extend_from_slice(&t_ns.to_le_bytes());
            }
            WalEntry::Commit => {}
        }
        out
    }

    /// Decode an entry given its op byte and payload.
    pub fn decode(op: u8, payload: &[u8]) -> Result<Self, WalError> {
        let mut cursor = 0usize;
        Ok(match op {
            OP_CREATE => {
                let id = read_id(payload, &mut cursor)?;
                let tags = read_tags(payload, &mut cursor)?;
                let content = read_bytes(payload, &mut cursor)?;
                WalEntry::Create { id, tags, content }
            }
            OP_UPDATE => {
                let id = read_id(payload, &mut cursor)?;
                let tags = read_tags(payload, &mut cursor)?;
                let has_content = read_u8(payload, &mut cursor)?;
                let content = if has_content == 1 {
                    Some(read_bytes(payload, &mut cursor)?)
                } else {
                    None
                };
                WalEntry::Update { id, tags, content }
            }
            OP_ADD_TAG => {
                let id = read_id(payload, &mut cursor)?;
                let tag = read_tag(payload, &mut cursor)?;
                WalEntry::AddTag { id, tag }
            }
            OP_DELETE_TAG_SET => {
                let id = read_id(payload, &mut cursor)?;
                let count = read_u32(payload, &mut cursor)?;
                let mut tags = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    tags.push(read_str(payload, &mut cursor)?);
                }
                WalEntry::DeleteTagSet { id, tags }
            }
            OP_SET_STATE => {
                let id = read_id(payload, &mut cursor)?;
                let state_byte = read_u8(payload, &mut cursor)?;
                let state = LifecycleState::from_byte(state_byte)
                    .ok_or(WalError::UnknownOp { op, offset: 0 })?;
                let t_ns = read_i64(payload, &mut cursor)?;
                WalEntry::SetState { id, state, t_ns }
            }
            OP_COMMIT => WalEntry::Commit,
            other => return Err(WalError::UnknownOp { op: other, offset: 0 }),
        })
    }
}

fn write_tag(out: &mut Vec<u8>, tag: &Tag) {
    out.extend_from_slice(&tag.t_ns.to_le_bytes());
    write_str(out, &tag.text);
}

fn write_tags(out: &mut Vec<u8>, tags: &[Tag]) {
    out.extend_from_slice(&(tags.len() as u32).to_le_bytes());
    for t in tags {
        write_tag(out, t);
    }
}

fn write_str(out: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
}

fn need(bytes: &[u8], cursor: usize, len: usize) -> Result<(), WalError> {
    if bytes.len() < cursor + len {
        return Err(WalError::TornFrame { offset: 0 });
    }
    Ok(())
}

fn read_u8(bytes: &[u8], cursor: &mut usize) -> Result<u8, WalError> {
    need(bytes, *cursor, 1)?;
    let v = bytes[*cursor];
    *cursor += 1;
    Ok(v)
}

fn read_u32(bytes: &[u8], cursor: &mut usize) -> Result<u32, WalError> {
    need(bytes, *cursor, 4)?;
    let v = u32::from_le_bytes(bytes[*cursor..*cursor + 4].try_into().unwrap());
    *cursor += 4;
    Ok(v)
}

fn read_i64(bytes: &[u8], cursor: &mut usize) -> Result<i64, WalError> {
    need(bytes, *cursor, 8)?;
    let v = i64::from_le_bytes(bytes[*cursor..*cursor + 8].try_into().unwrap());
    *cursor += 8;
    Ok(v)
}

fn read_id(bytes: &[u8], cursor: &mut usize) -> Result<EntityId, WalError> {
    need(bytes, *cursor, 16)?;
    let mut raw = [0u8; 16];
    raw.copy_from_slice(&bytes[*cursor..*cursor + 16]);
    *cursor += 16;
    Ok(EntityId::from_bytes(raw))
}

fn read_str(bytes: &[u8], cursor: &mut usize) -> Result<String, WalError> {
    let len = read_u32(bytes, cursor)? as usize;
    need(bytes, *cursor, len)?;
    let s = String::from_utf8(bytes[*cursor..*cursor + len].to_vec())?;
    *cursor += len;
    Ok(s)
}

fn read_bytes(bytes: &[u8], cursor: &mut usize) -> Result<Vec<u8>, WalError> {
    let len = read_u32(bytes, cursor)? as usize;
    need(bytes, *cursor, len)?;
    let v = bytes[*cursor..*cursor + len].to_vec();
    *cursor += len;
    Ok(v)
}

fn read_tag(bytes: &[u8], cursor: &mut usize) -> Result<Tag, WalError> {
    let t_ns = read_i64(bytes, cursor)?;
    let text = read_str(bytes, cursor)?;
    Ok(Tag { t_ns, text })
}

fn read_tags(bytes: &[u8], cursor: &mut usize) -> Result<Vec<Tag>, WalError> {
    let count = read_u32(bytes, cursor)?;
    let mut tags = Vec::with_capacity(count as usize);
    for _ in 0..count {
        tags.push(read_tag(bytes, cursor)?);
    }
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_roundtrips() {
        let e = WalEntry::Create {
            id: EntityId::new(),
            tags: vec![Tag::new(1, "type:doc")],
            content: b"hello".to_vec(),
        };
        let payload = e.encode_payload();
        let decoded = WalEntry::decode(e.op_byte(), &payload).unwrap();
        assert_eq!(decoded, e);
    }

    #[test]
    fn update_with_no_content_roundtrips() {
        let e = WalEntry::Update {
            id: EntityId::new(),
            tags: vec![Tag::new(2, "status:published")],
            content: None,
        };
        let payload = e.encode_payload();
        assert_eq!(WalEntry::decode(e.op_byte(), &payload).unwrap(), e);
    }

    #[test]
    fn add_tag_roundtrips() {
        let e = WalEntry::AddTag {
            id: EntityId::new(),
            tag: Tag::new(5, "status:archived"),
        };
        let payload = e.encode_payload();
        assert_eq!(WalEntry::decode(e.op_byte(), &payload).unwrap(), e);
    }

    #[test]
    fn delete_tag_set_roundtrips() {
        let e = WalEntry::DeleteTagSet {
            id: EntityId::new(),
            tags: vec!["value:17".to_string(), "value:18".to_string()],
        };
        let payload = e.encode_payload();
        assert_eq!(WalEntry::decode(e.op_byte(), &payload).unwrap(), e);
    }

    #[test]
    fn set_state_roundtrips() {
        let e = WalEntry::SetState {
            id: EntityId::new(),
            state: LifecycleState::SoftDeleted,
            t_ns: 42,
        };
        let payload = e.encode_payload();
        assert_eq!(WalEntry::decode(e.op_byte(), &payload).unwrap(), e);
    }

    #[test]
    fn commit_has_empty_payload() {
        let e = WalEntry::Commit;
        assert!(e.encode_payload().is_empty());
        assert_eq!(WalEntry::decode(e.op_byte(), &[]).unwrap(), e);
    }

    #[test]
    fn unknown_op_is_rejected() {
        assert!(matches!(
            WalEntry::decode(255, &[]),
            Err(WalError::UnknownOp { op: 255, .. })
        ));
    }
}
