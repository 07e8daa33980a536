//! Core types for the entity database: ids, tags, content, lifecycle states,
//! the unified error taxonomy, size limits, and environment configuration.

#![warn(missing_docs)]

pub mod config;
pub mod content;
pub mod entity_id;
pub mod error;
pub mod lifecycle;
pub mod limits;
pub mod tag;

pub use config::Config;
pub use content::Content;
pub use entity_id::{ChunkId, EntityId, EntityIdParseError};
pub use error::{EdbError, EdbResult};
pub use lifecycle::{IllegalTransition, LifecycleEvent, LifecycleState};
pub use limits::Limits;
pub use tag::{strip_timestamps, Tag};

/// The nanosecond-epoch timestamp type used for every temporal tag.
pub type TimestampNs = i64;

/// Current wall-clock time as nanoseconds since the Unix epoch.
pub fn now_ns() -> TimestampNs {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as i64
}

/// A fully-materialized entity view, as returned by `get`/`get_as_of`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    /// Identity.
    pub id: EntityId,
    /// Temporal tags, oldest first.
    pub tags: Vec<Tag>,
    /// Content, or empty if this entity's content is chunked.
    pub content: Content,
    /// System-assigned creation time.
    pub created_at: TimestampNs,
    /// System-assigned last-update time.
    pub updated_at: TimestampNs,
    /// Current lifecycle state.
    pub state: LifecycleState,
}

impl Entity {
    /// The effective type: the value of the first `type:` tag, or `"entity"`
    /// if none is present (the default-on-read rule).
    pub fn effective_type(&self) -> &str {
        self.tags
            .iter()
            .find(|t| t.namespace() == "type")
            .map(|t| t.value())
            .filter(|v| !v.is_empty())
            .unwrap_or("entity")
    }

    /// True if `content:chunks:N` marks this as a chunked parent.
    pub fn is_chunked(&self) -> bool {
        self.tags.iter().any(|t| t.namespace() == "content" && t.text.starts_with("content:chunks:"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity_with_tags(tags: Vec<Tag>) -> Entity {
        Entity {
            id: EntityId::new(),
            tags,
            content: Content::Text(String::new()),
            created_at: 0,
            updated_at: 0,
            state: LifecycleState::Active,
        }
    }

    #[test]
    fn effective_type_defaults_to_entity() {
        let e = entity_with_tags(vec![Tag::new(1, "status:draft")]);
        assert_eq!(e.effective_type(), "entity");
    }

    #[test]
    fn effective_type_reads_type_tag() {
        let e = entity_with_tags(vec![Tag::new(1, "type:doc")]);
        assert_eq!(e.effective_type(), "doc");
    }

    #[test]
    fn is_chunked_detects_chunk_tag() {
        let e = entity_with_tags(vec![Tag::new(1, "content:chunks:5")]);
        assert!(e.is_chunked());
        let e2 = entity_with_tags(vec![Tag::new(1, "type:doc")]);
        assert!(!e2.is_chunked());
    }

    #[test]
    fn now_ns_is_positive_and_increasing() {
        let a = now_ns();
        let b = now_ns();
        assert!(a > 0);
        assert!(b >= a);
    }
}
