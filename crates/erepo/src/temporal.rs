//! Read-only temporal queries over a live [`EntityRepository`]: point-in-time
//! snapshots, change history, and tag-level diffs.
//!
//! Every query here reads straight from the in-memory cache under a shared
//! lock — none of it touches the WAL or the main file directly, only the
//! in-memory view the repository already built.

use crate::repository::EntityRepository;
use edb_core::{EdbError, EdbResult, Entity, EntityId, LifecycleState, Tag, TimestampNs};
use edb_index::TemporalSkiplist;
use std::collections::HashSet;
use std::sync::Arc;

/// One change entry in an entity's history. Every append-only tag write is a
/// change; content replacement on its own (with no accompanying tag) leaves
/// no separate history entry, since content itself isn't temporally
/// versioned — only the tags describing it are (see `DESIGN.md`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    /// When this change was recorded.
    pub t_ns: TimestampNs,
    /// The tag text this change added.
    pub tag: String,
}

/// The result of diffing an entity's tag set between two timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffResult {
    /// Tags visible at `t1`.
    pub snapshot_t1: Vec<Tag>,
    /// Tags visible at `t2`.
    pub snapshot_t2: Vec<Tag>,
    /// Tags present at `t2` but not `t1`.
    pub added_tags: Vec<String>,
    /// Tags present at `t1` but not `t2` (normally only via retention pruning).
    pub removed_tags: Vec<String>,
}

/// Thin read-only layer over [`EntityRepository`]'s cache.
pub struct TemporalRepository {
    repo: Arc<EntityRepository>,
}

impl TemporalRepository {
    /// Wrap a live repository.
    pub fn new(repo: Arc<EntityRepository>) -> Self {
        Self { repo }
    }

    /// The entity as it existed at `t_ns`: only tags with `t_ns <= t` are
    /// visible, and the derived lifecycle state reflects the last
    /// `lifecycle:state:*` tag at or before the cutoff. Content is not
    /// time-versioned (there is no historical byte store once an update
    /// overwrites it), so the returned entity's `content` is always the
    /// entity's current storage, not a reconstruction as of `t_ns`.
    pub fn get_as_of(&self, id: EntityId, t_ns: TimestampNs) -> EdbResult<Entity> {
        let idx = self.repo.indexes.read();
        let entity = idx.entities.get(&id).ok_or_else(|| EdbError::not_found(id))?;
        let skiplist = TemporalSkiplist::new(&entity.tags);
        if !skiplist.existed_at(t_ns) {
            return Err(EdbError::not_found(id));
        }
        let visible = skiplist.as_of(t_ns).to_vec();
        let state = state_as_of(&visible).unwrap_or(LifecycleState::Active);
        if state == LifecycleState::Purged {
            return Err(EdbError::not_found(id));
        }
        let updated_at = visible.last().map(|t| t.t_ns).unwrap_or(entity.created_at);
        Ok(Entity {
            id: entity.id,
            tags: visible,
            content: entity.content.clone(),
            created_at: entity.created_at,
            updated_at,
            state,
        })
    }

    /// Up to `limit` most recent tag-level changes for one entity, newest
    /// first.
    pub fn get_history(&self, id: EntityId, limit: usize) -> EdbResult<Vec<ChangeRecord>> {
        let idx = self.repo.indexes.read();
        let entity = idx.entities.get(&id).ok_or_else(|| EdbError::not_found(id))?;
        Ok(entity
            .tags
            .iter()
            .rev()
            .take(limit)
            .map(|t| ChangeRecord { t_ns: t.t_ns, tag: t.text.clone() })
            .collect())
    }

    /// Up to `limit` most recent tag-level changes across every entity,
    /// newest first, each paired with the entity it belongs to.
    pub fn get_recent_changes(&self, limit: usize) -> Vec<(EntityId, ChangeRecord)> {
        let idx = self.repo.indexes.read();
        let mut all: Vec<(EntityId, ChangeRecord)> = idx
            .entities
            .iter()
            .flat_map(|(id, e)| {
                e.tags
                    .iter()
                    .map(move |t| (*id, ChangeRecord { t_ns: t.t_ns, tag: t.text.clone() }))
            })
            .collect();
        all.sort_by(|a, b| b.1.t_ns.cmp(&a.1.t_ns).then(a.0.cmp(&b.0)));
        all.truncate(limit);
        all
    }

    /// Compare an entity's tag set between two points in time.
    pub fn get_diff(&self, id: EntityId, t1: TimestampNs, t2: TimestampNs) -> EdbResult<DiffResult> {
        let idx = self.repo.indexes.read();
        let entity = idx.entities.get(&id).ok_or_else(|| EdbError::not_found(id))?;
        let skiplist = TemporalSkiplist::new(&entity.tags);
        let a = skiplist.as_of(t1).to_vec();
        let b = skiplist.as_of(t2).to_vec();

        let a_set: HashSet<&str> = a.iter().map(|t| t.text.as_str()).collect();
        let b_set: HashSet<&str> = b.iter().map(|t| t.text.as_str()).collect();
        let added_tags = b_set.difference(&a_set).map(|s| s.to_string()).collect();
        let removed_tags = a_set.difference(&b_set).map(|s| s.to_string()).collect();

        Ok(DiffResult { snapshot_t1: a, snapshot_t2: b, added_tags, removed_tags })
    }
}

/// The lifecycle state implied by the last `lifecycle:state:*` tag in a
/// (possibly cutoff-truncated) tag slice, newest first.
fn state_as_of(tags: &[Tag]) -> Option<LifecycleState> {
    tags.iter().rev().find_map(|t| {
        [LifecycleState::Active, LifecycleState::SoftDeleted, LifecycleState::Archived, LifecycleState::Purged]
            .into_iter()
            .find(|s| s.tag_value() == t.text)
    })
}

/// Parse a timestamp accepted at the boundary into nanoseconds since the
/// Unix epoch. Accepts RFC3339 (with or without fractional seconds) and the
/// bare `YYYY-MM-DDTHH:MM:SS[Z]` form.
pub fn parse_timestamp(s: &str) -> EdbResult<TimestampNs> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return dt
            .timestamp_nanos_opt()
            .ok_or_else(|| EdbError::validation(format!("timestamp out of range: {s}")));
    }
    let trimmed = s.strip_suffix('Z').unwrap_or(s);
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return naive
            .and_utc()
            .timestamp_nanos_opt()
            .ok_or_else(|| EdbError::validation(format!("timestamp out of range: {s}")));
    }
    Err(EdbError::validation(format!("unrecognized timestamp: {s}")))
}
