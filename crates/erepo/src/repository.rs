//! The entity repository: public CRUD/query contract, concurrency,
//! chunking, and the write path that threads every mutation through the WAL
//! before publishing it to the in-memory indexes.
//!
//! One struct owns the on-disk file, the WAL, and the in-memory indexes,
//! reachable only through a process-wide registry keyed by canonicalized
//! path (`registry.rs`).

use crate::background::PeriodicWorker;
use crate::chunk;
use crate::file::EbfFile;
use crate::metrics_gate::{MetricsOperationFlag, RetentionCircuitBreaker};
use crate::registry;
use edb_core::{
    now_ns, Config, Content, EdbError, EdbResult, Entity, EntityId, LifecycleEvent, LifecycleState,
    Limits, Tag, TimestampNs,
};
use edb_format::{encode_entity_record, EntityRecord, IdEntry, IndexFooter};
use edb_index::{IdIndex, TagIndex};
use edb_wal::{DurabilityMode, WalEntry, WalReader, WalWriter};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// In-memory state: every live entity's full current view, plus the two
/// accelerator indexes built over it. Rebuildable from `entities.db` alone.
pub(crate) struct Indexes {
    pub(crate) entities: HashMap<EntityId, Entity>,
    pub(crate) id_index: IdIndex,
    pub(crate) tag_index: TagIndex,
}

struct Durability {
    file: EbfFile,
    wal: WalWriter,
    /// Ids whose current `entities` state has changed since the last
    /// checkpoint and needs a fresh full record folded into the main file.
    dirty: HashSet<EntityId>,
    /// Ids purged since the last checkpoint; folded as a tombstone record
    /// (so a footer-less full-scan recovery can't resurrect them) and
    /// omitted from the next footer entirely.
    purged: HashSet<EntityId>,
}

/// Owns `entities.db`, `entities.db.wal`, and every in-memory index for one
/// database directory.
pub struct EntityRepository {
    data_dir: PathBuf,
    limits: Limits,
    pub(crate) indexes: RwLock<Indexes>,
    durability: Mutex<Durability>,
    metrics_op: MetricsOperationFlag,
    circuit: RetentionCircuitBreaker,
}

/// Background workers spawned over a live repository: checkpoint, retention,
/// and aggregation. Dropping this stops all three.
pub struct BackgroundWorkers {
    _checkpoint: PeriodicWorker,
    _retention: PeriodicWorker,
    _aggregation: PeriodicWorker,
}

impl EntityRepository {
    /// Open (or attach to an already-open handle for) the database under
    /// `data_dir`, with default limits and the standard batched durability
    /// mode.
    pub fn open(data_dir: impl AsRef<Path>) -> EdbResult<Arc<Self>> {
        Self::open_with(data_dir, Limits::default(), DurabilityMode::standard_default())
    }

    /// Open using the storage-relevant fields of a parsed [`Config`].
    pub fn open_with_config(cfg: &Config) -> EdbResult<Arc<Self>> {
        let mode = if cfg.high_performance {
            DurabilityMode::standard_default()
        } else {
            DurabilityMode::Strict
        };
        Self::open_with(&cfg.data_path, Limits::default(), mode)
    }

    /// Open with explicit limits and durability mode.
    pub fn open_with(
        data_dir: impl AsRef<Path>,
        limits: Limits,
        durability_mode: DurabilityMode,
    ) -> EdbResult<Arc<Self>> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;
        let canonical = std::fs::canonicalize(&data_dir)?;
        registry::open_or_insert(canonical, move || {
            Self::open_uncached(data_dir.clone(), limits, durability_mode)
        })
    }

    fn open_uncached(
        data_dir: PathBuf,
        limits: Limits,
        durability_mode: DurabilityMode,
    ) -> EdbResult<Arc<Self>> {
        let main_path = data_dir.join("entities.db");
        let wal_path = data_dir.join("entities.db.wal");

        let mut file = EbfFile::open_or_create(&main_path, now_ns())?;
        let loaded = file.load()?;

        let mut entities = HashMap::with_capacity(loaded.records.len());
        let mut id_index = IdIndex::new();
        let mut tag_index = TagIndex::new();
        for (id, (offset, record)) in loaded.records {
            if record.state == LifecycleState::Purged {
                continue;
            }
            for tag in &record.tags {
                tag_index.insert(tag, id);
            }
            id_index.insert(id, offset);
            entities.insert(
                id,
                Entity {
                    id: record.id,
                    content: content_from_bytes(record.content, &record.tags),
                    tags: record.tags,
                    created_at: record.created_at,
                    updated_at: record.updated_at,
                    state: record.state,
                },
            );
        }

        let mut dirty = HashSet::new();
        let mut purged = HashSet::new();
        let recovery = WalReader::recover(&wal_path, 0)
            .map_err(|e| edb_core::EdbError::storage_with_source("WAL recovery failed", e))?;
        for txn in &recovery.committed {
            let mut idx = Indexes { entities, id_index, tag_index };
            for entry in &txn.entries {
                apply_entry(&mut idx, entry, &mut dirty, &mut purged)?;
            }
            entities = idx.entities;
            id_index = idx.id_index;
            tag_index = idx.tag_index;
        }
        let next_lsn = if recovery.committed.is_empty() { 1 } else { recovery.highest_lsn + 1 };
        let wal = WalWriter::open(&wal_path, durability_mode, next_lsn)?;

        let repo = Arc::new(Self {
            data_dir,
            limits,
            indexes: RwLock::new(Indexes { entities, id_index, tag_index }),
            durability: Mutex::new(Durability { file, wal, dirty, purged }),
            metrics_op: MetricsOperationFlag::new(),
            circuit: RetentionCircuitBreaker::new(),
        });

        // Fold any WAL-replayed mutations into the main file right away so a
        // second crash before the first checkpoint still has a clean base.
        if !repo.durability.lock().dirty.is_empty() || !repo.durability.lock().purged.is_empty() {
            repo.checkpoint()?;
        }

        Ok(repo)
    }

    /// Root directory this repository was opened against.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Chunking/tag-size limits in effect.
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// The process-wide metrics-operation flag, shared with the retention
    /// and aggregation workers.
    pub fn metrics_flag(&self) -> &MetricsOperationFlag {
        &self.metrics_op
    }

    /// The retention circuit breaker.
    pub fn circuit_breaker(&self) -> &RetentionCircuitBreaker {
        &self.circuit
    }

    /// Spawn the checkpoint, retention, and aggregation background workers
    /// at the cadences named in `cfg`. Dropping the returned handle stops
    /// them.
    pub fn spawn_workers(self: &Arc<Self>, cfg: &Config) -> BackgroundWorkers {
        let checkpoint_repo = Arc::clone(self);
        let checkpoint = PeriodicWorker::spawn("edb-checkpoint", std::time::Duration::from_secs(10), move || {
            if let Err(e) = checkpoint_repo.checkpoint() {
                tracing::error!(error = %e, "checkpoint cycle failed");
            }
        });

        let retention_repo = Arc::clone(self);
        let retention_windows = cfg.metrics_retention;
        let retention = PeriodicWorker::spawn(
            "edb-retention",
            std::time::Duration::from_secs(6 * 3600),
            move || crate::retention::run_cycle(&retention_repo, retention_windows),
        );

        let aggregation_repo = Arc::clone(self);
        let aggregation = PeriodicWorker::spawn("edb-aggregation", cfg.metrics_interval, move || {
            crate::aggregation::run_cycle(&aggregation_repo)
        });

        BackgroundWorkers {
            _checkpoint: checkpoint,
            _retention: retention,
            _aggregation: aggregation,
        }
    }

    /// Fold every dirty/purged entity into `entities.db`, rewrite the index
    /// footer, and truncate the WAL. A no-op if nothing changed since the
    /// last checkpoint.
    pub fn checkpoint(&self) -> EdbResult<()> {
        let mut durability = self.durability.lock();
        let mut idx = self.indexes.write();

        if durability.dirty.is_empty() && durability.purged.is_empty() {
            return Ok(());
        }
        durability.wal.sync()?;

        let mut records_end = durability.file.header().last_checkpoint_offset;

        let dirty_ids: Vec<EntityId> = durability.dirty.drain().collect();
        for id in dirty_ids {
            let Some(entity) = idx.entities.get(&id) else { continue };
            let record = entity_record(entity);
            let (offset, len) = durability.file.append_record(records_end, &record)?;
            records_end = offset + len as u64;
            idx.id_index.insert(id, offset);
        }

        let purged_ids: Vec<EntityId> = durability.purged.drain().collect();
        for id in purged_ids {
            let tombstone = EntityRecord {
                id,
                created_at: 0,
                updated_at: 0,
                state: LifecycleState::Purged,
                tags: Vec::new(),
                content: Vec::new(),
            };
            let (offset, len) = durability.file.append_record(records_end, &tombstone)?;
            records_end = offset + len as u64;
            idx.id_index.remove(id);
        }

        let mut entries = Vec::with_capacity(idx.id_index.len());
        for id in idx.id_index.ids().copied().collect::<Vec<_>>() {
            let offset = idx.id_index.get(&id).expect("id just iterated from id_index");
            let entity = idx.entities.get(&id).expect("id_index entry without a cached entity");
            let len = encode_entity_record(&entity_record(entity)).len() as u32;
            entries.push(IdEntry { id, offset, len });
        }
        let mut tag_map: HashMap<String, Vec<EntityId>> = HashMap::new();
        for (id, entity) in idx.entities.iter() {
            for tag in &entity.tags {
                tag_map.entry(tag.text.clone()).or_default().push(*id);
            }
        }
        let footer = IndexFooter { entries, tag_index: tag_map };
        durability.file.write_footer_and_checkpoint(records_end, &footer)?;
        durability.wal.truncate_and_reset(durability.wal.next_lsn())?;
        Ok(())
    }

    fn write_transaction(
        &self,
        build: impl FnOnce(&Indexes) -> EdbResult<Vec<WalEntry>>,
    ) -> EdbResult<()> {
        let mut durability = self.durability.lock();
        let entries = {
            let idx = self.indexes.read();
            build(&idx)?
        };
        if entries.is_empty() {
            return Ok(());
        }
        durability.wal.append_transaction(&entries)?;
        let mut idx = self.indexes.write();
        for entry in &entries {
            apply_entry(&mut idx, entry, &mut durability.dirty, &mut durability.purged)?;
        }
        Ok(())
    }

    /// Create a new entity. `id` is used verbatim if supplied (an existing
    /// id is a conflict); otherwise a fresh id is generated.
    pub fn create(&self, id: Option<EntityId>, tags: Vec<String>, content: Content) -> EdbResult<Entity> {
        let id = id.unwrap_or_default();
        let t_ns = now_ns();
        for t in &tags {
            validate_tag(t, &self.limits)?;
        }
        let mut stamped: Vec<Tag> = tags.into_iter().map(|t| Tag::new(t_ns, t)).collect();
        if !stamped.iter().any(|t| t.namespace() == "type") {
            return Err(EdbError::validation("entity must carry at least one type: tag"));
        }
        stamped.push(Tag::new(t_ns, LifecycleState::Active.tag_value()));

        self.write_transaction(|idx| {
            if idx.entities.contains_key(&id) {
                return Err(EdbError::conflict(format!("entity {id} already exists")));
            }
            Ok(build_content_entries(idx, id, stamped.clone(), content.clone(), t_ns, &self.limits, true))
        })?;

        self.get(id)
    }

    /// Fetch the current snapshot of `id`.
    pub fn get(&self, id: EntityId) -> EdbResult<Entity> {
        self.indexes
            .read()
            .entities
            .get(&id)
            .cloned()
            .ok_or_else(|| EdbError::not_found(id))
    }

    /// Every non-purged entity.
    pub fn list(&self) -> Vec<Entity> {
        self.indexes.read().entities.values().cloned().collect()
    }

    /// Entities carrying `tag` exactly, at any point in their history.
    pub fn list_by_tag(&self, tag: &str) -> Vec<Entity> {
        let idx = self.indexes.read();
        idx.tag_index
            .lookup_exact(tag)
            .into_iter()
            .filter_map(|id| idx.entities.get(&id).cloned())
            .collect()
    }

    /// Entities matching a `ns:*` or `ns:prefix*` wildcard pattern.
    pub fn list_by_tag_wildcard(&self, pattern: &str) -> Vec<Entity> {
        let idx = self.indexes.read();
        idx.tag_index
            .lookup_wildcard(pattern)
            .into_iter()
            .filter_map(|id| idx.entities.get(&id).cloned())
            .collect()
    }

    /// Entities carrying any tag in `namespace`.
    pub fn list_by_namespace(&self, namespace: &str) -> Vec<Entity> {
        let idx = self.indexes.read();
        idx.tag_index
            .lookup_namespace(namespace)
            .into_iter()
            .filter_map(|id| idx.entities.get(&id).cloned())
            .collect()
    }

    /// Entities matching a set of exact tags, ANDed or ORed.
    pub fn list_by_tags(&self, tags: &[String], match_all: bool) -> Vec<Entity> {
        let idx = self.indexes.read();
        let sets: Vec<HashSet<EntityId>> = tags.iter().map(|t| idx.tag_index.lookup_exact(t)).collect();
        let ids: HashSet<EntityId> = if match_all {
            let mut iter = sets.into_iter();
            match iter.next() {
                Some(first) => iter.fold(first, |acc, s| acc.intersection(&s).copied().collect()),
                None => HashSet::new(),
            }
        } else {
            sets.into_iter().flatten().collect()
        };
        ids.into_iter().filter_map(|id| idx.entities.get(&id).cloned()).collect()
    }

    /// Entities whose content contains `substr` as a raw byte/UTF-8
    /// substring. Linear scan; no ranking, per the substring-only non-goal.
    pub fn search_content(&self, substr: &str) -> Vec<Entity> {
        let idx = self.indexes.read();
        idx.entities
            .values()
            .filter(|e| String::from_utf8_lossy(e.content.as_bytes()).contains(substr))
            .cloned()
            .collect()
    }

    /// Append tags and/or replace content. Appended tags become new temporal
    /// entries; a `None` content leaves existing content untouched.
    pub fn update(&self, id: EntityId, tags: Vec<String>, content: Option<Content>) -> EdbResult<Entity> {
        let t_ns = now_ns();
        for t in &tags {
            validate_tag(t, &self.limits)?;
        }
        let stamped: Vec<Tag> = tags.into_iter().map(|t| Tag::new(t_ns, t)).collect();

        self.write_transaction(|idx| {
            if !idx.entities.contains_key(&id) {
                return Err(EdbError::not_found(id));
            }
            if idx.entities[&id].tags.len() + stamped.len() > self.limits.max_tags_per_entity {
                return Err(EdbError::validation("entity would exceed max_tags_per_entity"));
            }
            Ok(match content {
                Some(content) => build_content_entries(idx, id, stamped.clone(), content, t_ns, &self.limits, false),
                None => vec![WalEntry::Update { id, tags: stamped.clone(), content: None }],
            })
        })?;

        self.get(id)
    }

    /// Drop a set of tags outright, bypassing the append-only tag history —
    /// the one exception to append-only tags, used by the retention worker
    /// to prune expired `value:*` samples.
    pub(crate) fn delete_tag_set(&self, id: EntityId, tags: Vec<String>) -> EdbResult<()> {
        if tags.is_empty() {
            return Ok(());
        }
        self.write_transaction(|idx| {
            if !idx.entities.contains_key(&id) {
                return Err(EdbError::not_found(id));
            }
            Ok(vec![WalEntry::DeleteTagSet { id, tags: tags.clone() }])
        })
    }

    /// Append a single tag. Idempotent: a call that would append the exact
    /// same `(t_ns, text)` pair already at the tail of the entity's history
    /// is a no-op.
    pub fn add_tag(&self, id: EntityId, text: impl Into<String>) -> EdbResult<Entity> {
        let text = text.into();
        validate_tag(&text, &self.limits)?;
        let t_ns = now_ns();

        self.write_transaction(|idx| {
            let entity = idx.entities.get(&id).ok_or_else(|| EdbError::not_found(id))?;
            if entity.tags.last().is_some_and(|t| t.t_ns == t_ns && t.text == text) {
                return Ok(Vec::new());
            }
            if entity.tags.len() >= self.limits.max_tags_per_entity {
                return Err(EdbError::validation("entity at max_tags_per_entity"));
            }
            Ok(vec![WalEntry::AddTag { id, tag: Tag::new(t_ns, text.clone()) }])
        })?;

        self.get(id)
    }

    /// Assembled content: inline bytes, or the concatenation of chunk
    /// children in index order for a chunked entity.
    pub fn get_content(&self, id: EntityId) -> EdbResult<Vec<u8>> {
        let entity = self.get(id)?;
        match chunk::chunk_count(&entity.tags) {
            Some(n) => {
                let mut buf = Vec::new();
                for i in 0..n {
                    let child_id = chunk::entity_id_for(id.chunk_id(i));
                    buf.extend_from_slice(self.get(child_id)?.content.as_bytes());
                }
                Ok(buf)
            }
            None => Ok(entity.content.into_bytes()),
        }
    }

    /// Stream content chunk-by-chunk without assembling the full buffer.
    pub fn stream_content(&self, id: EntityId, mut sink: impl FnMut(&[u8]) -> EdbResult<()>) -> EdbResult<()> {
        let entity = self.get(id)?;
        match chunk::chunk_count(&entity.tags) {
            Some(n) => {
                for i in 0..n {
                    let child_id = chunk::entity_id_for(id.chunk_id(i));
                    sink(self.get(child_id)?.content.as_bytes())?;
                }
            }
            None => sink(entity.content.as_bytes())?,
        }
        Ok(())
    }

    /// `active -> soft_deleted`.
    pub fn soft_delete(&self, id: EntityId, reason: &str) -> EdbResult<Entity> {
        self.transition(id, LifecycleEvent::SoftDelete, Some(format!("lifecycle:delete_reason:{reason}")))
    }

    /// `soft_deleted -> active`.
    pub fn restore(&self, id: EntityId, reason: &str) -> EdbResult<Entity> {
        self.transition(id, LifecycleEvent::Restore, Some(format!("lifecycle:restore_reason:{reason}")))
    }

    /// `soft_deleted -> archived`.
    pub fn archive(&self, id: EntityId) -> EdbResult<Entity> {
        self.transition(id, LifecycleEvent::Archive, None)
    }

    fn transition(&self, id: EntityId, event: LifecycleEvent, audit_tag: Option<String>) -> EdbResult<Entity> {
        let t_ns = now_ns();
        self.write_transaction(|idx| {
            let entity = idx.entities.get(&id).ok_or_else(|| EdbError::not_found(id))?;
            let next = entity
                .state
                .transition(event)
                .map_err(|e| EdbError::conflict(e.to_string()))?;
            let mut entries = vec![WalEntry::SetState { id, state: next, t_ns }];
            if let Some(tag_text) = &audit_tag {
                entries.push(WalEntry::AddTag { id, tag: Tag::new(t_ns, tag_text.clone()) });
            }
            Ok(entries)
        })?;
        self.get(id)
    }

    /// Hard-remove `id` and cascade to its chunk children, bypassing the
    /// lifecycle state machine and purge confirmation. The direct engine
    /// contract op (the public `delete`); [`EntityRepository::purge`] is
    /// the confirmation-gated, state-machine-honoring variant used by a
    /// boundary layer's `/entities/{id}/purge` endpoint.
    pub fn delete(&self, id: EntityId) -> EdbResult<()> {
        self.purge_unchecked(id)
    }

    /// `soft_deleted | archived -> purged`, requiring the literal
    /// confirmation token `"PURGE"`.
    pub fn purge(&self, id: EntityId, confirmation: &str) -> EdbResult<()> {
        let current = self.get(id)?.state;
        current
            .transition(LifecycleEvent::Purge)
            .map_err(|e| EdbError::conflict(e.to_string()))?;
        if confirmation != "PURGE" {
            return Err(EdbError::conflict("purge requires confirmation token \"PURGE\""));
        }
        self.purge_unchecked(id)
    }

    fn purge_unchecked(&self, id: EntityId) -> EdbResult<()> {
        let t_ns = now_ns();
        self.write_transaction(|idx| {
            if !idx.entities.contains_key(&id) {
                return Err(EdbError::not_found(id));
            }
            let mut entries = vec![WalEntry::SetState { id, state: LifecycleState::Purged, t_ns }];
            if let Some(n) = chunk::chunk_count(&idx.entities[&id].tags) {
                for i in 0..n {
                    let child_id = chunk::entity_id_for(id.chunk_id(i));
                    if idx.entities.contains_key(&child_id) {
                        entries.push(WalEntry::SetState { id: child_id, state: LifecycleState::Purged, t_ns });
                    }
                }
            }
            Ok(entries)
        })
    }
}

fn entity_record(entity: &Entity) -> EntityRecord {
    EntityRecord {
        id: entity.id,
        created_at: entity.created_at,
        updated_at: entity.updated_at,
        state: entity.state,
        tags: entity.tags.clone(),
        content: entity.content.as_bytes().to_vec(),
    }
}

fn validate_tag(text: &str, limits: &Limits) -> EdbResult<()> {
    if text.is_empty() {
        return Err(EdbError::validation("tag text must not be empty"));
    }
    if text.as_bytes().len() > limits.max_tag_text_bytes {
        return Err(EdbError::validation("tag text exceeds max_tag_text_bytes"));
    }
    Ok(())
}

fn mime_of(tags: &[Tag]) -> Option<&str> {
    tags.iter()
        .rev()
        .find(|t| t.namespace() == "content" && t.value().starts_with("type:"))
        .map(|t| &t.value()["type:".len()..])
}

fn content_from_bytes(bytes: Vec<u8>, tags: &[Tag]) -> Content {
    match mime_of(tags) {
        Some("application/json") => Content::Json(bytes),
        Some(m) if m.starts_with("text/") => Content::Text(String::from_utf8_lossy(&bytes).into_owned()),
        _ => Content::Binary(bytes),
    }
}

/// Build the WAL entries for a create/update that carries a (possibly
/// oversized) content payload, splitting into chunk children as needed.
fn build_content_entries(
    idx: &Indexes,
    id: EntityId,
    mut tags: Vec<Tag>,
    content: Content,
    t_ns: TimestampNs,
    limits: &Limits,
    is_create: bool,
) -> Vec<WalEntry> {
    if !tags.iter().any(|t| t.namespace() == "content" && t.value().starts_with("type:")) {
        tags.push(Tag::new(t_ns, content.default_type_tag()));
    }
    let bytes = content.into_bytes();

    if !chunk::needs_chunking(bytes.len(), limits) {
        return vec![if is_create {
            WalEntry::Create { id, tags, content: bytes }
        } else {
            WalEntry::Update { id, tags, content: Some(bytes) }
        }];
    }

    let pieces = chunk::split(id, &bytes, limits.default_chunk_size);
    tags.extend(chunk::parent_tags(t_ns, pieces.len() as u32, limits.default_chunk_size, bytes.len()));

    let mut entries = Vec::with_capacity(pieces.len() + 1);
    entries.push(if is_create {
        WalEntry::Create { id, tags, content: Vec::new() }
    } else {
        WalEntry::Update { id, tags, content: Some(Vec::new()) }
    });
    for piece in pieces {
        let child_tags = chunk::child_tags(t_ns, id, piece.index);
        entries.push(if idx.entities.contains_key(&piece.id) {
            WalEntry::Update { id: piece.id, tags: child_tags, content: Some(piece.bytes) }
        } else {
            WalEntry::Create { id: piece.id, tags: child_tags, content: piece.bytes }
        });
    }
    entries
}

pub(crate) fn apply_entry(
    idx: &mut Indexes,
    entry: &WalEntry,
    dirty: &mut HashSet<EntityId>,
    purged: &mut HashSet<EntityId>,
) -> EdbResult<()> {
    match entry {
        WalEntry::Create { id, tags, content } => {
            if idx.entities.contains_key(id) {
                return Err(EdbError::conflict(format!("entity {id} already exists")));
            }
            let created_at = tags.first().map(|t| t.t_ns).unwrap_or(0);
            let updated_at = tags.last().map(|t| t.t_ns).unwrap_or(created_at);
            let entity = Entity {
                id: *id,
                content: content_from_bytes(content.clone(), tags),
                tags: tags.clone(),
                created_at,
                updated_at,
                state: LifecycleState::Active,
            };
            idx.entities.insert(*id, entity);
            for t in tags {
                idx.tag_index.insert(t, *id);
            }
            dirty.insert(*id);
        }
        WalEntry::Update { id, tags, content } => {
            let updated_at = tags.last().map(|t| t.t_ns);
            {
                let entity = idx.entities.get_mut(id).ok_or_else(|| EdbError::not_found(*id))?;
                entity.tags.extend(tags.iter().cloned());
                if let Some(t) = updated_at {
                    entity.updated_at = t;
                }
                if let Some(bytes) = content {
                    entity.content = content_from_bytes(bytes.clone(), &entity.tags);
                }
            }
            for t in tags {
                idx.tag_index.insert(t, *id);
            }
            dirty.insert(*id);
        }
        WalEntry::AddTag { id, tag } => {
            {
                let entity = idx.entities.get_mut(id).ok_or_else(|| EdbError::not_found(*id))?;
                entity.tags.push(tag.clone());
                entity.updated_at = tag.t_ns;
            }
            idx.tag_index.insert(tag, *id);
            dirty.insert(*id);
        }
        WalEntry::DeleteTagSet { id, tags } => {
            {
                let entity = idx.entities.get_mut(id).ok_or_else(|| EdbError::not_found(*id))?;
                entity.tags.retain(|t| !tags.contains(&t.text));
            }
            for text in tags {
                idx.tag_index.remove(text, id);
            }
            dirty.insert(*id);
        }
        WalEntry::SetState { id, state, t_ns } => {
            let old_state_tag;
            {
                let entity = idx.entities.get_mut(id).ok_or_else(|| EdbError::not_found(*id))?;
                old_state_tag = entity.state.tag_value().to_string();
                entity.tags.retain(|t| t.text != old_state_tag);
                entity.tags.push(Tag::new(*t_ns, state.tag_value()));
                entity.state = *state;
                entity.updated_at = *t_ns;
            }
            idx.tag_index.remove(&old_state_tag, id);
            idx.tag_index.insert(&Tag::new(*t_ns, state.tag_value()), *id);

            if *state == LifecycleState::Purged {
                if let Some(removed) = idx.entities.remove(id) {
                    for t in &removed.tags {
                        idx.tag_index.remove(&t.text, id);
                    }
                }
                idx.id_index.remove(*id);
                dirty.remove(id);
                purged.insert(*id);
            } else {
                dirty.insert(*id);
            }
        }
        WalEntry::Commit => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn repo() -> Arc<EntityRepository> {
        let dir = tempdir().unwrap();
        // Leak the tempdir so the path survives for the registry's lifetime
        // of this test; each test uses a fresh unique path so no collision.
        let path = dir.keep();
        EntityRepository::open_with(path, Limits::with_small_limits(), DurabilityMode::Strict).unwrap()
    }

    #[test]
    fn create_then_get_roundtrips_modulo_timestamps() {
        let repo = repo();
        let e = repo
            .create(None, vec!["type:doc".into(), "status:draft".into()], Content::Text("hello".into()))
            .unwrap();
        let fetched = repo.get(e.id).unwrap();
        assert_eq!(fetched.id, e.id);
        assert!(fetched.tags.iter().any(|t| t.text == "type:doc"));
        assert!(fetched.tags.iter().any(|t| t.text == "status:draft"));
        assert_eq!(fetched.content, Content::Text("hello".into()));
    }

    #[test]
    fn create_without_type_tag_is_rejected() {
        let repo = repo();
        let err = repo.create(None, vec!["status:draft".into()], Content::Text("x".into())).unwrap_err();
        assert!(err.is_validation_error());
    }

    #[test]
    fn duplicate_id_is_conflict() {
        let repo = repo();
        let e = repo.create(None, vec!["type:doc".into()], Content::Text("a".into())).unwrap();
        let err = repo.create(Some(e.id), vec!["type:doc".into()], Content::Text("b".into())).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn add_tag_then_list_by_tag_finds_it() {
        let repo = repo();
        let e = repo.create(None, vec!["type:doc".into()], Content::Text("a".into())).unwrap();
        repo.add_tag(e.id, "status:published").unwrap();
        let found = repo.list_by_tag("status:published");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, e.id);
    }

    #[test]
    fn wildcard_lookup_matches_namespace() {
        let repo = repo();
        repo.create(None, vec!["type:doc".into(), "status:draft".into()], Content::Text("a".into())).unwrap();
        repo.create(None, vec!["type:doc".into(), "status:published".into()], Content::Text("b".into())).unwrap();
        assert_eq!(repo.list_by_tag_wildcard("status:*").len(), 2);
    }

    #[test]
    fn update_appends_tags_and_replaces_content() {
        let repo = repo();
        let e = repo.create(None, vec!["type:doc".into()], Content::Text("a".into())).unwrap();
        let updated = repo
            .update(e.id, vec!["status:published".into()], Some(Content::Text("b".into())))
            .unwrap();
        assert!(updated.tags.iter().any(|t| t.text == "status:published"));
        assert_eq!(updated.content, Content::Text("b".into()));
    }

    #[test]
    fn chunked_create_reassembles_to_original_bytes() {
        let repo = repo();
        let content: Vec<u8> = (0..200u32).map(|i| (i % 256) as u8).collect();
        let e = repo
            .create(None, vec!["type:blob".into()], Content::Binary(content.clone()))
            .unwrap();
        assert!(e.is_chunked());
        let assembled = repo.get_content(e.id).unwrap();
        assert_eq!(assembled, content);
    }

    #[test]
    fn soft_delete_then_restore_roundtrips_state() {
        let repo = repo();
        let e = repo.create(None, vec!["type:doc".into()], Content::Text("a".into())).unwrap();
        let deleted = repo.soft_delete(e.id, "cleanup").unwrap();
        assert_eq!(deleted.state, LifecycleState::SoftDeleted);
        let restored = repo.restore(e.id, "oops").unwrap();
        assert_eq!(restored.state, LifecycleState::Active);
    }

    #[test]
    fn purge_without_token_is_rejected() {
        let repo = repo();
        let e = repo.create(None, vec!["type:doc".into()], Content::Text("a".into())).unwrap();
        repo.soft_delete(e.id, "x").unwrap();
        let err = repo.purge(e.id, "NOPE").unwrap_err();
        assert!(err.is_conflict());
        assert!(repo.get(e.id).is_ok());
    }

    #[test]
    fn purge_with_token_removes_entity_and_chunk_children() {
        let repo = repo();
        let content: Vec<u8> = vec![7u8; 200];
        let e = repo.create(None, vec!["type:blob".into()], Content::Binary(content)).unwrap();
        let child_id = chunk::entity_id_for(e.id.chunk_id(0));
        assert!(repo.get(child_id).is_ok());

        repo.soft_delete(e.id, "x").unwrap();
        repo.purge(e.id, "PURGE").unwrap();
        assert!(repo.get(e.id).unwrap_err().is_not_found());
        assert!(repo.get(child_id).unwrap_err().is_not_found());
    }

    #[test]
    fn checkpoint_then_reopen_preserves_entities() {
        let dir = tempdir().unwrap();
        let path = dir.keep();
        let id;
        {
            let repo =
                EntityRepository::open_with(&path, Limits::with_small_limits(), DurabilityMode::Strict).unwrap();
            let e = repo.create(None, vec!["type:doc".into()], Content::Text("a".into())).unwrap();
            id = e.id;
            repo.checkpoint().unwrap();
        }
        let repo2 =
            EntityRepository::open_with(&path, Limits::with_small_limits(), DurabilityMode::Strict).unwrap();
        assert!(repo2.get(id).is_ok());
    }

    #[test]
    fn search_content_finds_substring() {
        let repo = repo();
        repo.create(None, vec!["type:doc".into()], Content::Text("the quick brown fox".into())).unwrap();
        repo.create(None, vec!["type:doc".into()], Content::Text("lazy dog".into())).unwrap();
        let found = repo.search_content("quick");
        assert_eq!(found.len(), 1);
    }
}
