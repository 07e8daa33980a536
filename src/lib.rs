//! # EDB
//!
//! A temporal, tag-indexed entity database: an append-only binary store plus
//! write-ahead log, in-memory tag/temporal indexes, content chunking, and a
//! soft-delete/archive/purge lifecycle state machine.
//!
//! Every entity is identified by a 128-bit id and carries an append-only
//! sequence of nanosecond-timestamped tags (`namespace:value` strings) plus
//! an opaque content blob. Because tags are never mutated in place, the full
//! history of any entity can be reconstructed at any instant — that is what
//! [`TemporalRepository`] is for.
//!
//! # Quick start
//!
//! ```no_run
//! use entitydb::{Content, EntityRepository};
//!
//! fn main() -> entitydb::EdbResult<()> {
//!     let repo = EntityRepository::open("./var/data")?;
//!
//!     let doc = repo.create(
//!         None,
//!         vec!["type:doc".into(), "status:draft".into()],
//!         Content::Text("hello".into()),
//!     )?;
//!
//!     repo.add_tag(doc.id, "status:published")?;
//!
//!     let current = repo.get(doc.id)?;
//!     assert!(current.tags.iter().any(|t| t.text == "status:published"));
//!
//!     Ok(())
//! }
//! ```
//!
//! # Crate layout
//!
//! | Crate | Responsibility |
//! |---|---|
//! | `edb-core` | Ids, tags, content, lifecycle states, error taxonomy, limits, config |
//! | `edb-format` | The on-disk binary layout (`entities.db`): header, entity records, index footer |
//! | `edb-wal` | The write-ahead log: frames, durability modes, crash recovery |
//! | `edb-index` | In-memory id/tag/temporal indexes, all rebuildable from the main file |
//! | `edb-engine` | [`EntityRepository`] and [`TemporalRepository`]: the public read/write contract |
//!
//! This crate (`entitydb`) re-exports `edb-engine`'s public surface; callers
//! never need to depend on the inner crates directly.
//!
//! # What this crate is not
//!
//! There is no HTTP server, no RBAC/session layer, and no TLS termination
//! here — those are boundary concerns a caller builds on top of
//! [`EntityRepository`]. [`Config`] parses the full environment variable
//! surface a boundary layer would need (ports, TLS paths, session TTL, rate
//! limiting) so both layers share one configuration source, even though this
//! crate only acts on the fields that affect storage.

#![warn(missing_docs)]

pub use edb_engine::{
    parse_timestamp, BackgroundWorkers, ChangeRecord, Config, Content, DiffResult, DurabilityMode,
    EdbError, EdbResult, Entity, EntityId, EntityRepository, LifecycleEvent, LifecycleState,
    Limits, MetricsOperationFlag, MetricsOperationGuard, PeriodicWorker, RetentionCircuitBreaker,
    Tag, TemporalRepository, TimestampNs,
};

/// Initialize a `tracing` subscriber from `RUST_LOG`/[`Config::log_level`]
/// via `tracing-subscriber::EnvFilter`. Safe to call more than once;
/// subsequent calls are no-ops.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn public_surface_roundtrips_create_and_get() {
        let dir = tempdir().unwrap();
        let repo = EntityRepository::open_with(
            dir.path(),
            Limits::with_small_limits(),
            DurabilityMode::Strict,
        )
        .unwrap();
        let e = repo
            .create(None, vec!["type:doc".into()], Content::Text("hi".into()))
            .unwrap();
        assert_eq!(repo.get(e.id).unwrap().content, Content::Text("hi".into()));
    }
}
