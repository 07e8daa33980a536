//! Retention worker: prunes expired `value:*` metric samples.
//!
//! A periodic scan, generalized from key-level TTL expiry to per-entity tag
//! pruning: each metric entity's `value:*` tags are dropped once they age
//! past the window for their bucket, via the one non-append-only WAL op
//! ([`edb_wal::WalEntry::DeleteTagSet`]).

use crate::repository::EntityRepository;
use edb_core::now_ns;
use std::sync::Arc;

pub use edb_core::config::RetentionWindows;

/// Run one retention sweep: skipped entirely if a metrics operation is in
/// flight or the circuit breaker is open; every per-entity failure trips the
/// breaker but does not stop the rest of the sweep.
pub fn run_cycle(repo: &Arc<EntityRepository>, windows: RetentionWindows) {
    if repo.metrics_flag().is_set() {
        tracing::debug!("retention cycle skipped: metrics operation in flight");
        return;
    }
    if repo.circuit_breaker().is_open() {
        tracing::warn!("retention cycle skipped: circuit breaker open");
        return;
    }
    let _guard = repo.metrics_flag().enter();

    let now = now_ns();
    for entity in repo.list() {
        if !entity.tags.iter().any(|t| t.namespace() == "value") {
            continue;
        }
        let window_minutes = match bucket_of(&entity.tags) {
            Bucket::Raw => windows.raw_minutes,
            Bucket::OneMin => windows.one_min_minutes,
            Bucket::OneHour => windows.one_hour_minutes,
            Bucket::OneDay => windows.one_day_minutes,
        };
        let cutoff = now - window_minutes as i64 * 60_000_000_000;
        let stale: Vec<String> = entity
            .tags
            .iter()
            .filter(|t| t.namespace() == "value" && t.t_ns < cutoff)
            .map(|t| t.text.clone())
            .collect();
        if stale.is_empty() {
            continue;
        }
        match repo.delete_tag_set(entity.id, stale) {
            Ok(()) => repo.circuit_breaker().record_success(),
            Err(e) => {
                repo.circuit_breaker().record_failure();
                tracing::error!(error = %e, id = %entity.id, "retention prune failed");
            }
        }
    }
}

enum Bucket {
    Raw,
    OneMin,
    OneHour,
    OneDay,
}

fn bucket_of(tags: &[edb_core::Tag]) -> Bucket {
    tags.iter()
        .find(|t| t.namespace() == "metric" && t.value().starts_with("bucket:"))
        .map(|t| match &t.value()["bucket:".len()..] {
            "1min" => Bucket::OneMin,
            "1hour" => Bucket::OneHour,
            "1day" => Bucket::OneDay,
            _ => Bucket::Raw,
        })
        .unwrap_or(Bucket::Raw)
}
