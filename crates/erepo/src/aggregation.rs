//! Aggregation worker: buckets raw `value:*` metric samples into 1-minute,
//! 1-hour, and 1-day rollups, each recorded as a new sample on a sibling
//! aggregate entity.
//!
//! Shares the same cadence/skip-on-busy shape as [`crate::retention`]; the
//! bucket math is fixed-window averaging generalized from a hardcoded key
//! scheme to tag-addressed sibling entities, so aggregates are ordinary
//! entities, queryable through the same API as everything else.

use crate::repository::EntityRepository;
use edb_core::{now_ns, Content, Entity};
use std::sync::Arc;

const WINDOWS: [(&str, i64); 3] = [
    ("1min", 60_000_000_000),
    ("1hour", 3_600_000_000_000),
    ("1day", 86_400_000_000_000),
];

/// Run one aggregation pass over every `type:metric` entity.
pub fn run_cycle(repo: &Arc<EntityRepository>) {
    if repo.metrics_flag().is_set() {
        tracing::debug!("aggregation cycle skipped: metrics operation in flight");
        return;
    }
    if repo.circuit_breaker().is_open() {
        tracing::warn!("aggregation cycle skipped: circuit breaker open");
        return;
    }
    let _guard = repo.metrics_flag().enter();

    for source in repo.list_by_tag("type:metric") {
        for (label, window_ns) in WINDOWS {
            aggregate_one(repo, &source, label, window_ns);
        }
    }
}

fn aggregate_one(repo: &Arc<EntityRepository>, source: &Entity, bucket_label: &str, window_ns: i64) {
    let cutoff = now_ns() - window_ns;
    let samples: Vec<f64> = source
        .tags
        .iter()
        .filter(|t| t.namespace() == "value" && t.t_ns >= cutoff)
        .filter_map(|t| t.value().parse().ok())
        .collect();
    if samples.is_empty() {
        return;
    }
    let count = samples.len();
    let sum: f64 = samples.iter().sum();
    let avg = sum / count as f64;
    let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let bucket_start = cutoff;

    let source_tag = format!("metric:agg_of:{}", source.id);
    let bucket_tag = format!("metric:bucket:{bucket_label}");

    let target_id = match repo.list_by_tags(&[source_tag.clone(), bucket_tag.clone()], true).into_iter().next() {
        Some(existing) => existing.id,
        None => {
            match repo.create(
                None,
                vec!["type:metric_agg".into(), source_tag, bucket_tag],
                Content::Text(String::new()),
            ) {
                Ok(entity) => entity.id,
                Err(e) => {
                    repo.circuit_breaker().record_failure();
                    tracing::error!(error = %e, source = %source.id, "failed to create aggregate entity");
                    return;
                }
            }
        }
    };

    // One sample per statistic, sharing the same write timestamp, so a
    // single aggregation pass reads back as one coherent temporal tag group.
    let result = [
        format!("value:avg:{avg}"),
        format!("value:min:{min}"),
        format!("value:max:{max}"),
        format!("value:count:{count}"),
        format!("value:bucket-start:{bucket_start}"),
    ]
    .into_iter()
    .try_for_each(|tag| repo.add_tag(target_id, tag).map(|_| ()));

    match result {
        Ok(()) => repo.circuit_breaker().record_success(),
        Err(e) => {
            repo.circuit_breaker().record_failure();
            tracing::error!(error = %e, target = %target_id, "failed to record aggregate sample");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edb_core::{Limits, Tag};
    use edb_wal::DurabilityMode;
    use tempfile::tempdir;

    fn repo() -> Arc<EntityRepository> {
        let dir = tempdir().unwrap();
        EntityRepository::open_with(dir.keep(), Limits::with_small_limits(), DurabilityMode::Strict).unwrap()
    }

    #[test]
    fn aggregates_recent_samples_into_a_sibling_entity() {
        let repo = repo();
        let e = repo.create(None, vec!["type:metric".into()], Content::Text(String::new())).unwrap();
        {
            let mut idx = repo.indexes.write();
            let entity = idx.entities.get_mut(&e.id).unwrap();
            entity.tags.push(Tag::new(now_ns(), "value:10"));
            entity.tags.push(Tag::new(now_ns(), "value:20"));
        }

        run_cycle(&repo);

        let aggregates = repo.list_by_tag(&format!("metric:agg_of:{}", e.id));
        assert_eq!(aggregates.len(), 1);
        assert!(aggregates[0].tags.iter().any(|t| t.namespace() == "value"));
    }

    #[test]
    fn no_samples_means_no_aggregate_created() {
        let repo = repo();
        repo.create(None, vec!["type:metric".into()], Content::Text(String::new())).unwrap();
        run_cycle(&repo);
        assert!(repo.list_by_tag_wildcard("metric:agg_of:*").is_empty());
    }
}
