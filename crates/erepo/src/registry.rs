//! Process-wide open-repository registry, keyed by canonicalized data path.
//!
//! Mirrors `engine/src/database/registry.rs`'s `OPEN_DATABASES`: opening the
//! same path twice returns the same handle, so two callers never race over
//! the same WAL file. Weak references let the repository drop cleanly once
//! every `Arc` handle is gone.

use crate::repository::EntityRepository;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Weak};

static OPEN_REPOSITORIES: Lazy<Mutex<HashMap<PathBuf, Weak<EntityRepository>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Return the already-open handle for `canonical_path`, or register `build`'s
/// result as the new one.
pub fn open_or_insert(
    canonical_path: PathBuf,
    build: impl FnOnce() -> edb_core::EdbResult<Arc<EntityRepository>>,
) -> edb_core::EdbResult<Arc<EntityRepository>> {
    let mut registry = OPEN_REPOSITORIES.lock();
    if let Some(existing) = registry.get(&canonical_path).and_then(Weak::upgrade) {
        return Ok(existing);
    }
    let repo = build()?;
    registry.insert(canonical_path, Arc::downgrade(&repo));
    Ok(repo)
}

#[cfg(test)]
pub(crate) fn registered_count() -> usize {
    OPEN_REPOSITORIES.lock().len()
}
