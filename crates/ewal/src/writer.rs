//! The WAL writer: a single growing `entities.db.wal` file.
//!
//! One file with LSN-ordered frames rather than size-rotated segments; this
//! writer tracks durability-mode/fsync accounting (`bytes_since_sync`,
//! `writes_since_sync`, `last_sync_time`) but never rotates.

use crate::entry::WalEntry;
use crate::frame::{encode_frame, WalFrame};
use crate::mode::DurabilityMode;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Appends frames to `entities.db.wal` under the durability policy it was
/// opened with.
///
/// Every repository mutation calls [`WalWriter::append_transaction`] exactly
/// once; the writer is responsible for LSN assignment, frame encoding, and
/// the documented fsync discipline.
pub struct WalWriter {
    file: BufWriter<File>,
    path: PathBuf,
    durability: DurabilityMode,
    next_lsn: AtomicU64,
    bytes_since_sync: u64,
    writes_since_sync: usize,
    last_sync_time: Instant,
}

impl WalWriter {
    /// Open (creating if absent) the WAL file at `path`, resuming LSN
    /// numbering from `next_lsn` (the caller — `edb-engine`'s recovery path —
    /// determines this from the highest LSN seen during replay).
    pub fn open(path: impl AsRef<Path>, durability: DurabilityMode, next_lsn: u64) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            file: BufWriter::new(file),
            path,
            durability,
            next_lsn: AtomicU64::new(next_lsn),
            bytes_since_sync: 0,
            writes_since_sync: 0,
            last_sync_time: Instant::now(),
        })
    }

    /// Path this writer is appending to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one transaction: every entry in `entries`, each as its own
    /// frame, followed by a `Commit` frame, then fsync per the configured
    /// durability mode. Returns the LSN of the `Commit` frame, which callers
    /// treat as the transaction's durability point.
    ///
    /// A caller observing `Ok(lsn)` is guaranteed the transaction is durable
    /// once this returns, for any mode other than `DurabilityMode::None`
    /// (test-only; no durability guarantee at all).
    pub fn append_transaction(&mut self, entries: &[WalEntry]) -> std::io::Result<u64> {
        for entry in entries {
            let lsn = self.next_lsn.fetch_add(1, Ordering::SeqCst);
            self.write_frame(&WalFrame { lsn, entry: entry.clone() })?;
        }
        let commit_lsn = self.next_lsn.fetch_add(1, Ordering::SeqCst);
        self.write_frame(&WalFrame { lsn: commit_lsn, entry: WalEntry::Commit })?;

        self.maybe_sync()?;
        Ok(commit_lsn)
    }

    fn write_frame(&mut self, frame: &WalFrame) -> std::io::Result<()> {
        let bytes = encode_frame(frame);
        self.file.write_all(&bytes)?;
        self.bytes_since_sync += bytes.len() as u64;
        self.writes_since_sync += 1;
        Ok(())
    }

    fn maybe_sync(&mut self) -> std::io::Result<()> {
        let should_sync = match self.durability {
            DurabilityMode::Strict => true,
            DurabilityMode::Batched { interval_ms, batch_size } => {
                self.writes_since_sync >= batch_size
                    || self.last_sync_time.elapsed().as_millis() as u64 >= interval_ms
            }
            DurabilityMode::None => false,
        };
        if should_sync {
            self.sync()?;
        }
        Ok(())
    }

    /// Force an fsync regardless of durability mode, and reset the batching
    /// counters. Used by the checkpointer before it folds frames into the
    /// main file, and by tests that want to assert on-disk state.
    pub fn sync(&mut self) -> std::io::Result<()> {
        self.file.flush()?;
        self.file.get_ref().sync_data()?;
        self.bytes_since_sync = 0;
        self.writes_since_sync = 0;
        self.last_sync_time = Instant::now();
        Ok(())
    }

    /// Highest LSN that will be assigned to the *next* frame written.
    pub fn next_lsn(&self) -> u64 {
        self.next_lsn.load(Ordering::SeqCst)
    }

    /// Truncate the WAL file to zero length and reset LSN numbering to
    /// `next_lsn`. Called by the checkpointer once every frame has been
    /// folded into the main file.
    pub fn truncate_and_reset(&mut self, next_lsn: u64) -> std::io::Result<()> {
        self.file.flush()?;
        let file = OpenOptions::new().write(true).truncate(true).open(&self.path)?;
        self.file = BufWriter::new(file);
        self.next_lsn.store(next_lsn, Ordering::SeqCst);
        self.bytes_since_sync = 0;
        self.writes_since_sync = 0;
        self.last_sync_time = Instant::now();
        Ok(())
    }

    /// Current on-disk size of the WAL file, used by the checkpointer's
    /// size-triggered checkpoint policy.
    pub fn size(&self) -> std::io::Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::WalReader;
    use edb_core::{EntityId, Tag};
    use tempfile::tempdir;

    #[test]
    fn strict_mode_syncs_every_transaction() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("entities.db.wal");
        let mut w = WalWriter::open(&path, DurabilityMode::Strict, 1).unwrap();
        let id = EntityId::new();
        w.append_transaction(&[WalEntry::Create {
            id,
            tags: vec![Tag::new(1, "type:doc")],
            content: b"hi".to_vec(),
        }])
        .unwrap();
        assert!(path.exists());
        let recovered = WalReader::recover(&path, 0).unwrap();
        assert_eq!(recovered.committed.len(), 1);
    }

    #[test]
    fn lsns_increase_monotonically_across_transactions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("entities.db.wal");
        let mut w = WalWriter::open(&path, DurabilityMode::Strict, 1).unwrap();
        let lsn1 = w
            .append_transaction(&[WalEntry::AddTag {
                id: EntityId::new(),
                tag: Tag::new(1, "a:b"),
            }])
            .unwrap();
        let lsn2 = w
            .append_transaction(&[WalEntry::AddTag {
                id: EntityId::new(),
                tag: Tag::new(2, "a:c"),
            }])
            .unwrap();
        assert!(lsn2 > lsn1);
    }

    #[test]
    fn batched_mode_defers_sync_until_threshold() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("entities.db.wal");
        let mut w = WalWriter::open(
            &path,
            DurabilityMode::Batched { interval_ms: 60_000, batch_size: 3 },
            1,
        )
        .unwrap();
        for i in 0..2 {
            w.append_transaction(&[WalEntry::AddTag {
                id: EntityId::new(),
                tag: Tag::new(i, "a:b"),
            }])
            .unwrap();
        }
        // Frames are written (not just buffered in memory) regardless of
        // fsync state, so recovery still sees them.
        let recovered = WalReader::recover(&path, 0).unwrap();
        assert_eq!(recovered.committed.len(), 2);
    }

    #[test]
    fn truncate_and_reset_empties_file_and_resets_lsn() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("entities.db.wal");
        let mut w = WalWriter::open(&path, DurabilityMode::Strict, 1).unwrap();
        w.append_transaction(&[WalEntry::Commit]).unwrap();
        w.truncate_and_reset(100).unwrap();
        assert_eq!(w.size().unwrap(), 0);
        assert_eq!(w.next_lsn(), 100);
    }

    #[test]
    fn resumes_lsn_numbering_on_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("entities.db.wal");
        {
            let mut w = WalWriter::open(&path, DurabilityMode::Strict, 1).unwrap();
            w.append_transaction(&[WalEntry::Commit]).unwrap();
        }
        let w2 = WalWriter::open(&path, DurabilityMode::Strict, 50).unwrap();
        assert_eq!(w2.next_lsn(), 50);
    }
}
