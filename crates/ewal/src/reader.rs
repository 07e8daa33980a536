//! WAL recovery: replay committed transactions, tolerate a torn tail.

use crate::entry::WalEntry;
use crate::frame::decode_frame;
use crate::error::WalError;
use std::fs;
use std::path::Path;

/// One committed transaction recovered from the WAL: every non-`Commit`
/// entry it carried, plus the LSN of its `Commit` frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredTransaction {
    /// LSN of the transaction's `Commit` frame.
    pub commit_lsn: u64,
    /// The entries that preceded the commit, in write order.
    pub entries: Vec<WalEntry>,
}

/// The result of scanning a WAL file from a starting offset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecoveryResult {
    /// Every transaction whose `Commit` frame was read intact, in LSN order.
    pub committed: Vec<RecoveredTransaction>,
    /// Byte offset (relative to the scan's start) the scan stopped at —
    /// either end-of-file, or the first torn/unrecognised frame.
    pub truncated_at: u64,
    /// Highest LSN observed among committed transactions, or the LSN the
    /// scan was handed in `next_lsn_hint` if nothing committed. Callers use
    /// this plus one as the next LSN to assign.
    pub highest_lsn: u64,
}

/// Recovery scanner over a WAL file.
pub struct WalReader;

impl WalReader {
    /// Scan `path` starting at byte `start_offset` (the main file's
    /// `last_checkpoint_offset`-derived WAL position; normally `0`, since the
    /// WAL is truncated at every checkpoint).
    ///
    /// Frames are grouped into transactions ending at a `Commit`. A
    /// transaction is only returned if its `Commit` frame decoded without
    /// error — a torn frame, wherever it occurs, truncates the scan at that
    /// point; any entries belonging to the in-progress (uncommitted) group at
    /// truncation time are discarded, matching "replay committed
    /// transactions ... truncate at first torn/invalid frame."
    ///
    /// Truncation (a short/incomplete trailing frame, the expected shape of a
    /// crash mid-write) is tolerated this way. A [`WalError::Corrupt`] frame
    /// is not: the frame is complete but fails its checksum, which means the
    /// file was damaged rather than simply cut off mid-write, so this
    /// returns `Err` and the caller should treat recovery as having failed
    /// outright rather than truncate-and-continue.
    pub fn recover(path: impl AsRef<Path>, start_offset: u64) -> Result<RecoveryResult, WalError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(RecoveryResult::default());
        }
        let bytes = fs::read(path)?;
        if (start_offset as usize) > bytes.len() {
            return Ok(RecoveryResult { truncated_at: bytes.len() as u64, ..Default::default() });
        }
        let mut cursor = start_offset as usize;
        let mut committed = Vec::new();
        let mut pending = Vec::new();
        let mut highest_lsn = 0u64;

        loop {
            if cursor >= bytes.len() {
                break;
            }
            match decode_frame(&bytes[cursor..], cursor as u64) {
                Ok((frame, consumed)) => {
                    cursor += consumed;
                    highest_lsn = highest_lsn.max(frame.lsn);
                    match frame.entry {
                        WalEntry::Commit => {
                            committed.push(RecoveredTransaction {
                                commit_lsn: frame.lsn,
                                entries: std::mem::take(&mut pending),
                            });
                        }
                        other => pending.push(other),
                    }
                }
                Err(e @ WalError::Corrupt { .. }) => return Err(e),
                Err(WalError::Io(e)) => return Err(WalError::Io(e)),
                Err(_) => break,
            }
        }

        Ok(RecoveryResult {
            committed,
            truncated_at: cursor as u64,
            highest_lsn,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::DurabilityMode;
    use crate::writer::WalWriter;
    use edb_core::{EntityId, Tag};
    use std::io::Write as _;
    use tempfile::tempdir;

    #[test]
    fn recovers_nothing_from_missing_file() {
        let dir = tempdir().unwrap();
        let result = WalReader::recover(dir.path().join("nope.wal"), 0).unwrap();
        assert!(result.committed.is_empty());
    }

    #[test]
    fn recovers_committed_transaction_with_its_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("entities.db.wal");
        let id = EntityId::new();
        {
            let mut w = WalWriter::open(&path, DurabilityMode::Strict, 1).unwrap();
            w.append_transaction(&[
                WalEntry::Create {
                    id,
                    tags: vec![Tag::new(1, "type:doc")],
                    content: b"hi".to_vec(),
                },
                WalEntry::AddTag { id, tag: Tag::new(2, "status:draft") },
            ])
            .unwrap();
        }
        let result = WalReader::recover(&path, 0).unwrap();
        assert_eq!(result.committed.len(), 1);
        assert_eq!(result.committed[0].entries.len(), 2);
    }

    #[test]
    fn truncates_at_torn_tail_and_keeps_prior_commits() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("entities.db.wal");
        {
            let mut w = WalWriter::open(&path, DurabilityMode::Strict, 1).unwrap();
            w.append_transaction(&[WalEntry::AddTag {
                id: EntityId::new(),
                tag: Tag::new(1, "a:b"),
            }])
            .unwrap();
        }
        // Simulate a crash mid-write: append a partial frame.
        {
            let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&[9, 0, 0, 0, 1, 2, 3]).unwrap();
        }
        let good_len = std::fs::read(&path).unwrap().len();
        let result = WalReader::recover(&path, 0).unwrap();
        assert_eq!(result.committed.len(), 1);
        assert!(result.truncated_at < good_len as u64);
    }

    #[test]
    fn uncommitted_tail_is_discarded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("entities.db.wal");
        {
            let mut w = WalWriter::open(&path, DurabilityMode::Strict, 1).unwrap();
            w.append_transaction(&[WalEntry::AddTag {
                id: EntityId::new(),
                tag: Tag::new(1, "a:b"),
            }])
            .unwrap();
            // write_frame is private; emulate an in-progress (uncommitted)
            // transaction by writing a raw AddTag frame with no Commit after.
        }
        use crate::frame::encode_frame;
        use crate::frame::WalFrame;
        {
            let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
            let frame = WalFrame {
                lsn: 999,
                entry: WalEntry::AddTag { id: EntityId::new(), tag: Tag::new(9, "x:y") },
            };
            f.write_all(&encode_frame(&frame)).unwrap();
        }
        let result = WalReader::recover(&path, 0).unwrap();
        assert_eq!(result.committed.len(), 1);
    }

    #[test]
    fn corrupted_committed_frame_fails_recovery() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("entities.db.wal");
        {
            let mut w = WalWriter::open(&path, DurabilityMode::Strict, 1).unwrap();
            w.append_transaction(&[WalEntry::AddTag {
                id: EntityId::new(),
                tag: Tag::new(1, "a:b"),
            }])
            .unwrap();
        }
        // Flip a byte inside the already-written, fully-formed Commit frame —
        // unlike the torn-tail tests, nothing is appended or truncated, so
        // the frame length is intact and only its checksum is wrong.
        let bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        let mut corrupted = bytes.clone();
        corrupted[last] ^= 0xFF;
        std::fs::write(&path, &corrupted).unwrap();

        let result = WalReader::recover(&path, 0);
        assert!(matches!(result, Err(WalError::Corrupt { .. })));
    }

    #[test]
    fn start_offset_skips_already_checkpointed_frames() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("entities.db.wal");
        let mut w = WalWriter::open(&path, DurabilityMode::Strict, 1).unwrap();
        w.append_transaction(&[WalEntry::Commit]).unwrap();
        let offset_after_first = w.size().unwrap();
        w.append_transaction(&[WalEntry::Commit]).unwrap();
        drop(w);

        let result = WalReader::recover(&path, offset_after_first).unwrap();
        assert_eq!(result.committed.len(), 1);
    }
}
