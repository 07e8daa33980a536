//! Raw file operations over `entities.db`: header, sequential records, and
//! the checkpoint footer.
//!
//! Everything here is `&mut`-exclusive — callers serialize access through
//! the repository's writer lock, so this struct does no locking of its own.

use edb_core::EdbResult;
use edb_format::{
    decode_entity_record, encode_entity_record, EntityRecord, FileHeader, IdEntry, IndexFooter,
    HEADER_SIZE,
};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// The main on-disk file, opened for random-access reads and sequential
/// appends.
pub struct EbfFile {
    file: File,
    path: PathBuf,
    header: FileHeader,
}

/// What a full load of `entities.db` yields: every entity's latest record
/// plus its offset, and the tag map the footer (or a rebuild) produced.
pub struct LoadedFile {
    /// `id -> (offset, record)` for the latest record of every non-purged id.
    pub records: HashMap<edb_core::EntityId, (u64, EntityRecord)>,
    /// End of valid record data (start of any trailing footer).
    pub records_end: u64,
}

impl EbfFile {
    /// Open an existing `entities.db`, or create a fresh one with a new
    /// header if it doesn't exist yet.
    pub fn open_or_create(path: impl AsRef<Path>, now_ns: i64) -> EdbResult<Self> {
        let path = path.as_ref().to_path_buf();
        let existed = path.exists();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        let header = if existed && file.metadata()?.len() >= HEADER_SIZE as u64 {
            let mut buf = [0u8; HEADER_SIZE];
            file.seek(SeekFrom::Start(0))?;
            file.read_exact(&mut buf)?;
            FileHeader::from_bytes(&buf)
                .map_err(|e| edb_core::EdbError::storage_with_source("bad file header", e))?
        } else {
            let header = FileHeader::new(now_ns);
            file.seek(SeekFrom::Start(0))?;
            file.write_all(&header.to_bytes())?;
            file.set_len(HEADER_SIZE as u64)?;
            file.sync_all()?;
            header
        };

        Ok(Self { file, path, header })
    }

    /// Path to the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current header, as last read from or written to disk.
    pub fn header(&self) -> FileHeader {
        self.header
    }

    /// Load every entity's latest record, preferring the checkpoint footer
    /// when its checksum validates, falling back to a full sequential scan
    /// otherwise.
    pub fn load(&mut self) -> EdbResult<LoadedFile> {
        if self.header.index_footer_offset != 0 {
            if let Some(loaded) = self.try_load_from_footer()? {
                return Ok(loaded);
            }
            tracing::warn!("index footer failed to validate, rebuilding from a full scan");
        }
        self.scan_records(HEADER_SIZE as u64, self.header.last_checkpoint_offset)
    }

    fn try_load_from_footer(&mut self) -> EdbResult<Option<LoadedFile>> {
        let footer_start = self.header.index_footer_offset;
        let len = self.file.metadata()?.len();
        if footer_start >= len {
            return Ok(None);
        }
        let mut buf = vec![0u8; (len - footer_start) as usize];
        self.file.seek(SeekFrom::Start(footer_start))?;
        self.file.read_exact(&mut buf)?;
        let footer = match IndexFooter::from_bytes(&buf) {
            Ok(f) => f,
            Err(_) => return Ok(None),
        };

        let mut records = HashMap::with_capacity(footer.entries.len());
        for entry in &footer.entries {
            let record = self.read_record_at(entry.offset)?;
            records.insert(entry.id, (entry.offset, record));
        }
        Ok(Some(LoadedFile {
            records,
            records_end: self.header.last_checkpoint_offset,
        }))
    }

    fn scan_records(&mut self, from: u64, to: u64) -> EdbResult<LoadedFile> {
        let to = to.max(from);
        let mut buf = vec![0u8; (to - from) as usize];
        self.file.seek(SeekFrom::Start(from))?;
        self.file.read_exact(&mut buf)?;

        let mut records = HashMap::new();
        let mut cursor = 0usize;
        while cursor < buf.len() {
            let (record, consumed) = decode_entity_record(&buf[cursor..])
                .map_err(|e| edb_core::EdbError::storage_with_source("corrupt entity record", e))?;
            records.insert(record.id, (from + cursor as u64, record));
            cursor += consumed;
        }
        Ok(LoadedFile { records, records_end: to })
    }

    /// Read one record at an absolute file offset.
    pub fn read_record_at(&mut self, offset: u64) -> EdbResult<EntityRecord> {
        // Records don't know their own length ahead of time, so read the
        // 4-byte length prefix first, then the rest.
        self.file.seek(SeekFrom::Start(offset))?;
        let mut len_buf = [0u8; 4];
        self.file.read_exact(&mut len_buf)?;
        let record_len = u32::from_le_bytes(len_buf) as usize;
        let mut full = vec![0u8; 4 + record_len];
        full[..4].copy_from_slice(&len_buf);
        self.file.read_exact(&mut full[4..])?;
        let (record, _) = decode_entity_record(&full)
            .map_err(|e| edb_core::EdbError::storage_with_source("corrupt entity record", e))?;
        Ok(record)
    }

    /// Append one record at `records_end`, returning its offset and encoded length.
    pub fn append_record(&mut self, records_end: u64, record: &EntityRecord) -> EdbResult<(u64, u32)> {
        let bytes = encode_entity_record(record);
        self.file.seek(SeekFrom::Start(records_end))?;
        self.file.write_all(&bytes)?;
        Ok((records_end, bytes.len() as u32))
    }

    /// Write the footer at `offset` (the current records boundary), update
    /// and persist the header to point at it, and fsync.
    pub fn write_footer_and_checkpoint(&mut self, records_end: u64, footer: &IndexFooter) -> EdbResult<()> {
        let bytes = footer.to_bytes();
        self.file.seek(SeekFrom::Start(records_end))?;
        self.file.write_all(&bytes)?;
        self.file.set_len(records_end + bytes.len() as u64)?;

        self.header.last_checkpoint_offset = records_end;
        self.header.index_footer_offset = records_end;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&self.header.to_bytes())?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Build an [`IdEntry`] for a just-appended record.
    pub fn id_entry(id: edb_core::EntityId, offset: u64, len: u32) -> IdEntry {
        IdEntry { id, offset, len }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edb_core::{EntityId, LifecycleState, Tag};
    use tempfile::tempdir;

    fn sample_record(id: EntityId) -> EntityRecord {
        EntityRecord {
            id,
            created_at: 1,
            updated_at: 1,
            state: LifecycleState::Active,
            tags: vec![Tag::new(1, "type:doc")],
            content: b"hi".to_vec(),
        }
    }

    #[test]
    fn create_then_reopen_preserves_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("entities.db");
        let created_at;
        {
            let f = EbfFile::open_or_create(&path, 12345).unwrap();
            created_at = f.header().created_at_ns;
        }
        let f2 = EbfFile::open_or_create(&path, 99999).unwrap();
        assert_eq!(f2.header().created_at_ns, created_at);
    }

    #[test]
    fn append_then_read_record_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("entities.db");
        let mut f = EbfFile::open_or_create(&path, 1).unwrap();
        let id = EntityId::new();
        let record = sample_record(id);
        let start = f.header().last_checkpoint_offset;
        let (offset, len) = f.append_record(start, &record).unwrap();
        assert_eq!(offset, start);
        let read_back = f.read_record_at(offset).unwrap();
        assert_eq!(read_back, record);
        assert!(len > 0);
    }

    #[test]
    fn scan_rebuilds_records_without_footer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("entities.db");
        let mut f = EbfFile::open_or_create(&path, 1).unwrap();
        let id = EntityId::new();
        let start = f.header().last_checkpoint_offset;
        let (_, len) = f.append_record(start, &sample_record(id)).unwrap();
        let loaded = f.scan_records(start, start + len as u64).unwrap();
        assert!(loaded.records.contains_key(&id));
    }

    #[test]
    fn footer_roundtrip_accelerates_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("entities.db");
        let mut f = EbfFile::open_or_create(&path, 1).unwrap();
        let id = EntityId::new();
        let start = f.header().last_checkpoint_offset;
        let (offset, len) = f.append_record(start, &sample_record(id)).unwrap();
        let footer = IndexFooter {
            entries: vec![EbfFile::id_entry(id, offset, len)],
            tag_index: HashMap::new(),
        };
        f.write_footer_and_checkpoint(start + len as u64, &footer).unwrap();
        drop(f);

        let mut reopened = EbfFile::open_or_create(&path, 1).unwrap();
        let loaded = reopened.load().unwrap();
        assert!(loaded.records.contains_key(&id));
    }
}
