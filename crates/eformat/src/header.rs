//! `entities.db` file header: 64 bytes, little-endian, CRC32-protected.

use crate::error::FormatError;

/// Magic bytes identifying an EBF file.
pub const MAGIC: [u8; 4] = *b"EDB1";

/// Highest format version this build can open.
pub const FORMAT_VERSION: u16 = 1;

/// Default page size recorded in new headers.
pub const DEFAULT_PAGE_SIZE: u32 = 4096;

/// Encoded size of [`FileHeader`], in bytes.
pub const HEADER_SIZE: usize = 64;

const RESERVED_SIZE: usize = 24;

/// The fixed-size header at offset 0 of `entities.db`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Format version; files with a newer version than this build supports
    /// are refused at open (resolves the Open Question on WAL version checks).
    pub format_version: u16,
    /// Reserved bit flags, currently always zero.
    pub flags: u16,
    /// Nominal page size, default 4096.
    pub page_size: u32,
    /// Nanosecond epoch timestamp this file was created.
    pub created_at_ns: i64,
    /// Byte offset of the last successful checkpoint.
    pub last_checkpoint_offset: u64,
    /// Byte offset of the index footer, or 0 if none has been written yet.
    pub index_footer_offset: u64,
}

impl FileHeader {
    /// Build a fresh header for a newly created database file.
    pub fn new(created_at_ns: i64) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            flags: 0,
            page_size: DEFAULT_PAGE_SIZE,
            created_at_ns,
            last_checkpoint_offset: HEADER_SIZE as u64,
            index_footer_offset: 0,
        }
    }

    /// Encode to exactly [`HEADER_SIZE`] bytes, CRC32-protected.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        let mut w = 0;
        buf[w..w + 4].copy_from_slice(&MAGIC);
        w += 4;
        buf[w..w + 2].copy_from_slice(&self.format_version.to_le_bytes());
        w += 2;
        buf[w..w + 2].copy_from_slice(&self.flags.to_le_bytes());
        w += 2;
        buf[w..w + 4].copy_from_slice(&self.page_size.to_le_bytes());
        w += 4;
        buf[w..w + 8].copy_from_slice(&self.created_at_ns.to_le_bytes());
        w += 8;
        buf[w..w + 8].copy_from_slice(&self.last_checkpoint_offset.to_le_bytes());
        w += 8;
        buf[w..w + 8].copy_from_slice(&self.index_footer_offset.to_le_bytes());
        w += 8;
        // reserved bytes stay zero
        w += RESERVED_SIZE;
        let crc = crc32fast::hash(&buf[..w]);
        buf[w..w + 4].copy_from_slice(&crc.to_le_bytes());
        buf
    }

    /// Decode from bytes, validating magic, version, and checksum.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < HEADER_SIZE {
            return Err(FormatError::TruncatedRecord {
                needed: HEADER_SIZE,
                available: bytes.len(),
            });
        }
        let mut actual_magic = [0u8; 4];
        actual_magic.copy_from_slice(&bytes[0..4]);
        if actual_magic != MAGIC {
            return Err(FormatError::InvalidMagic {
                expected: MAGIC,
                actual: actual_magic,
            });
        }
        let format_version = u16::from_le_bytes(bytes[4..6].try_into().unwrap());
        if format_version > FORMAT_VERSION {
            return Err(FormatError::UnsupportedVersion {
                version: format_version,
                max_supported: FORMAT_VERSION,
            });
        }
        let flags = u16::from_le_bytes(bytes[6..8].try_into().unwrap());
        let page_size = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
        let created_at_ns = i64::from_le_bytes(bytes[12..20].try_into().unwrap());
        let last_checkpoint_offset = u64::from_le_bytes(bytes[20..28].try_into().unwrap());
        let index_footer_offset = u64::from_le_bytes(bytes[28..36].try_into().unwrap());
        let crc_offset = HEADER_SIZE - 4;
        let expected_crc = u32::from_le_bytes(
            bytes[crc_offset..crc_offset + 4].try_into().unwrap(),
        );
        let actual_crc = crc32fast::hash(&bytes[..crc_offset]);
        if expected_crc != actual_crc {
            return Err(FormatError::ChecksumMismatch {
                expected: expected_crc,
                actual: actual_crc,
            });
        }
        Ok(Self {
            format_version,
            flags,
            page_size,
            created_at_ns,
            last_checkpoint_offset,
            index_footer_offset,
        })
    }
}
