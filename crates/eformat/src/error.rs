//! Errors raised while encoding/decoding the on-disk format.

use thiserror::Error;

/// Errors from header/record/footer encode-decode.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The file's magic bytes did not match `"EDB1"`.
    #[error("invalid magic: expected {expected:?}, found {actual:?}")]
    InvalidMagic {
        /// Expected magic bytes.
        expected: [u8; 4],
        /// Magic bytes actually read.
        actual: [u8; 4],
    },

    /// The file header declares a format version newer than this crate supports.
    #[error("unsupported format version {version}, max supported is {max_supported}")]
    UnsupportedVersion {
        /// Version found in the header.
        version: u16,
        /// Highest version this build understands.
        max_supported: u16,
    },

    /// A CRC32 check failed.
    #[error("checksum mismatch: expected {expected:#010x}, computed {actual:#010x}")]
    ChecksumMismatch {
        /// Checksum stored in the record.
        expected: u32,
        /// Checksum computed over the record's bytes.
        actual: u32,
    },

    /// Fewer bytes were available than the record declared it needed.
    #[error("truncated record: need at least {needed} bytes, have {available}")]
    TruncatedRecord {
        /// Bytes required to decode the structure.
        needed: usize,
        /// Bytes actually available.
        available: usize,
    },

    /// A tag or content field was not valid UTF-8 where UTF-8 was required.
    #[error("invalid UTF-8 in on-disk record")]
    Utf8(#[from] std::string::FromUtf8Error),
}
