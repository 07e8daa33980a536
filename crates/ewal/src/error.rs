//! Errors raised by the write-ahead log.

use thiserror::Error;

/// Errors from appending to or recovering the WAL.
#[derive(Debug, Error)]
pub enum WalError {
    /// The underlying file could not be read or written.
    #[error("WAL I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fewer bytes remain than the frame's declared length calls for. This is
    /// the expected shape of a crash mid-write: the writer never got to
    /// finish appending the frame. Tolerable during recovery — the caller
    /// truncates here and keeps everything committed before it.
    #[error("torn WAL frame at offset {offset}")]
    TornFrame {
        /// Byte offset of the start of the invalid frame.
        offset: u64,
    },

    /// The full frame length is present, but its CRC does not match the
    /// payload. Unlike [`WalError::TornFrame`], the bytes for a complete
    /// frame are there — this is corruption, not an in-progress write, and
    /// is never tolerated as a torn tail.
    #[error("corrupt WAL frame at offset {offset}: checksum mismatch")]
    Corrupt {
        /// Byte offset of the start of the corrupt frame.
        offset: u64,
    },

    /// A frame declared an `op` byte this build does not recognise.
    #[error("unknown WAL op byte {op} at offset {offset}")]
    UnknownOp {
        /// The unrecognised op byte.
        op: u8,
        /// Byte offset the frame started at.
        offset: u64,
    },

    /// A tag or content payload was not valid UTF-8 where required.
    #[error("invalid UTF-8 in WAL payload")]
    Utf8(#[from] std::string::FromUtf8Error),
}
