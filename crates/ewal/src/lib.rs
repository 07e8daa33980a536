//! The write-ahead log: `entities.db.wal`, frame encode/decode, the writer's
//! durability/fsync discipline, and crash-recovery replay.

#![warn(missing_docs)]

pub mod entry;
pub mod error;
pub mod frame;
pub mod mode;
pub mod reader;
pub mod writer;

pub use entry::WalEntry;
pub use error::WalError;
pub use frame::{decode_frame, encode_frame, WalFrame};
pub use mode::DurabilityMode;
pub use reader::{RecoveredTransaction, RecoveryResult, WalReader};
pub use writer::WalWriter;
