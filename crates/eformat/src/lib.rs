//! The EBF (entity binary format) codec: bit-exact encode/decode for
//! `entities.db`'s file header, entity records, and index footer.
//!
//! Every function here is a pure transform over `&[u8]`/`Vec<u8>` — no file
//! I/O. Callers in `edb-wal` and `edb-engine` own the actual file handles.

#![warn(missing_docs)]

pub mod error;
pub mod footer;
pub mod header;
pub mod record;

pub use error::FormatError;
pub use footer::{IdEntry, IndexFooter};
pub use header::{FileHeader, FORMAT_VERSION, HEADER_SIZE, MAGIC};
pub use record::{decode_entity_record, encode_entity_record, EntityRecord};
