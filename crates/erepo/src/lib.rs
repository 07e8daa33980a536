//! The entity engine: on-disk file handling, the write-ahead log bridge,
//! in-memory indexes, and the public entity/temporal repository API.
//!
//! This crate is the seam where `edb-core`'s types, `edb-format`'s on-disk
//! layout, `edb-wal`'s durability, and `edb-index`'s accelerators meet one
//! coherent read/write contract: a `Database`-like repository, a background
//! scheduler, and a process-wide open-handles registry.

#![warn(missing_docs)]

mod aggregation;
mod background;
mod chunk;
mod file;
mod metrics_gate;
mod registry;
mod repository;
mod retention;
mod temporal;

pub use background::PeriodicWorker;
pub use metrics_gate::{MetricsOperationFlag, MetricsOperationGuard, RetentionCircuitBreaker};
pub use repository::{BackgroundWorkers, EntityRepository};
pub use temporal::{parse_timestamp, ChangeRecord, DiffResult, TemporalRepository};

pub use edb_core::{
    Config, Content, EdbError, EdbResult, Entity, EntityId, LifecycleEvent, LifecycleState, Limits, Tag,
    TimestampNs,
};
pub use edb_wal::DurabilityMode;
