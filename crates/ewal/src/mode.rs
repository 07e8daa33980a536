//! Durability mode: when the writer fsyncs.

use std::time::Duration;

/// Controls when the WAL writer calls `fsync`.
///
/// Orthogonal to whether the WAL file exists at all — even `None` still
/// appends frames, it just never syncs them, so a process crash (not just a
/// power loss) can still lose nothing; only an OS-level crash can.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurabilityMode {
    /// fsync after every committed transaction. Default, and the only mode
    /// that satisfies "every state-mutating operation ...
    /// fsyncs before returning success" on its own.
    Strict,
    /// fsync every `batch_size` commits or every `interval_ms`, whichever
    /// comes first — the "group commit" rule. Waiting callers within
    /// one batch share a single fsync; their results are still returned in
    /// LSN order.
    Batched {
        /// Maximum milliseconds between fsyncs.
        interval_ms: u64,
        /// Maximum commits between fsyncs.
        batch_size: usize,
    },
    /// Never fsyncs. Test-only — `HIGH_PERFORMANCE` maps to `Batched`, not
    /// this, in production configuration.
    None,
}

impl DurabilityMode {
    /// The recommended production default: batched with a short interval.
    pub fn standard_default() -> Self {
        DurabilityMode::Batched {
            interval_ms: 50,
            batch_size: 200,
        }
    }

    /// True if this mode ever calls `fsync`.
    pub fn syncs(&self) -> bool {
        !matches!(self, DurabilityMode::None)
    }

    /// Interval as a `Duration`, for `Batched`; `None` for the other modes.
    pub fn interval(&self) -> Option<Duration> {
        match self {
            DurabilityMode::Batched { interval_ms, .. } => Some(Duration::from_millis(*interval_ms)),
            _ => None,
        }
    }
}

impl Default for DurabilityMode {
    fn default() -> Self {
        DurabilityMode::Strict
    }
}
