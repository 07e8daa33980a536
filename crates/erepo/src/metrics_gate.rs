//! Process-wide metrics-operation flag and the retention circuit breaker.
//!
//! Modelled as small `Atomic*` structs with explicit init/teardown and a
//! scoped RAII guard, sized to exactly one flag and
//! one breaker rather than a full task queue.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Set while any code path is itself emitting metrics, so the retention and
/// aggregation workers (and any request-metrics middleware outside this
/// crate) can skip work and avoid feeding back into themselves.
#[derive(Default)]
pub struct MetricsOperationFlag {
    active: AtomicBool,
}

impl MetricsOperationFlag {
    /// A cleared flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if a metrics operation is currently in flight.
    pub fn is_set(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Enter a metrics operation, returning a guard that clears the flag on
    /// drop (including on panic) so it can never be left set.
    pub fn enter(&self) -> MetricsOperationGuard<'_> {
        self.active.store(true, Ordering::Release);
        MetricsOperationGuard { flag: self }
    }
}

/// Clears the owning [`MetricsOperationFlag`] when dropped.
pub struct MetricsOperationGuard<'a> {
    flag: &'a MetricsOperationFlag,
}

impl Drop for MetricsOperationGuard<'_> {
    fn drop(&mut self) {
        self.flag.active.store(false, Ordering::Release);
    }
}

/// Opens after five consecutive failed metrics writes; auto-closes after
/// five minutes.
pub struct RetentionCircuitBreaker {
    consecutive_failures: AtomicU32,
    opened_at: Mutex<Option<Instant>>,
}

const FAILURE_THRESHOLD: u32 = 5;
const REOPEN_AFTER: Duration = Duration::from_secs(5 * 60);

impl Default for RetentionCircuitBreaker {
    fn default() -> Self {
        Self {
            consecutive_failures: AtomicU32::new(0),
            opened_at: Mutex::new(None),
        }
    }
}

impl RetentionCircuitBreaker {
    /// A closed breaker.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the breaker is currently open (skip the call that would ask).
    /// Auto-closes (and resets the failure count) once [`REOPEN_AFTER`] has
    /// elapsed since it tripped.
    pub fn is_open(&self) -> bool {
        let mut opened_at = self.opened_at.lock().unwrap();
        match *opened_at {
            Some(when) if when.elapsed() >= REOPEN_AFTER => {
                *opened_at = None;
                self.consecutive_failures.store(0, Ordering::Release);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Record a successful metrics write, resetting the failure streak.
    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
    }

    /// Record a failed metrics write; trips the breaker once
    /// [`FAILURE_THRESHOLD`] consecutive failures accumulate.
    pub fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
        if failures >= FAILURE_THRESHOLD {
            let mut opened_at = self.opened_at.lock().unwrap();
            if opened_at.is_none() {
                *opened_at = Some(Instant::now());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_clears_flag_on_drop() {
        let flag = MetricsOperationFlag::new();
        assert!(!flag.is_set());
        {
            let _guard = flag.enter();
            assert!(flag.is_set());
        }
        assert!(!flag.is_set());
    }

    #[test]
    fn breaker_opens_after_threshold_failures() {
        let b = RetentionCircuitBreaker::new();
        for _ in 0..FAILURE_THRESHOLD {
            assert!(!b.is_open());
            b.record_failure();
        }
        assert!(b.is_open());
    }

    #[test]
    fn breaker_success_resets_failure_streak() {
        let b = RetentionCircuitBreaker::new();
        for _ in 0..FAILURE_THRESHOLD - 1 {
            b.record_failure();
        }
        b.record_success();
        b.record_failure();
        assert!(!b.is_open());
    }
}
