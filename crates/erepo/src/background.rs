//! Periodic background workers: named threads, a tick cadence, and
//! cooperative cancellation via an `AtomicBool` shutdown flag.
//!
//! A fixed tick interval per worker rather than an arbitrary priority task
//! queue, since this crate only ever runs the two named workers described
//! by the checkpoint/retention/aggregation cadences, never ad hoc submitted
//! work.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::error;

/// A running periodic worker. Dropping the handle does not stop the
/// worker — call [`PeriodicWorker::shutdown`] for a cooperative, joined stop.
pub struct PeriodicWorker {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicWorker {
    /// Spawn a thread named `name` that calls `tick` every `interval` until
    /// [`PeriodicWorker::shutdown`] is called. A panicking `tick` is caught
    /// and logged so one bad cycle doesn't kill the worker thread.
    pub fn spawn(
        name: impl Into<String>,
        interval: Duration,
        mut tick: impl FnMut() + Send + 'static,
    ) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = Arc::clone(&shutdown);
        let name = name.into();
        let thread_name = name.clone();
        let poll = Duration::from_millis(200).min(interval);
        let handle = std::thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                let mut since_last_tick = Duration::ZERO;
                while !shutdown_clone.load(Ordering::Acquire) {
                    std::thread::sleep(poll);
                    if shutdown_clone.load(Ordering::Acquire) {
                        break;
                    }
                    since_last_tick += poll;
                    if since_last_tick < interval {
                        continue;
                    }
                    since_last_tick = Duration::ZERO;
                    if std::panic::catch_unwind(std::panic::AssertUnwindSafe(&mut tick)).is_err() {
                        error!(worker = %name, "background worker tick panicked");
                    }
                }
            })
            .expect("failed to spawn background worker thread");
        Self { shutdown, handle: Some(handle) }
    }

    /// Signal the worker to stop and join its thread.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PeriodicWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn ticks_run_until_shutdown() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let mut worker = PeriodicWorker::spawn("test-worker", Duration::from_millis(10), move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        std::thread::sleep(Duration::from_millis(60));
        worker.shutdown();
        assert!(count.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn panicking_tick_does_not_kill_worker() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let mut worker = PeriodicWorker::spawn("panicky-worker", Duration::from_millis(10), move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
            panic!("boom");
        });
        std::thread::sleep(Duration::from_millis(60));
        worker.shutdown();
        assert!(count.load(Ordering::SeqCst) >= 1);
    }
}
