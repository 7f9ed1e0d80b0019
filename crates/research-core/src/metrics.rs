//! Atomic pipeline counters.
//!
//! Each orchestrator owns one [`Metrics`] instance. Counters are incremented
//! silently at the call site; call [`Metrics::flush`] to emit the current
//! values as a single `tracing::info!` event.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Lightweight atomic counters: no allocations, no locking.
#[derive(Debug, Default)]
pub struct Metrics {
    runs_completed: AtomicU64,
    runs_failed: AtomicU64,
    sub_query_failures: AtomicU64,
    memory_writes: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub runs_completed: u64,
    pub runs_failed: u64,
    pub sub_query_failures: u64,
    pub memory_writes: u64,
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            runs_completed: AtomicU64::new(0),
            runs_failed: AtomicU64::new(0),
            sub_query_failures: AtomicU64::new(0),
            memory_writes: AtomicU64::new(0),
        }
    }

    pub fn inc_runs_completed(&self) {
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "runs_completed", "counter incremented");
    }

    pub fn inc_runs_failed(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "runs_failed", "counter incremented");
    }

    pub fn add_sub_query_failures(&self, n: u64) {
        if n > 0 {
            self.sub_query_failures.fetch_add(n, Ordering::Relaxed);
            tracing::trace!(metric = "sub_query_failures", n, "counter incremented");
        }
    }

    pub fn inc_memory_writes(&self) {
        self.memory_writes.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "memory_writes", "counter incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
            sub_query_failures: self.sub_query_failures.load(Ordering::Relaxed),
            memory_writes: self.memory_writes.load(Ordering::Relaxed),
        }
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call at natural boundaries (end of a demo, after an evaluation)
    /// rather than on every increment.
    pub fn flush(&self) {
        let s = self.snapshot();
        tracing::info!(
            metric = "flush",
            runs_completed = s.runs_completed,
            runs_failed = s.runs_failed,
            sub_query_failures = s.sub_query_failures,
            memory_writes = s.memory_writes,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        m.inc_runs_completed();
        m.inc_runs_completed();
        m.inc_runs_failed();
        m.add_sub_query_failures(3);
        m.add_sub_query_failures(0);
        m.inc_memory_writes();

        let s = m.snapshot();
        assert_eq!(s.runs_completed, 2);
        assert_eq!(s.runs_failed, 1);
        assert_eq!(s.sub_query_failures, 3);
        assert_eq!(s.memory_writes, 1);
    }

    #[test]
    fn fresh_metrics_are_zero() {
        let s = Metrics::default().snapshot();
        assert_eq!(
            s,
            MetricsSnapshot {
                runs_completed: 0,
                runs_failed: 0,
                sub_query_failures: 0,
                memory_writes: 0,
            }
        );
    }
}
