use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Engine lifecycle. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineLifecycle {
    /// Accepting enqueues, flush task running.
    Open,
    /// Shutdown requested; the flush task is performing its final flush.
    Draining,
    /// Flush task has exited. Enqueues fail immediately.
    Closed,
}

#[derive(Debug, Default)]
pub(crate) struct EngineCounters {
    pub requests_enqueued: AtomicU64,
    pub requests_rejected: AtomicU64,
    pub batches_flushed: AtomicU64,
    pub requests_completed: AtomicU64,
    pub requests_failed: AtomicU64,
    pub heterogeneous_batches: AtomicU64,
    pub backpressure_waits: AtomicU64,
    last_flush_at: Mutex<Option<DateTime<Utc>>>,
}

impl EngineCounters {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn mark_flush(&self) {
        if let Ok(mut last) = self.last_flush_at.lock() {
            *last = Some(Utc::now());
        }
    }

    pub fn snapshot(&self, queue_depth: usize, lifecycle: EngineLifecycle) -> EngineStats {
        EngineStats {
            requests_enqueued: self.requests_enqueued.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
            batches_flushed: self.batches_flushed.load(Ordering::Relaxed),
            requests_completed: self.requests_completed.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            heterogeneous_batches: self.heterogeneous_batches.load(Ordering::Relaxed),
            backpressure_waits: self.backpressure_waits.load(Ordering::Relaxed),
            queue_depth,
            lifecycle,
            last_flush_at: self.last_flush_at.lock().ok().and_then(|last| *last),
        }
    }
}

/// Point-in-time view of an engine's counters.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub requests_enqueued: u64,
    /// Enqueues refused because the engine was closed or parameters diverged.
    pub requests_rejected: u64,
    /// Executor calls made, including failed ones.
    pub batches_flushed: u64,
    pub requests_completed: u64,
    pub requests_failed: u64,
    pub heterogeneous_batches: u64,
    pub backpressure_waits: u64,
    pub queue_depth: usize,
    pub lifecycle: EngineLifecycle,
    pub last_flush_at: Option<DateTime<Utc>>,
}
