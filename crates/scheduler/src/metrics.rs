//! Scheduler counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

/// Counters collected by the dispatcher and worker sessions.
#[derive(Debug)]
pub struct SchedulerMetrics {
    submitted: AtomicU64,
    dispatched: AtomicU64,
    requeued: AtomicU64,
    dispatch_failures: AtomicU64,
    results_received: AtomicU64,
    ignored_frames: AtomicU64,
    workers_connected: AtomicU64,
    workers_disconnected: AtomicU64,
    start: Instant,
}

/// Point-in-time copy of [`SchedulerMetrics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub submitted: u64,
    pub dispatched: u64,
    pub requeued: u64,
    /// Tasks dropped because the write to the chosen worker failed.
    pub dispatch_failures: u64,
    pub results_received: u64,
    /// Frames with a command other than `RESULT` received from workers.
    pub ignored_frames: u64,
    pub workers_connected: u64,
    pub workers_disconnected: u64,
    pub uptime_secs: f64,
}

impl SchedulerMetrics {
    pub fn new() -> Self {
        Self {
            submitted: AtomicU64::new(0),
            dispatched: AtomicU64::new(0),
            requeued: AtomicU64::new(0),
            dispatch_failures: AtomicU64::new(0),
            results_received: AtomicU64::new(0),
            ignored_frames: AtomicU64::new(0),
            workers_connected: AtomicU64::new(0),
            workers_disconnected: AtomicU64::new(0),
            start: Instant::now(),
        }
    }

    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_requeued(&self) {
        self.requeued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatch_failure(&self) {
        self.dispatch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_result(&self) {
        self.results_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ignored_frame(&self) {
        self.ignored_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_worker_connected(&self) {
        self.workers_connected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_worker_disconnected(&self) {
        self.workers_disconnected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
            dispatch_failures: self.dispatch_failures.load(Ordering::Relaxed),
            results_received: self.results_received.load(Ordering::Relaxed),
            ignored_frames: self.ignored_frames.load(Ordering::Relaxed),
            workers_connected: self.workers_connected.load(Ordering::Relaxed),
            workers_disconnected: self.workers_disconnected.load(Ordering::Relaxed),
            uptime_secs: self.start.elapsed().as_secs_f64(),
        }
    }
}

impl Default for SchedulerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
