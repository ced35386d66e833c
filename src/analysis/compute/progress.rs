//! Progress reporting and cooperative cancellation shared by one evaluation.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::analysis::error::{AnalysisError, AnalysisResult};

/// Receives progress reports from every node of an evaluation.
pub trait ProgressSink: Send + Sync {
    fn report(&self, kind: &'static str, done: u64, total: u64);
}

/// Emits progress as trace events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, kind: &'static str, done: u64, total: u64) {
        trace!(kind, done, total, "progress");
    }
}

/// Discards progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn report(&self, _kind: &'static str, _done: u64, _total: u64) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressReport {
    pub kind: &'static str,
    pub done: u64,
    pub total: u64,
}

impl ProgressReport {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.done as f64 / self.total as f64
        }
    }
}

/// Keeps every report, for inspection after the evaluation.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    reports: Mutex<Vec<ProgressReport>>,
}

impl RecordingProgress {
    pub fn reports(&self) -> Vec<ProgressReport> {
        self.reports.lock().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn report(&self, kind: &'static str, done: u64, total: u64) {
        self.reports.lock().push(ProgressReport { kind, done, total });
    }
}

/// Progress handle of a single node, forwarding to the shared sink.
pub struct Progress {
    kind: &'static str,
    sink: Arc<dyn ProgressSink>,
    done: AtomicU64,
    total: AtomicU64,
}

impl Progress {
    pub fn new(kind: &'static str, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            kind,
            sink,
            done: AtomicU64::new(0),
            total: AtomicU64::new(0),
        }
    }

    pub fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
        self.done.store(0, Ordering::Relaxed);
        self.sink.report(self.kind, 0, total);
    }

    pub fn step(&self) {
        self.step_by(1);
    }

    pub fn step_by(&self, steps: u64) {
        let done = self.done.fetch_add(steps, Ordering::Relaxed) + steps;
        self.sink
            .report(self.kind, done, self.total.load(Ordering::Relaxed));
    }

    /// Mark the node complete regardless of the steps reported so far.
    pub fn finish(&self) {
        let total = self.total.load(Ordering::Relaxed);
        self.done.store(total, Ordering::Relaxed);
        self.sink.report(self.kind, total, total);
    }

    pub fn fraction(&self) -> f64 {
        ProgressReport {
            kind: self.kind,
            done: self.done.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed),
        }
        .fraction()
    }
}

/// Shared cancellation flag, checked between expensive steps.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// `Err(Cancelled)` once [`CancelToken::cancel`] was called.
    pub fn check(&self) -> AnalysisResult<()> {
        if self.is_cancelled() {
            Err(AnalysisError::Cancelled)
        } else {
            Ok(())
        }
    }
}
