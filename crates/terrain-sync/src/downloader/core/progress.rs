//! Shared progress aggregation for a sync run
//!
//! One `ProgressState` is created per asset set and handed to every worker
//! behind an `Arc`. All counters live under a single mutex so a reader always
//! sees a consistent tally.

use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use super::{DownloadTarget, FailureKind, ProgressSnapshot};

/// Terminal outcome of one work item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Fetched and committed to its final path
    Completed { bytes: u64 },
    /// Already present on disk before the run
    Skipped,
    /// Gave up after a permanent error or exhausted retries
    Failed(FailedTarget),
    /// Stop was requested while the item was being worked on
    Cancelled,
}

/// A target that could not be fetched, kept for the final summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedTarget {
    pub identifier: String,
    pub file_name: String,
    pub kind: FailureKind,
    pub attempts: u32,
    pub error: String,
}

impl FailedTarget {
    pub fn new(target: &DownloadTarget, kind: FailureKind, attempts: u32, error: impl Into<String>) -> Self {
        Self {
            identifier: target.remote_identifier.clone(),
            file_name: target.file_name(),
            kind,
            attempts,
            error: error.into(),
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    total: u64,
    completed: u64,
    failed: u64,
    skipped: u64,
    cancelled: u64,
    bytes_done: u64,
    failures: Vec<FailedTarget>,
}

/// Thread-safe counters plus the run start time
#[derive(Debug)]
pub struct ProgressState {
    tally: Mutex<Tally>,
    started_at: Instant,
}

impl ProgressState {
    pub fn new(total: usize) -> Self {
        Self {
            tally: Mutex::new(Tally {
                total: total as u64,
                ..Tally::default()
            }),
            started_at: Instant::now(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tally> {
        // counters stay meaningful even if a worker panicked mid-update
        self.tally.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the terminal outcome of one target
    pub fn report(&self, outcome: ItemOutcome) {
        let mut tally = self.lock();
        match outcome {
            ItemOutcome::Completed { .. } => tally.completed += 1,
            ItemOutcome::Skipped => tally.skipped += 1,
            ItemOutcome::Failed(failure) => {
                tally.failed += 1;
                tally.failures.push(failure);
            }
            ItemOutcome::Cancelled => tally.cancelled += 1,
        }
    }

    /// Streamed byte progress, called per received chunk
    pub fn add_bytes(&self, bytes: u64) {
        self.lock().bytes_done += bytes;
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Consistent point-in-time copy of every counter
    pub fn snapshot(&self) -> ProgressSnapshot {
        let tally = self.lock();
        ProgressSnapshot {
            total: tally.total,
            completed: tally.completed,
            failed: tally.failed,
            skipped: tally.skipped,
            cancelled: tally.cancelled,
            bytes_done: tally.bytes_done,
            elapsed: self.started_at.elapsed(),
        }
    }

    pub fn failures(&self) -> Vec<FailedTarget> {
        self.lock().failures.clone()
    }
}
