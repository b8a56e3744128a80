//! Per-set and whole-run summaries
//!
//! Built from the final progress snapshot once a set's pool has finished.
//! Both types serialize to JSON for the `--report` file.

use serde::Serialize;
use std::time::Duration;

use crate::downloader::core::{FailedTarget, ProgressState};

/// Exit status when every target ended up on disk
pub const EXIT_OK: u8 = 0;
/// Exit status when at least one target failed
pub const EXIT_FAILURES: u8 = 1;
/// Exit status for an interrupted run without failures (128 + SIGINT)
pub const EXIT_CANCELLED: u8 = 130;

/// Outcome counts for one asset set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetSummary {
    pub label: String,
    pub total: u64,
    pub completed: u64,
    pub skipped: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub bytes_done: u64,
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    pub failures: Vec<FailedTarget>,
    /// Whether a stop request cut this set short
    pub interrupted: bool,
}

impl SetSummary {
    /// Summary of a set that had nothing to do
    pub fn empty(label: &str) -> Self {
        Self {
            label: label.to_string(),
            total: 0,
            completed: 0,
            skipped: 0,
            failed: 0,
            cancelled: 0,
            bytes_done: 0,
            elapsed: Duration::ZERO,
            failures: Vec::new(),
            interrupted: false,
        }
    }

    pub fn from_progress(label: &str, progress: &ProgressState, interrupted: bool) -> Self {
        let snapshot = progress.snapshot();
        Self {
            label: label.to_string(),
            total: snapshot.total,
            completed: snapshot.completed,
            skipped: snapshot.skipped,
            failed: snapshot.failed,
            cancelled: snapshot.cancelled,
            bytes_done: snapshot.bytes_done,
            elapsed: snapshot.elapsed,
            failures: progress.failures(),
            interrupted,
        }
    }

    /// Targets that never reached a terminal outcome
    pub fn unprocessed(&self) -> u64 {
        self.total
            .saturating_sub(self.completed + self.skipped + self.failed + self.cancelled)
    }
}

/// Everything a run did, in processing order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncSummary {
    pub sets: Vec<SetSummary>,
    /// Set labels that were never started because of a stop request
    pub skipped_sets: Vec<String>,
    pub cancelled: bool,
}

impl SyncSummary {
    pub fn total(&self) -> u64 {
        self.sets.iter().map(|set| set.total).sum()
    }

    pub fn completed(&self) -> u64 {
        self.sets.iter().map(|set| set.completed).sum()
    }

    pub fn skipped(&self) -> u64 {
        self.sets.iter().map(|set| set.skipped).sum()
    }

    pub fn failed(&self) -> u64 {
        self.sets.iter().map(|set| set.failed).sum()
    }

    pub fn bytes_done(&self) -> u64 {
        self.sets.iter().map(|set| set.bytes_done).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FailedTarget> {
        self.sets.iter().flat_map(|set| set.failures.iter())
    }

    pub fn exit_code(&self) -> u8 {
        if self.failed() > 0 {
            EXIT_FAILURES
        } else if self.cancelled {
            EXIT_CANCELLED
        } else {
            EXIT_OK
        }
    }
}

fn serialize_secs<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}
