//! Derived statistics over a progress snapshot
//!
//! Rates and the ETA shown by the progress display are computed here from an
//! immutable copy of the counters, so the display never holds the lock.

use serde::Serialize;
use std::time::Duration;

/// Immutable snapshot of progress counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ProgressSnapshot {
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub cancelled: u64,
    pub bytes_done: u64,
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    /// Targets with a terminal outcome
    pub fn processed(&self) -> u64 {
        self.completed + self.failed + self.skipped + self.cancelled
    }

    /// Targets that are done for good: downloaded, already present or failed
    ///
    /// Cancelled targets are not settled; the next run picks them up.
    pub fn settled(&self) -> u64 {
        self.completed + self.skipped + self.failed
    }

    /// Targets still waiting for a terminal outcome
    pub fn remaining(&self) -> u64 {
        self.total.saturating_sub(self.settled())
    }

    /// Fraction of targets settled, 0.0 to 1.0
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.settled().min(self.total)) as f64 / self.total as f64
        }
    }

    /// Average bytes per second since the run started
    pub fn throughput_bps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.bytes_done as f64 / secs
        } else {
            0.0
        }
    }

    /// Wall-clock time per downloaded item so far
    pub fn average_time_per_item(&self) -> Option<Duration> {
        if self.completed == 0 {
            None
        } else {
            Some(self.elapsed.div_f64(self.completed as f64))
        }
    }

    /// Remaining items times the average per-item time
    pub fn eta(&self) -> Option<Duration> {
        self.average_time_per_item()
            .map(|avg| avg.mul_f64(self.remaining() as f64))
    }
}

fn serialize_secs<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}
