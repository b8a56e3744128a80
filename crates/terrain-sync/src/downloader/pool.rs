//! Worker pool
//!
//! A fixed number of tokio tasks pull work items from one shared queue. Each
//! worker paces its own requests, retries transient failures per the retry
//! policy and reports exactly one terminal outcome per item it claims.
//!
//! Per worker:
//!
//! ```text
//! Idle -> claim item -> pacing wait -> fetch
//!   ok          -> report Completed, next item
//!   transient   -> policy says retry -> backoff wait -> pacing wait -> fetch
//!               -> policy says stop  -> report Failed, next item
//!   permanent   -> report Failed, next item
//! queue empty   -> Drained
//! stop observed -> Cancelled, or Drained when nothing is left to claim
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info_span, warn};

use crate::downloader::cancel::sleep_or_stop;
use crate::downloader::config::SyncConfig;
use crate::downloader::core::{FailedTarget, FailureKind, ItemOutcome, ProgressState, WorkItem};
use crate::downloader::fetcher::Fetcher;
use crate::downloader::pacing::Pacer;
use crate::downloader::retry::RetryPolicy;

/// Multi-consumer queue; every item is handed to exactly one caller
#[derive(Debug, Default)]
pub struct WorkQueue {
    items: Mutex<VecDeque<WorkItem>>,
}

impl WorkQueue {
    pub fn new(items: Vec<WorkItem>) -> Self {
        Self {
            items: Mutex::new(items.into()),
        }
    }

    pub fn claim(&self) -> Option<WorkItem> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Why a worker stopped looping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    Drained,
    Cancelled,
}

/// What the pool did with its work list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolOutcome {
    pub drained_workers: usize,
    pub cancelled_workers: usize,
    /// Items never claimed because a stop was requested
    pub unclaimed: usize,
}

impl PoolOutcome {
    pub fn was_cancelled(&self) -> bool {
        self.cancelled_workers > 0 || self.unclaimed > 0
    }
}

struct PoolShared {
    fetcher: Arc<dyn Fetcher>,
    policy: RetryPolicy,
    worker_count: usize,
    per_worker_delay: Duration,
    progress: Arc<ProgressState>,
    stop: CancellationToken,
}

pub struct WorkerPool {
    shared: Arc<PoolShared>,
}

impl WorkerPool {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        config: &SyncConfig,
        progress: Arc<ProgressState>,
        stop: CancellationToken,
    ) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                fetcher,
                policy: RetryPolicy::from_config(config),
                worker_count: config.worker_count.max(1),
                per_worker_delay: config.per_worker_delay,
                progress,
                stop,
            }),
        }
    }

    /// Process the work list to completion or until a stop is requested
    pub async fn run(&self, items: Vec<WorkItem>) -> PoolOutcome {
        let queue = Arc::new(WorkQueue::new(items));
        let workers = self.shared.worker_count.min(queue.len());
        debug!("Starting {} workers for {} items", workers, queue.len());

        let mut tasks = JoinSet::new();
        for id in 0..workers {
            let shared = self.shared.clone();
            let queue = queue.clone();
            tasks.spawn(async move { shared.run_worker(&queue).await }.instrument(info_span!("worker", id)));
        }

        let mut outcome = PoolOutcome::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(WorkerExit::Drained) => outcome.drained_workers += 1,
                Ok(WorkerExit::Cancelled) => outcome.cancelled_workers += 1,
                Err(e) => error!("Worker task failed: {}", e),
            }
        }

        outcome.unclaimed = queue.len();
        outcome
    }
}

impl PoolShared {
    async fn run_worker(&self, queue: &WorkQueue) -> WorkerExit {
        let mut pacer = Pacer::new(self.per_worker_delay);

        loop {
            if self.stop.is_cancelled() {
                return if queue.is_empty() {
                    WorkerExit::Drained
                } else {
                    WorkerExit::Cancelled
                };
            }
            let Some(mut item) = queue.claim() else {
                return WorkerExit::Drained;
            };

            let outcome = self.process_item(&mut pacer, &mut item).await;
            let cancelled = outcome == ItemOutcome::Cancelled;
            self.progress.report(outcome);

            if cancelled {
                return WorkerExit::Cancelled;
            }
        }
    }

    async fn process_item(&self, pacer: &mut Pacer, item: &mut WorkItem) -> ItemOutcome {
        let file_name = item.target.file_name();

        loop {
            if pacer.wait_turn(&self.stop).await.is_err() {
                return ItemOutcome::Cancelled;
            }

            item.attempts_made += 1;
            let error = match self.fetcher.fetch(&item.target, &self.progress, &self.stop).await {
                Ok(bytes) => {
                    debug!("{}: downloaded {} bytes", file_name, bytes);
                    return ItemOutcome::Completed { bytes };
                }
                Err(error) => error,
            };

            let kind = error.failure_kind();
            item.last_error = Some(kind);
            if kind == FailureKind::Cancelled {
                debug!("{}: cancelled mid-transfer", file_name);
                return ItemOutcome::Cancelled;
            }

            let decision = self.policy.decide(item.attempts_made, kind);
            if !decision.should_retry {
                warn!(
                    category = error.category(),
                    "{}: giving up after {} attempt(s): {}",
                    file_name,
                    item.attempts_made,
                    error
                );
                return ItemOutcome::Failed(FailedTarget::new(
                    &item.target,
                    kind,
                    item.attempts_made,
                    error.describe(),
                ));
            }

            warn!(
                "{}: attempt {} failed ({}), retrying in {:?}",
                file_name, item.attempts_made, error, decision.delay_before_next_attempt
            );
            if sleep_or_stop(&self.stop, decision.delay_before_next_attempt).await.is_err() {
                return ItemOutcome::Cancelled;
            }
        }
    }
}
