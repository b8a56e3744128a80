//! Downloader module
//!
//! This module contains the sync engine: core types, configuration, the
//! catalog and resume filter, pacing, retry, the worker pool and cancellation.

pub mod cancel;
pub mod catalog;
pub mod config;
pub mod core;
pub mod fetcher;
pub mod pacing;
pub mod pool;
pub mod resume;
pub mod retry;
pub mod summary;
pub mod sync;

// Re-export main types for convenience
pub use cancel::{StopController, StopRequested};
pub use catalog::{AssetSet, TargetCatalog};
pub use config::{SyncConfig, SyncConfigBuilder};
pub use core::{
    AssetKind, DownloadError, DownloadTarget, FailedTarget, FailureKind, FileOperation,
    HttpClient, ItemOutcome, ProgressSnapshot, ProgressState, Result, WorkItem,
};
pub use fetcher::{Fetcher, HttpFetcher};
pub use pacing::Pacer;
pub use pool::{PoolOutcome, WorkerPool};
pub use retry::{RetryDecision, RetryPolicy};
pub use summary::{SetSummary, SyncSummary};
pub use sync::TerrainSync;
