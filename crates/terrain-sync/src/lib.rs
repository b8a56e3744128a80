//! Terrain Sync Library
//!
//! Bulk downloader for the Tacview terrain asset sets (texture tiles and
//! elevation files) published as HTTP directory listings. Downloads are
//! resumable, rate limited per worker, retried on transient failures and can
//! be interrupted at any point without leaving partial files behind.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use terrain_sync::{SyncConfig, TerrainSync};
//!
//! # async fn example() -> terrain_sync::Result<()> {
//! let config = SyncConfig::builder()
//!     .workers(4)
//!     .delay_secs(0.5)
//!     .max_retries(3)
//!     .textures_dir("textures")
//!     .elevation_dir("elevation")
//!     .build()?;
//!
//! let engine = TerrainSync::new(config)?;
//!
//! // Ctrl+C finishes in-flight downloads and stops
//! engine.stop_controller().listen_for_interrupt();
//!
//! let summary = engine.run().await?;
//! println!(
//!     "{} downloaded, {} skipped, {} failed",
//!     summary.completed(),
//!     summary.skipped(),
//!     summary.failed()
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Resume**: files already present and non-empty are never fetched again
//! - **Atomic writes**: bodies stream into `<name>.part` and are renamed on success
//! - **Pacing**: each worker keeps a minimum gap between its own requests
//! - **Retry**: transient failures back off exponentially; permanent ones fail fast
//! - **Progress**: live single-line display with throughput and ETA
//! - **Cancellation**: cooperative stop observed at every wait and between chunks

pub mod downloader;
pub mod integrations;

// Re-export commonly used types for convenience
pub use downloader::{
    AssetKind, AssetSet, DownloadError, DownloadTarget, FailedTarget, FailureKind, Fetcher,
    HttpFetcher, ProgressSnapshot, ProgressState, Result, RetryPolicy, SetSummary,
    StopController, SyncConfig, SyncSummary, TargetCatalog, TerrainSync,
};
