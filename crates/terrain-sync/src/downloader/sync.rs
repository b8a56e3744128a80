//! Sync engine
//!
//! Drives the asset sets in order (textures, then elevation). For each set
//! the listing is enumerated, present files are filtered out and the rest is
//! handed to the worker pool while the progress display runs alongside.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{Instrument, info, info_span};

use crate::downloader::cancel::StopController;
use crate::downloader::catalog::{AssetSet, TargetCatalog, fetch_catalog};
use crate::downloader::config::SyncConfig;
use crate::downloader::core::files::ensure_dir;
use crate::downloader::core::{DownloadError, HttpClient, ProgressState, Result};
use crate::downloader::fetcher::{Fetcher, HttpFetcher};
use crate::downloader::pool::WorkerPool;
use crate::downloader::resume;
use crate::downloader::summary::{SetSummary, SyncSummary};
use crate::integrations::progress::ProgressDisplay;

/// Terrain asset sync engine
pub struct TerrainSync {
    config: SyncConfig,
    client: HttpClient,
    fetcher: Arc<dyn Fetcher>,
    stop: StopController,
}

impl TerrainSync {
    /// Engine that lists and downloads over HTTP
    pub fn new(config: SyncConfig) -> Result<Self> {
        config.validate()?;
        let client = HttpClient::from_config(&config)?;
        let fetcher = Arc::new(HttpFetcher::new(client.clone()));
        Ok(Self {
            config,
            client,
            fetcher,
            stop: StopController::new(),
        })
    }

    /// Engine with a custom fetcher; listings are still read over HTTP
    pub fn with_fetcher(config: SyncConfig, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        config.validate()?;
        let client = HttpClient::from_config(&config)?;
        Ok(Self {
            config,
            client,
            fetcher,
            stop: StopController::new(),
        })
    }

    /// Share a stop controller created elsewhere (e.g. by the CLI)
    pub fn with_stop_controller(mut self, stop: StopController) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_controller(&self) -> StopController {
        self.stop.clone()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Sync every configured asset set
    ///
    /// Destination directories are created up front; failing to create one
    /// aborts the run before any request is made.
    pub async fn run(&self) -> Result<SyncSummary> {
        let sets = self.config.asset_sets()?;
        for set in &sets {
            ensure_dir(&set.destination).await.map_err(|e| {
                DownloadError::configuration(
                    format!("cannot prepare {} directory: {}", set.label(), e.describe()),
                    Some(set.label()),
                )
            })?;
        }

        let mut summary = SyncSummary::default();
        for set in &sets {
            if self.stop.is_stop_requested() {
                info!("Stop requested, skipping {} download", set.label());
                summary.skipped_sets.push(set.label().to_string());
                continue;
            }
            summary.sets.push(self.run_set(set).await?);
        }

        // a stop that lands after the last item was settled interrupts nothing
        summary.cancelled = summary.sets.iter().any(|set| set.interrupted) || !summary.skipped_sets.is_empty();
        Ok(summary)
    }

    /// Enumerate one set from its listing and sync it
    pub async fn run_set(&self, set: &AssetSet) -> Result<SetSummary> {
        let catalog = fetch_catalog(&self.client, set)
            .instrument(info_span!("listing", set = set.label()))
            .await?;

        if catalog.is_empty() {
            info!("[{}] no matching files in listing, skipping", set.label());
            return Ok(SetSummary::empty(set.label()));
        }

        info!(
            "[{}] found {} files, downloading into {}",
            set.label(),
            catalog.len(),
            set.destination.display()
        );
        info!(
            "[{}] workers: {}, delay per request: {:?}, retries: {}",
            set.label(),
            self.config.worker_count,
            self.config.per_worker_delay,
            self.config.max_retries
        );

        self.sync_catalog(set.label(), &catalog).await
    }

    /// Resume-filter `catalog` and download whatever is missing
    pub async fn sync_catalog(&self, label: &'static str, catalog: &TargetCatalog) -> Result<SetSummary> {
        let dirs: BTreeSet<_> = catalog.enumerate().iter().filter_map(|t| t.destination_dir()).collect();
        for dir in dirs {
            ensure_dir(dir).await?;
        }

        let progress = Arc::new(ProgressState::new(catalog.len()));
        let work = resume::filter(catalog, &progress).await;
        info!(
            "[{}] {} already present, {} to fetch",
            label,
            progress.snapshot().skipped,
            work.len()
        );

        let display = self
            .config
            .show_progress
            .then(|| ProgressDisplay::spawn(label, progress.clone(), self.config.refresh_interval));

        let pool = WorkerPool::new(
            self.fetcher.clone(),
            &self.config,
            progress.clone(),
            self.stop.token().clone(),
        );
        let outcome = pool.run(work).await;

        if let Some(display) = display {
            display.finish().await;
        }

        let summary = SetSummary::from_progress(label, &progress, outcome.was_cancelled());
        if summary.interrupted {
            info!(
                "[{}] interrupted: {} processed, {} left for the next run",
                label,
                summary.completed + summary.skipped + summary.failed,
                summary.cancelled + summary.unprocessed()
            );
        }
        info!(
            "[{}] done: {} downloaded, {} skipped, {} failed in {:.1}s",
            label,
            summary.completed,
            summary.skipped,
            summary.failed,
            summary.elapsed.as_secs_f64()
        );
        Ok(summary)
    }
}
