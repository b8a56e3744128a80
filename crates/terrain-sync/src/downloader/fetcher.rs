//! Single-attempt fetchers
//!
//! The worker pool only talks to the `Fetcher` trait, so alternative
//! transports (or scripted fetchers in tests) plug in without touching the
//! pool.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span};

use crate::downloader::config::SyncConfig;
use crate::downloader::core::{DownloadTarget, HttpClient, ProgressState, Result};

/// Performs exactly one download attempt for a target
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `target` to its local path, returning the bytes written
    ///
    /// Implementations must leave `target.local_path` untouched on failure.
    async fn fetch(
        &self,
        target: &DownloadTarget,
        progress: &ProgressState,
        stop: &CancellationToken,
    ) -> Result<u64>;
}

/// HTTP-based fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: HttpClient,
}

impl HttpFetcher {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        Ok(Self::new(HttpClient::from_config(config)?))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        target: &DownloadTarget,
        progress: &ProgressState,
        stop: &CancellationToken,
    ) -> Result<u64> {
        let url = target.remote_identifier.as_str();
        async move {
            debug!("Downloading {} to {}", url, target.local_path.display());
            self.client
                .download_to_file(url, &target.local_path, progress, stop)
                .await
        }
        .instrument(info_span!("http_download", file = %target.file_name()))
        .await
    }
}
