//! HTTP utilities
//!
//! HTTP client configuration plus the streaming download that writes to a
//! `.part` file and promotes it atomically. The final path is either absent
//! or complete; every failure path removes the partial file.

use futures::StreamExt;
use reqwest::Client;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::downloader::config::SyncConfig;
use crate::downloader::core::files::{atomic_rename, remove_partial, temp_path};
use crate::downloader::core::{DownloadError, FileOperation, ProgressState, Result};

/// HTTP client with integrated download functionality
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout_secs: u64,
}

impl HttpClient {
    /// Create a new HTTP client from sync configuration
    ///
    /// `request_timeout` bounds connecting and each idle gap while reading,
    /// never the whole transfer, so a slow but steady body is not cut off.
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.request_timeout)
            .read_timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| DownloadError::configuration(format!("failed to create HTTP client: {e}"), None))?;

        Ok(Self {
            client,
            timeout_secs: config.request_timeout.as_secs(),
        })
    }

    fn request_error(&self, url: &str, error: reqwest::Error) -> DownloadError {
        match DownloadError::http(url, error) {
            DownloadError::NetworkTimeout { url, .. } => DownloadError::NetworkTimeout {
                url,
                duration_secs: self.timeout_secs,
            },
            other => other,
        }
    }

    /// GET a page as text (used for directory listings)
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        debug!("Fetching index: {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        response.text().await.map_err(|e| self.request_error(url, e))
    }

    /// Stream `url` into `dest_path`, reporting bytes as they arrive
    ///
    /// Returns the number of bytes committed.
    pub async fn download_to_file(
        &self,
        url: &str,
        dest_path: &Path,
        progress: &ProgressState,
        stop: &CancellationToken,
    ) -> Result<u64> {
        let temp_path = temp_path(dest_path);

        match self.stream_to_temp(url, &temp_path, progress, stop).await {
            Ok(size) => match atomic_rename(&temp_path, dest_path).await {
                Ok(()) => {
                    debug!("Stream download completed: {} bytes", size);
                    Ok(size)
                }
                Err(e) => {
                    remove_partial(&temp_path).await;
                    Err(e)
                }
            },
            Err(e) => {
                remove_partial(&temp_path).await;
                Err(e)
            }
        }
    }

    async fn stream_to_temp(
        &self,
        url: &str,
        temp_path: &Path,
        progress: &ProgressState,
        stop: &CancellationToken,
    ) -> Result<u64> {
        debug!("Stream downloading: {} to {}", url, temp_path.display());
        if stop.is_cancelled() {
            return Err(DownloadError::Cancelled { url: Some(url.to_string()) });
        }

        let response = tokio::select! {
            response = self.client.get(url).send() => response.map_err(|e| self.request_error(url, e))?,
            () = stop.cancelled() => return Err(DownloadError::Cancelled { url: Some(url.to_string()) }),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        let expected = response.content_length();
        debug!("Content length: {:?} bytes", expected);

        let mut file = fs::File::create(temp_path)
            .await
            .map_err(|e| DownloadError::file_system(temp_path, FileOperation::Create, e))?;

        let mut stream = response.bytes_stream();
        let mut received: u64 = 0;

        loop {
            let next = tokio::select! {
                next = stream.next() => next,
                () = stop.cancelled() => {
                    return Err(DownloadError::Cancelled { url: Some(url.to_string()) });
                }
            };

            let Some(chunk) = next else { break };
            let chunk = chunk.map_err(|e| self.request_error(url, e))?;

            file.write_all(&chunk)
                .await
                .map_err(|e| DownloadError::file_system(temp_path, FileOperation::Write, e))?;

            received += chunk.len() as u64;
            progress.add_bytes(chunk.len() as u64);
        }

        if let Some(expected) = expected {
            if received != expected {
                return Err(DownloadError::TruncatedBody {
                    url: url.to_string(),
                    expected,
                    received,
                });
            }
        }

        file.flush()
            .await
            .map_err(|e| DownloadError::file_system(temp_path, FileOperation::Write, e))?;
        file.sync_all()
            .await
            .map_err(|e| DownloadError::file_system(temp_path, FileOperation::Write, e))?;

        Ok(received)
    }
}
