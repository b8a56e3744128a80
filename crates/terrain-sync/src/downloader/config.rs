//! Configuration types for the sync engine

use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::downloader::catalog::AssetSet;
use crate::downloader::core::{AssetKind, DownloadError, Result};

pub const TEXTURES_URL: &str = "https://warfaresims.slitherine.com/Tacview_Textures/";
pub const ELEVATION_URL: &str = "https://warfaresims.slitherine.com/Tacview_SRTM30/";

/// Longest gap a worker may be told to leave between two requests
pub const MAX_PER_WORKER_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Configuration supplied to the engine by the CLI (or any embedding app)
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Number of concurrent workers, at least one
    pub worker_count: usize,
    /// Minimum gap between two requests issued by the same worker
    pub per_worker_delay: Duration,
    /// Retries after the first attempt for transient failures
    pub max_retries: u32,
    /// Initial delay between retries (doubles each retry)
    pub retry_delay: Duration,
    /// Maximum retry delay cap
    pub max_retry_delay: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub textures_url: String,
    pub elevation_url: String,
    pub textures_dir: PathBuf,
    pub elevation_dir: PathBuf,
    /// Restrict the run to one asset family
    pub only: Option<AssetKind>,
    /// Render the single-line progress display on stdout
    pub show_progress: bool,
    pub refresh_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            per_worker_delay: Duration::from_millis(500),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            max_retry_delay: Duration::from_secs(60),
            request_timeout: Duration::from_secs(60),
            user_agent: concat!("terrain-sync/", env!("CARGO_PKG_VERSION")).to_string(),
            textures_url: TEXTURES_URL.to_string(),
            elevation_url: ELEVATION_URL.to_string(),
            textures_dir: PathBuf::from("textures"),
            elevation_dir: PathBuf::from("elevation"),
            only: None,
            show_progress: true,
            refresh_interval: Duration::from_millis(500),
        }
    }
}

impl SyncConfig {
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(DownloadError::configuration(
                "worker count must be at least 1",
                Some("worker_count"),
            ));
        }
        if self.per_worker_delay > MAX_PER_WORKER_DELAY {
            return Err(DownloadError::configuration(
                format!("per-worker delay must not exceed {}s", MAX_PER_WORKER_DELAY.as_secs()),
                Some("per_worker_delay"),
            ));
        }
        if self.retry_delay > self.max_retry_delay {
            return Err(DownloadError::configuration(
                "retry delay exceeds the maximum retry delay",
                Some("retry_delay"),
            ));
        }
        Ok(())
    }

    /// Asset sets in processing order: textures first, then elevation
    pub fn asset_sets(&self) -> Result<Vec<AssetSet>> {
        let mut sets = Vec::with_capacity(2);
        for kind in [AssetKind::Texture, AssetKind::Elevation] {
            if self.only.is_some_and(|only| only != kind) {
                continue;
            }
            let (url, dir) = match kind {
                AssetKind::Texture => (&self.textures_url, &self.textures_dir),
                AssetKind::Elevation => (&self.elevation_url, &self.elevation_dir),
            };
            sets.push(AssetSet::new(kind, parse_base_url(url)?, dir.clone()));
        }
        Ok(sets)
    }
}

/// Parse a listing URL, making sure it ends in `/` so file names join under it
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized).map_err(|source| DownloadError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

/// Fluent builder over `SyncConfig`
///
/// Out-of-range numeric input is clamped the way the command line has always
/// treated it: fewer than one worker becomes one.
#[derive(Debug, Clone, Default)]
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.worker_count = workers.max(1);
        self
    }

    /// Negative or non-finite values are treated as zero
    pub fn delay_secs(mut self, secs: f64) -> Self {
        self.config.per_worker_delay = secs_to_duration(secs);
        self
    }

    pub fn per_worker_delay(mut self, delay: Duration) -> Self {
        self.config.per_worker_delay = delay;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn retry_delay(mut self, base: Duration, cap: Duration) -> Self {
        self.config.retry_delay = base;
        self.config.max_retry_delay = cap;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn textures<S: Into<String>, P: Into<PathBuf>>(mut self, url: S, dir: P) -> Self {
        self.config.textures_url = url.into();
        self.config.textures_dir = dir.into();
        self
    }

    pub fn elevation<S: Into<String>, P: Into<PathBuf>>(mut self, url: S, dir: P) -> Self {
        self.config.elevation_url = url.into();
        self.config.elevation_dir = dir.into();
        self
    }

    pub fn textures_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.textures_dir = dir.into();
        self
    }

    pub fn elevation_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.elevation_dir = dir.into();
        self
    }

    pub fn only(mut self, kind: Option<AssetKind>) -> Self {
        self.config.only = kind;
        self
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.config.show_progress = show;
        self
    }

    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.config.refresh_interval = interval;
        self
    }

    pub fn build(self) -> Result<SyncConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// values too large for a Duration saturate and are rejected by validate()
fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_published_tool() {
        let config = SyncConfig::default();
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.per_worker_delay, Duration::from_millis(500));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.textures_dir, PathBuf::from("textures"));
        assert_eq!(config.elevation_dir, PathBuf::from("elevation"));
    }

    #[test]
    fn builder_clamps_out_of_range_values() {
        let config = SyncConfig::builder()
            .workers(0)
            .delay_secs(-2.5)
            .build()
            .unwrap();
        assert_eq!(config.worker_count, 1);
        assert_eq!(config.per_worker_delay, Duration::ZERO);
    }

    #[test]
    fn huge_delays_are_rejected_instead_of_panicking() {
        match SyncConfig::builder().delay_secs(1e20).build() {
            Err(DownloadError::Configuration { field, .. }) => {
                assert_eq!(field.as_deref(), Some("per_worker_delay"));
            }
            other => panic!("Expected Configuration error, got {other:?}"),
        }

        let config = SyncConfig::builder()
            .delay_secs(f64::INFINITY)
            .build()
            .unwrap();
        assert_eq!(config.per_worker_delay, Duration::ZERO);

        let config = SyncConfig::builder()
            .delay_secs(MAX_PER_WORKER_DELAY.as_secs_f64())
            .build()
            .unwrap();
        assert_eq!(config.per_worker_delay, MAX_PER_WORKER_DELAY);
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let config = SyncConfig {
            worker_count: 0,
            ..SyncConfig::default()
        };
        match config.validate() {
            Err(DownloadError::Configuration { field, .. }) => {
                assert_eq!(field.as_deref(), Some("worker_count"));
            }
            other => panic!("Expected Configuration error, got {other:?}"),
        }
    }

    #[test]
    fn asset_sets_are_ordered_and_filterable() {
        let config = SyncConfig::default();
        let sets = config.asset_sets().unwrap();
        let kinds: Vec<_> = sets.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![AssetKind::Texture, AssetKind::Elevation]);

        let only = SyncConfig::builder()
            .only(Some(AssetKind::Elevation))
            .build()
            .unwrap();
        let sets = only.asset_sets().unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].kind, AssetKind::Elevation);
    }

    #[test]
    fn base_urls_gain_a_trailing_slash() {
        let url = parse_base_url("http://localhost:8080/Tacview_SRTM30").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/Tacview_SRTM30/");
        assert!(parse_base_url("not a url").is_err());
    }
}
