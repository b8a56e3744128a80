//! Core types used throughout the sync engine
//!
//! This module contains the fundamental types that all other modules depend on.

pub mod error;
pub mod files;
pub mod http;
pub mod metrics;
pub mod progress;

pub use error::{DownloadError, FailureKind, FileOperation, Result};
pub use http::HttpClient;
pub use metrics::ProgressSnapshot;
pub use progress::{FailedTarget, ItemOutcome, ProgressState};

use serde::Serialize;
use std::path::{Path, PathBuf};

/// The two asset families published by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Texture,
    Elevation,
}

impl AssetKind {
    /// File extension (with dot) the listing is filtered on
    pub fn extension(&self) -> &'static str {
        match self {
            AssetKind::Texture => ".webp",
            AssetKind::Elevation => ".srtm",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AssetKind::Texture => "textures",
            AssetKind::Elevation => "elevation",
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One remote asset and where it lands on disk
///
/// Immutable once built; the catalog guarantees `local_path` is unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub remote_identifier: String,
    pub local_path: PathBuf,
    pub kind: AssetKind,
}

impl DownloadTarget {
    pub fn new<S: Into<String>, P: Into<PathBuf>>(remote_identifier: S, local_path: P, kind: AssetKind) -> Self {
        Self {
            remote_identifier: remote_identifier.into(),
            local_path: local_path.into(),
            kind,
        }
    }

    /// File name used in log lines and summaries
    pub fn file_name(&self) -> String {
        self.local_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.remote_identifier.clone())
    }

    pub fn destination_dir(&self) -> Option<&Path> {
        self.local_path.parent().filter(|p| !p.as_os_str().is_empty())
    }
}

/// A target plus the attempt state of the worker that owns it
///
/// Handed off through the work queue; never shared between workers.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub target: DownloadTarget,
    pub attempts_made: u32,
    pub last_error: Option<FailureKind>,
}

impl WorkItem {
    pub fn new(target: DownloadTarget) -> Self {
        Self {
            target,
            attempts_made: 0,
            last_error: None,
        }
    }
}

impl From<DownloadTarget> for WorkItem {
    fn from(target: DownloadTarget) -> Self {
        WorkItem::new(target)
    }
}
