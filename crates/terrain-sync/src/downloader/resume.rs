//! Resume filter
//!
//! Runs once per asset set, before any worker starts. Targets already on disk
//! and non-empty are counted as skipped; everything else becomes a work item.

use tracing::{debug, warn};

use crate::downloader::catalog::TargetCatalog;
use crate::downloader::core::files::is_satisfied;
use crate::downloader::core::{ItemOutcome, ProgressState, WorkItem};

/// Split the catalog into skipped targets and the work list
pub async fn filter(catalog: &TargetCatalog, progress: &ProgressState) -> Vec<WorkItem> {
    let mut work = Vec::with_capacity(catalog.len());

    for target in catalog.enumerate() {
        match is_satisfied(&target.local_path).await {
            Ok(true) => {
                debug!("Already present, skipping {}", target.local_path.display());
                progress.report(ItemOutcome::Skipped);
            }
            Ok(false) => work.push(WorkItem::new(target.clone())),
            Err(e) => {
                // let the fetch surface the real problem
                warn!("Could not inspect {}: {}", target.local_path.display(), e);
                work.push(WorkItem::new(target.clone()));
            }
        }
    }

    work
}
