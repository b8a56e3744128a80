//! Cooperative cancellation
//!
//! A single stop flag (a `CancellationToken`) is shared by every worker and
//! checked at each suspension point: the pacing wait, the retry backoff, the
//! body stream and the work queue. Nothing is aborted mid-write.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Returned by waits that ended because a stop was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopRequested;

/// Process-wide stop switch handed to the engine
#[derive(Debug, Clone, Default)]
pub struct StopController {
    token: CancellationToken,
    requested: Arc<AtomicBool>,
}

impl StopController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Set the stop flag; only the first call logs
    pub fn request_stop(&self, reason: &str) {
        if !self.requested.swap(true, Ordering::SeqCst) {
            info!("Stop requested ({reason}), letting in-flight downloads wind down");
        }
        self.token.cancel();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Spawn a task that turns Ctrl+C (and SIGTERM on unix) into a stop request
    ///
    /// The task exits on its own once the stop flag is set by anyone.
    pub fn listen_for_interrupt(&self) -> JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move {
            let ctrl_c = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Failed to install Ctrl+C handler: {e}");
                    std::future::pending::<()>().await;
                }
            };

            #[cfg(unix)]
            let terminate = async {
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(mut signal) => {
                        signal.recv().await;
                    }
                    Err(e) => {
                        warn!("Failed to install SIGTERM handler: {e}");
                        std::future::pending::<()>().await;
                    }
                }
            };

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                () = ctrl_c => controller.request_stop("interrupted by user"),
                () = terminate => controller.request_stop("terminate signal"),
                () = controller.token.cancelled() => {}
            }
        })
    }
}

/// Sleep for `duration` unless a stop is requested first
pub async fn sleep_or_stop(token: &CancellationToken, duration: Duration) -> Result<(), StopRequested> {
    if token.is_cancelled() {
        return Err(StopRequested);
    }
    if duration.is_zero() {
        return Ok(());
    }
    tokio::select! {
        () = tokio::time::sleep(duration) => Ok(()),
        () = token.cancelled() => Err(StopRequested),
    }
}
