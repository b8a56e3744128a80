mod args;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::process::ExitCode;
use std::time::Duration;
use terrain_sync::{FailedTarget, SyncConfig, SyncSummary, TerrainSync};
use tracing::{info, warn};

use crate::args::Args;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // logs go to stderr so they don't tear the progress line on stdout
    tracing_subscriber::fmt()
        .with_max_level(args.log_level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = SyncConfig::builder()
        .workers(args.workers)
        .delay_secs(args.delay)
        .max_retries(args.retries)
        .request_timeout(Duration::from_secs(args.timeout.max(1)))
        .textures(args.textures_url.clone(), args.textures_dir.clone())
        .elevation(args.elevation_url.clone(), args.elevation_dir.clone())
        .only(args.only.map(Into::into))
        .show_progress(!args.quiet)
        .build()
        .context("invalid settings")?;

    let engine = TerrainSync::new(config).context("failed to set up the downloader")?;
    let interrupt = engine.stop_controller().listen_for_interrupt();

    let summary = engine.run().await.context("sync aborted")?;

    // let the signal listener exit
    engine.stop_controller().token().cancel();
    let _ = interrupt.await;

    print_summary(&summary);
    if let Some(path) = &args.report {
        let file = File::create(path).with_context(|| format!("cannot create report {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &summary)
            .with_context(|| format!("cannot write report {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    Ok(ExitCode::from(summary.exit_code()))
}

fn print_summary(summary: &SyncSummary) {
    for set in &summary.sets {
        println!(
            "[{}] downloaded: {}, skipped: {}, failed: {}, elapsed: {:.1}s",
            set.label,
            set.completed,
            set.skipped,
            set.failed,
            set.elapsed.as_secs_f64()
        );
    }
    for label in &summary.skipped_sets {
        println!("[{label}] not started, stop was requested");
    }

    let failures: Vec<_> = summary.failures().collect();
    if !failures.is_empty() {
        println!("Failed files ({}):", failures.len());
        for failure in failures {
            println!("{}", failure_line(failure));
        }
    }
    if summary.cancelled {
        warn!("Run was interrupted; start it again to fetch the remaining files");
    }
}

fn failure_line(failure: &FailedTarget) -> String {
    format!(
        "  {} ({}) after {} attempt(s): {}",
        failure.file_name, failure.identifier, failure.attempts, failure.error
    )
}
