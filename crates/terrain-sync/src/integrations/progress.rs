//! Single-line progress display
//!
//! A background task reads a snapshot of the shared progress state on every
//! refresh tick and redraws one carriage-return line on stdout:
//!
//! ```text
//! [################------------------------]  42.0% 420/1000 (ok:400 skip:15 err:5) | 1.2 MiB/s | ETA 3m05s | elapsed 2m10s
//! ```
//!
//! The display only ever reads; it never holds the progress lock while
//! writing to the terminal.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::downloader::core::{ProgressSnapshot, ProgressState};

pub const BAR_WIDTH: usize = 40;

/// Handle to a running progress display
pub struct ProgressDisplay {
    done: CancellationToken,
    handle: JoinHandle<()>,
}

impl ProgressDisplay {
    /// Start redrawing the progress line for `label` every `interval`
    pub fn spawn(label: &'static str, progress: Arc<ProgressState>, interval: Duration) -> Self {
        let done = CancellationToken::new();
        let finished = done.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(10)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => draw(label, &progress.snapshot(), false),
                    () = finished.cancelled() => break,
                }
            }
            draw(label, &progress.snapshot(), true);
        });

        Self { done, handle }
    }

    /// Draw the final line, end it with a newline and wait for the task
    pub async fn finish(self) {
        self.done.cancel();
        if let Err(e) = self.handle.await {
            debug!("Progress display task ended abnormally: {}", e);
        }
    }
}

fn draw(label: &str, snapshot: &ProgressSnapshot, last: bool) {
    let mut stdout = io::stdout().lock();
    // a closed stdout must not take the run down with it
    let _ = write!(stdout, "\r{}: {}", label, render_line(snapshot));
    if last {
        let _ = writeln!(stdout);
    }
    let _ = stdout.flush();
}

/// Render the progress line for one snapshot
pub fn render_line(snapshot: &ProgressSnapshot) -> String {
    let fraction = snapshot.fraction();
    let filled = ((fraction * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    let eta = snapshot
        .eta()
        .map(format_duration)
        .unwrap_or_else(|| "--".to_string());

    format!(
        "[{}{}] {:>5.1}% {}/{} (ok:{} skip:{} err:{}) | {} | ETA {} | elapsed {}",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        fraction * 100.0,
        snapshot.settled(),
        snapshot.total,
        snapshot.completed,
        snapshot.skipped,
        snapshot.failed,
        format_rate(snapshot.throughput_bps()),
        eta,
        format_duration(snapshot.elapsed),
    )
}

/// `45s`, `3m05s` or `2h07m`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60)
    }
}

/// Human readable transfer rate in binary units
pub fn format_rate(bytes_per_sec: f64) -> String {
    const UNITS: [&str; 4] = ["B/s", "KiB/s", "MiB/s", "GiB/s"];

    let mut value = bytes_per_sec.max(0.0);
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{:.0} {}", value, UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_pick_the_coarsest_useful_unit() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
        assert_eq!(format_duration(Duration::from_secs(185)), "3m05s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h00m");
        assert_eq!(format_duration(Duration::from_secs(7620)), "2h07m");
        assert_eq!(format_duration(Duration::from_millis(59_999)), "59s");
    }

    #[test]
    fn rates_scale_through_binary_units() {
        assert_eq!(format_rate(0.0), "0 B/s");
        assert_eq!(format_rate(512.0), "512 B/s");
        assert_eq!(format_rate(1536.0), "1.5 KiB/s");
        assert_eq!(format_rate(1.2 * 1024.0 * 1024.0), "1.2 MiB/s");
        assert_eq!(format_rate(-3.0), "0 B/s");
    }

    #[test]
    fn line_shows_counts_rate_and_eta() {
        let snapshot = ProgressSnapshot {
            total: 1000,
            completed: 400,
            skipped: 15,
            failed: 5,
            cancelled: 0,
            bytes_done: 156 * 1024 * 1024,
            elapsed: Duration::from_secs(130),
        };

        let line = render_line(&snapshot);
        assert!(line.starts_with(&format!("[{}{}]", "#".repeat(17), "-".repeat(23))), "{line}");
        assert!(line.contains(" 42.0% 420/1000 (ok:400 skip:15 err:5)"), "{line}");
        assert!(line.contains("| 1.2 MiB/s |"), "{line}");
        // 580 remaining at 0.325s per item
        assert!(line.contains("| ETA 3m08s |"), "{line}");
        assert!(line.ends_with("elapsed 2m10s"), "{line}");
    }

    #[test]
    fn line_without_completions_has_no_eta() {
        let snapshot = ProgressSnapshot {
            total: 10,
            skipped: 3,
            ..ProgressSnapshot::default()
        };

        let line = render_line(&snapshot);
        assert!(line.starts_with(&format!("[{}{}]", "#".repeat(12), "-".repeat(28))), "{line}");
        assert!(line.contains("ETA --"), "{line}");
        assert!(line.contains("0 B/s"), "{line}");
    }

    #[test]
    fn bar_and_count_agree_once_targets_are_cancelled() {
        let snapshot = ProgressSnapshot {
            total: 10,
            completed: 2,
            cancelled: 6,
            ..ProgressSnapshot::default()
        };

        let line = render_line(&snapshot);
        assert!(line.starts_with(&format!("[{}{}]", "#".repeat(8), "-".repeat(32))), "{line}");
        assert!(line.contains(" 20.0% 2/10 "), "{line}");
    }

    #[test]
    fn empty_set_renders_an_empty_bar() {
        let line = render_line(&ProgressSnapshot::default());
        assert!(line.starts_with(&format!("[{}]", "-".repeat(BAR_WIDTH))));
        assert!(line.contains("  0.0% 0/0"));
    }

    #[tokio::test(start_paused = true)]
    async fn display_stops_when_finished() {
        let progress = Arc::new(ProgressState::new(2));
        let display = ProgressDisplay::spawn("textures", progress.clone(), Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(350)).await;
        display.finish().await;
    }
}
