use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;
use terrain_sync::AssetKind;
use terrain_sync::downloader::config::{ELEVATION_URL, TEXTURES_URL};

/// Download Tacview terrain assets.
///
/// Texture tiles (*.webp) land in the textures directory, elevation files
/// (*.srtm) in the elevation directory. Files already present are skipped,
/// so an interrupted run can simply be started again.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Maximum number of concurrent downloads.
    #[arg(short, long, default_value_t = 4)]
    pub workers: usize,

    /// Minimum delay in seconds between two requests of the same worker.
    #[arg(long, default_value_t = 0.5)]
    pub delay: f64,

    /// Retries per file after a transient error.
    #[arg(long, default_value_t = 3)]
    pub retries: u32,

    /// Textures destination directory.
    #[arg(long, default_value = "textures")]
    pub textures_dir: PathBuf,

    /// Elevation destination directory.
    #[arg(long, default_value = "elevation")]
    pub elevation_dir: PathBuf,

    /// Directory listing the texture tiles are downloaded from.
    #[arg(long, default_value = TEXTURES_URL)]
    pub textures_url: String,

    /// Directory listing the elevation files are downloaded from.
    #[arg(long, default_value = ELEVATION_URL)]
    pub elevation_url: String,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 60)]
    pub timeout: u64,

    /// Only download one asset set.
    #[arg(long, value_enum)]
    pub only: Option<AssetSetArg>,

    /// Write a JSON summary of the run to this file.
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log warnings and errors, and hide the progress line.
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AssetSetArg {
    Textures,
    Elevation,
}

impl From<AssetSetArg> for AssetKind {
    fn from(arg: AssetSetArg) -> Self {
        match arg {
            AssetSetArg::Textures => AssetKind::Texture,
            AssetSetArg::Elevation => AssetKind::Elevation,
        }
    }
}

impl Args {
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::WARN;
        }
        match self.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
