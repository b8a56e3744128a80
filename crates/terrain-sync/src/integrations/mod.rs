//! Presentation helpers layered on top of the engine

pub mod progress;

pub use progress::{ProgressDisplay, format_duration, format_rate, render_line};
