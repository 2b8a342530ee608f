//! CLI Module
//!
//! Argument surface for the wavfuse binary. Flags mirror the classic
//! flag-style interface: positional files plus long options, with duration
//! values accepting an optional trailing `s` (`--fade 1.5s`).

pub mod commands;

use std::path::PathBuf;

use clap::Parser;

/// Combine WAV files with crossfade, normalization and looping
///
/// File arguments: `INPUT1 INPUT2 OUTPUT` combines two files; `INPUT OUTPUT`
/// layers the selected ambient track under the input. Use `-` for stdin or
/// stdout.
#[derive(Parser, Debug)]
#[command(name = "wavfuse")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Input and output files (interpretation depends on mode)
    pub files: Vec<PathBuf>,

    /// Crossfade duration in seconds between the files (e.g. 1.5 or 1.5s)
    #[arg(long, value_name = "SECONDS", value_parser = parse_seconds)]
    pub fade: Option<f64>,

    /// Normalize audio to this peak level (0.0 to 1.0)
    #[arg(long, value_name = "LEVEL")]
    pub level: Option<f64>,

    /// Disable automatic volume normalization
    #[arg(long)]
    pub no_normalize: bool,

    /// Repeat the first file N times
    #[arg(long = "loop", value_name = "N")]
    pub loop_count: Option<u32>,

    /// Process only the first N seconds of each input (e.g. 30 or 30s)
    #[arg(long, value_name = "SECONDS", value_parser = parse_seconds)]
    pub preview: Option<f64>,

    /// Show what would be done without processing
    #[arg(long)]
    pub dry_run: bool,

    /// Overwrite the output file if it already exists
    #[arg(long)]
    pub force: bool,

    /// Swap file order (ambient after content, not before)
    #[arg(long)]
    pub reverse: bool,

    /// Randomize file order in batch and playlist modes
    #[arg(long)]
    pub shuffle: bool,

    /// Batch process multiple input files
    #[arg(long)]
    pub batch: bool,

    /// Output directory for batch mode
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Combine all files listed in a playlist (one path per line)
    #[arg(long, value_name = "FILE")]
    pub playlist: Option<PathBuf>,

    /// Ambient track to layer under single inputs
    /// (ambient, vinyl, rain, cafe, night, random, or a path)
    #[arg(long, value_name = "NAME")]
    pub ambient: Option<String>,

    /// List available ambient tracks and exit
    #[arg(long)]
    pub list_ambients: bool,

    /// Show detailed processing information
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results as JSON for scripting
    #[arg(long)]
    pub json: bool,
}

/// Parse a duration that may carry a trailing `s` suffix
fn parse_seconds(raw: &str) -> Result<f64, String> {
    let trimmed = raw.strip_suffix(|c| c == 's' || c == 'S').unwrap_or(raw);
    trimmed
        .parse::<f64>()
        .map_err(|_| format!("'{}' is not a valid duration in seconds", raw))
}
