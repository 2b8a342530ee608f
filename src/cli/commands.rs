//! CLI command implementations
//!
//! Everything user-facing lives here: merging config-file defaults under
//! explicit flags, mode dispatch (single / batch / playlist), overwrite
//! protection, stdin/stdout handling, and plain or JSON result output.
//! The combination core stays silent; this layer turns its structured
//! results and errors into text and exit codes.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::info;
use rand::seq::SliceRandom;
use serde_json::json;

use crate::ambient::AmbientSelector;
use crate::chain::Chainer;
use crate::combine::{CombineOptions, CombineRequest, Combiner, DryRunReport};
use crate::config::Config;
use crate::error::{FuseError, Result};
use crate::playlist::read_playlist;
use crate::stdio;

use super::Cli;

/// Default normalization target when neither flag nor config sets one
const DEFAULT_NORMALIZE_LEVEL: f64 = 0.8;

// ============================================================================
// Output formatting
// ============================================================================

/// Console output policy: quiet / normal / verbose, plus JSON mode
///
/// In JSON mode all plain output is suppressed; the single JSON document is
/// the only thing written to stdout.
#[derive(Debug, Clone, Copy)]
pub struct Console {
    verbosity: u8,
    json: bool,
}

impl Console {
    fn from_cli(cli: &Cli) -> Self {
        let verbosity = if cli.json || cli.quiet {
            0
        } else if cli.verbose {
            2
        } else {
            1
        };
        Console {
            verbosity,
            json: cli.json,
        }
    }

    fn info(&self, message: &str) {
        if self.verbosity >= 1 && !self.json {
            println!("{}", message);
        }
    }

    fn verbose(&self, message: &str) {
        if self.verbosity >= 2 && !self.json {
            println!("[verbose] {}", message);
        }
    }

    fn error(&self, err: &FuseError) {
        if self.json {
            return;
        }
        eprintln!("error: {}", err);
        for line in err.suggestions() {
            eprintln!("suggestion: {}", line);
        }
    }
}

/// Effective settings after merging flags over config over defaults
#[derive(Debug, Clone)]
struct Settings {
    options: CombineOptions,
    force: bool,
    reverse: bool,
    shuffle: bool,
    output_dir: PathBuf,
    ambient: Option<String>,
}

// ============================================================================
// Entry point
// ============================================================================

/// Run the CLI; returns the process exit code (0 success, 1 any failure)
pub fn run(cli: Cli) -> i32 {
    let console = Console::from_cli(&cli);
    let config = Config::load();

    let settings = match merge_settings(&cli, &config) {
        Ok(s) => s,
        Err(e) => {
            console.error(&e);
            return 1;
        }
    };

    let selector = AmbientSelector::new();
    if cli.list_ambients {
        list_ambients(&console, &selector);
        return 0;
    }

    if cli.batch {
        return batch_mode(&cli, &console, &settings, &selector);
    }
    if let Some(playlist_path) = &cli.playlist {
        return playlist_mode(&cli, &console, &settings, playlist_path);
    }
    single_mode(&cli, &console, &settings, &selector)
}

/// Merge explicit flags over config-file values over built-in defaults
fn merge_settings(cli: &Cli, config: &Config) -> Result<Settings> {
    let fade = cli.fade.or(config.fade).unwrap_or(0.0);
    if fade < 0.0 {
        return Err(FuseError::InvalidOption {
            reason: "fade duration must be zero or positive".to_string(),
        });
    }

    let normalize_target = if cli.no_normalize {
        None
    } else {
        let level = cli
            .level
            .or(config.level)
            .unwrap_or(DEFAULT_NORMALIZE_LEVEL);
        if !(0.0..=1.0).contains(&level) || level == 0.0 {
            return Err(FuseError::InvalidOption {
                reason: "normalization level must be between 0.0 and 1.0".to_string(),
            });
        }
        Some(level)
    };

    let loop_count = cli.loop_count.or(config.loop_count).unwrap_or(1);
    if loop_count < 1 {
        return Err(FuseError::InvalidOption {
            reason: "loop count must be at least 1".to_string(),
        });
    }

    if let Some(preview) = cli.preview {
        if preview <= 0.0 {
            return Err(FuseError::InvalidOption {
                reason: "preview duration must be positive".to_string(),
            });
        }
    }

    Ok(Settings {
        options: CombineOptions {
            crossfade_seconds: fade,
            normalize_target,
            preview_seconds: cli.preview,
            loop_count,
            dry_run: cli.dry_run,
        },
        force: cli.force || config.force.unwrap_or(false),
        reverse: cli.reverse || config.reverse.unwrap_or(false),
        shuffle: cli.shuffle || config.shuffle.unwrap_or(false),
        output_dir: cli
            .output_dir
            .clone()
            .or_else(|| config.output_dir.clone().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(".")),
        ambient: cli.ambient.clone().or_else(|| config.ambient.clone()),
    })
}

// ============================================================================
// Modes
// ============================================================================

fn list_ambients(console: &Console, selector: &AmbientSelector) {
    console.info("Available ambient tracks:");
    for name in selector.installed() {
        console.info(&format!("  - {}", name));
    }
    console.info("  - random (selects randomly from available tracks)");
    console.info("  - or provide a custom file path");
}

fn single_mode(
    cli: &Cli,
    console: &Console,
    settings: &Settings,
    selector: &AmbientSelector,
) -> i32 {
    let (input_a, input_b, output) = match cli.files.len() {
        3 => {
            let (a, b) = if settings.reverse {
                (cli.files[1].clone(), cli.files[0].clone())
            } else {
                (cli.files[0].clone(), cli.files[1].clone())
            };
            (a, b, cli.files[2].clone())
        }
        2 => {
            let ambient = selector.select(settings.ambient.as_deref());
            let user_file = cli.files[0].clone();
            let (a, b) = if settings.reverse {
                (user_file, ambient)
            } else {
                (ambient, user_file)
            };
            (a, b, cli.files[1].clone())
        }
        _ => {
            let err = FuseError::InvalidOption {
                reason: format!(
                    "expected 2 or 3 file arguments, got {} (see --help)",
                    cli.files.len()
                ),
            };
            console.error(&err);
            return 1;
        }
    };

    match run_single(console, settings, &input_a, &input_b, &output) {
        Ok(outcome) => {
            emit_json(
                console,
                settings,
                &[input_a.as_path(), input_b.as_path()],
                &output,
                None,
            );
            if let Some(report) = outcome {
                print_dry_run(console, &report);
            }
            0
        }
        Err(e) => {
            console.error(&e);
            emit_json(
                console,
                settings,
                &[input_a.as_path(), input_b.as_path()],
                &output,
                Some(&e),
            );
            1
        }
    }
}

/// One combine with stdio materialization and overwrite protection
fn run_single(
    console: &Console,
    settings: &Settings,
    input_a: &Path,
    input_b: &Path,
    output: &Path,
) -> Result<Option<DryRunReport>> {
    // Temp guards must outlive the combine; they delete on drop.
    let mut temps: Vec<stdio::TempInput> = Vec::new();

    let actual_a = if stdio::is_stdio(input_a) {
        console.verbose("reading first input from stdin");
        let temp = stdio::read_stdin_to_temp_file()?;
        let path = temp.path().to_path_buf();
        temps.push(temp);
        path
    } else {
        input_a.to_path_buf()
    };
    let actual_b = if stdio::is_stdio(input_b) {
        console.verbose("reading second input from stdin");
        let temp = stdio::read_stdin_to_temp_file()?;
        let path = temp.path().to_path_buf();
        temps.push(temp);
        path
    } else {
        input_b.to_path_buf()
    };

    let to_stdout = stdio::is_stdio(output);
    let actual_output = if to_stdout {
        let temp = stdio::stdout_temp_file()?;
        let path = temp.path().to_path_buf();
        temps.push(temp);
        path
    } else {
        if output.exists() && !settings.force && !settings.options.dry_run {
            return Err(FuseError::InvalidOption {
                reason: format!(
                    "output file '{}' already exists (use --force to overwrite)",
                    output.display()
                ),
            });
        }
        output.to_path_buf()
    };

    let request = CombineRequest::with_options(
        actual_a,
        actual_b,
        actual_output.clone(),
        settings.options.clone(),
    );
    let result = Combiner::new().combine(&request)?;

    if result.dry_run.is_none() {
        if to_stdout {
            console.verbose("streaming output to stdout");
            stdio::write_to_stdout(&actual_output)?;
        } else {
            console.info(&format!(
                "Combined into {} ({} bytes)",
                output.display(),
                result.bytes_written
            ));
        }
    }
    Ok(result.dry_run)
}

fn batch_mode(
    cli: &Cli,
    console: &Console,
    settings: &Settings,
    selector: &AmbientSelector,
) -> i32 {
    if cli.files.is_empty() {
        let err = FuseError::InvalidOption {
            reason: "batch mode requires at least one input file".to_string(),
        };
        console.error(&err);
        return 1;
    }

    let mut inputs = cli.files.clone();
    if settings.shuffle {
        inputs.shuffle(&mut rand::thread_rng());
        console.verbose("shuffled file order");
    }

    if let Err(e) = fs::create_dir_all(&settings.output_dir) {
        console.error(&FuseError::Io(e));
        return 1;
    }

    let ambient = selector.select(settings.ambient.as_deref());
    let combiner = Combiner::new();
    let total = inputs.len();
    console.info(&format!("Batch processing {} file(s)...", total));

    let mut succeeded = 0usize;
    let mut failed = 0usize;

    for (index, input) in inputs.iter().enumerate() {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let out_path = settings.output_dir.join(format!("{}_fused.wav", stem));

        console.info(&format!(
            "[{}/{}] Processing: {}",
            index + 1,
            total,
            input.display()
        ));

        if out_path.exists() && !settings.force {
            console.info("  skipping: output file already exists (use --force to overwrite)");
            failed += 1;
            continue;
        }

        let request = CombineRequest::with_options(
            ambient.clone(),
            input.clone(),
            out_path,
            settings.options.clone(),
        );
        match combiner.combine(&request) {
            Ok(_) => succeeded += 1,
            Err(e) => {
                console.error(&e);
                failed += 1;
            }
        }
    }

    console.info("=== Batch processing complete ===");
    console.info(&format!("  Successful: {}", succeeded));
    console.info(&format!("  Failed: {}", failed));
    console.info(&format!("  Total: {}", total));

    if failed > 0 {
        1
    } else {
        0
    }
}

fn playlist_mode(
    cli: &Cli,
    console: &Console,
    settings: &Settings,
    playlist_path: &Path,
) -> i32 {
    let output = match cli.files.first() {
        Some(path) => path.clone(),
        None => {
            let err = FuseError::InvalidOption {
                reason: "playlist mode requires an output file argument".to_string(),
            };
            console.error(&err);
            return 1;
        }
    };

    let mut files = match read_playlist(playlist_path) {
        Ok(f) => f,
        Err(e) => {
            console.error(&e);
            return 1;
        }
    };
    if settings.shuffle {
        files.shuffle(&mut rand::thread_rng());
        console.verbose("shuffled playlist order");
    }

    if output.exists() && !settings.force {
        let err = FuseError::InvalidOption {
            reason: format!(
                "output file '{}' already exists (use --force to overwrite)",
                output.display()
            ),
        };
        console.error(&err);
        return 1;
    }

    console.info(&format!("Processing playlist with {} file(s)...", files.len()));
    info!("playlist: {} entries -> {}", files.len(), output.display());

    match Chainer::new().combine_sequence(&files, &output, &settings.options) {
        Ok(()) => {
            console.info(&format!("Playlist processing complete: {}", output.display()));
            0
        }
        Err(e) => {
            console.error(&e);
            1
        }
    }
}

// ============================================================================
// Result rendering
// ============================================================================

fn print_dry_run(console: &Console, report: &DryRunReport) {
    console.info("=== DRY RUN MODE ===");
    for (label, input) in [("Input File 1", &report.input_a), ("Input File 2", &report.input_b)] {
        console.info(&format!("{}: {}", label, input.path));
        console.info(&format!("  Size: {} KB", input.size_bytes / 1024));
        console.info(&format!("  Duration: {:.2} seconds", input.duration_secs));
        console.info(&format!("  Sample Rate: {} Hz", input.sample_rate));
        console.info(&format!("  Channels: {}", input.channels));
        console.info(&format!("  Bit Depth: {} bits", input.bits_per_sample));
    }
    console.info(&format!("Output File: {}", report.output));
    console.info(&format!(
        "  Estimated Size: {} KB",
        report.estimated_size_bytes / 1024
    ));
    console.info(&format!(
        "  Estimated Duration: {:.2} seconds",
        report.estimated_duration_secs
    ));
    console.info("Settings:");
    console.info(&format!(
        "  Crossfade: {}",
        if report.crossfade_seconds > 0.0 {
            format!("{} seconds", report.crossfade_seconds)
        } else {
            "disabled".to_string()
        }
    ));
    console.info(&format!(
        "  Normalization: {}",
        match report.normalize_target {
            Some(level) => format!("{:.1}%", level * 100.0),
            None => "disabled".to_string(),
        }
    ));
    console.info(&format!("  Loop count: {}", report.loop_count));
    console.info("No files were modified (dry run).");
}

/// Emit the single JSON result document in `--json` mode
fn emit_json(
    console: &Console,
    settings: &Settings,
    inputs: &[&Path],
    output: &Path,
    error: Option<&FuseError>,
) {
    if !console.json {
        return;
    }

    let size_bytes = fs::metadata(output).map(|m| m.len()).ok();
    let mut doc = json!({
        "status": if error.is_none() { "success" } else { "error" },
        "input_files": inputs.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
        "output_file": output.display().to_string(),
        "fade_duration": settings.options.crossfade_seconds,
        "normalize_level": settings.options.normalize_target,
        "loop_count": settings.options.loop_count,
        "timestamp": Utc::now().to_rfc3339(),
    });
    if let Some(size) = size_bytes {
        doc["size_bytes"] = json!(size);
    }
    if let Some(err) = error {
        doc["error"] = json!(err.to_string());
        doc["error_code"] = json!(err.error_code());
    }

    println!("{}", serde_json::to_string_pretty(&doc).unwrap_or_default());
}
