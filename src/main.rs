//! wavfuse CLI
//!
//! Command-line entry point: parses arguments, initializes logging and
//! dispatches into the command layer. Exit code is 0 on success, 1 on any
//! failure.

use clap::Parser;
use env_logger::Env;
use log::debug;

use wavfuse::cli::{commands, Cli};

fn main() {
    // Diagnostics go through the log facade; user-facing output is handled
    // by the command layer so that --quiet and --json stay clean.
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    debug!("wavfuse v{}", env!("CARGO_PKG_VERSION"));

    std::process::exit(commands::run(cli));
}
