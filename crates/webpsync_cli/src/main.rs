//! webpsync CLI: incrementally mirror a tree of PNG images as WebP.
//!
//! `webpsync <INPUT_DIR> <OUTPUT_DIR>` converts every `.png` under the input
//! directory into the matching location under the output directory and
//! records the result in `conversion.lock`, so the next run only touches
//! files that changed.

#![warn(missing_docs)]

mod logging;
mod run;

use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};

/// Incremental PNG to WebP conversion.
#[derive(Parser, Debug)]
#[command(name = "webpsync", version, about = "Convert PNG trees to WebP, skipping unchanged files")]
pub struct Cli {
    /// Directory containing the PNG files to convert.
    pub input_dir: PathBuf,

    /// Directory that receives the WebP files and `conversion.lock`.
    pub output_dir: PathBuf,

    /// Maximum number of simultaneous conversions (overrides the config file).
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Suppress all output except errors.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Log line format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Path to a `webpsync.toml` configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(&cli) {
        eprintln!("error: failed to initialize logging: {e}");
        process::exit(1);
    }

    match run::run(&cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
