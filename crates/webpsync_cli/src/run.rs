//! The conversion command.
//!
//! 1. Resolve configuration (`--config`, else `./webpsync.toml`, else defaults)
//! 2. Apply CLI overrides and re-validate
//! 3. Run the pipeline on a multi-threaded tokio runtime
//! 4. Map the report to an exit code

use std::path::Path;

use tracing::warn;
use webpsync_config::{load_config, load_config_file, validate_config, ConvertConfig};
use webpsync_convert::{Pipeline, RunReport};

use crate::Cli;

/// Runs the conversion and returns the process exit code.
///
/// Exit code 0 means every matching file is converted or up to date; 1 means
/// at least one file failed and will be retried on the next run. Fatal errors
/// are returned as `Err`.
pub fn run(cli: &Cli) -> Result<i32, Box<dyn std::error::Error>> {
    let config = resolve_config(cli)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let pipeline = Pipeline::with_webp(config);
    let report = runtime.block_on(pipeline.run(&cli.input_dir, &cli.output_dir))?;

    print_summary(&report, cli.quiet);
    Ok(exit_code(&report))
}

fn resolve_config(cli: &Cli) -> Result<ConvertConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => load_config_file(path)?,
        None => load_config(Path::new("."))?,
    };
    if let Some(jobs) = cli.jobs {
        config.pipeline.max_concurrent_conversions = jobs;
    }
    validate_config(&config)?;
    Ok(config)
}

fn print_summary(report: &RunReport, quiet: bool) {
    let stats = &report.stats;
    if stats.failed > 0 {
        warn!(
            failed = stats.failed,
            "some files failed to convert and will be retried on the next run"
        );
    }
    if !quiet {
        eprintln!(
            "   Converted {} / skipped {} / failed {} ({} tracked in {})",
            stats.converted,
            stats.skipped,
            stats.failed,
            report.total_entries,
            report.lock_path.display()
        );
    }
}

fn exit_code(report: &RunReport) -> i32 {
    if report.stats.failed > 0 {
        1
    } else {
        0
    }
}
