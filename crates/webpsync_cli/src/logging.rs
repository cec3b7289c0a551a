//! Tracing subscriber setup.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

use crate::{Cli, ColorChoice, LogFormat};

/// Installs the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `--quiet`/`--verbose` pick the level
/// for webpsync's own crates.
pub fn init(cli: &Cli) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(cli.quiet, cli.verbose)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(cli.verbose);

    match cli.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.with_ansi(use_color(cli.color)).try_init(),
    }
}

fn default_directive(quiet: bool, verbose: bool) -> String {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    format!("warn,webpsync={level}")
}

fn use_color(choice: ColorChoice) -> bool {
    match choice {
        ColorChoice::Auto => std::io::stderr().is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    }
}
