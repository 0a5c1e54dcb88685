//! spackdev CLI - develop several interdependent packages as one build
//!
//! Entry point for the spackdev command-line application.

use std::process::ExitCode;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use spackdev::cli::output::{display_error, OutputConfig};
use spackdev::cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    // Apply output configuration globally
    OutputConfig::new(cli.quiet).apply_global();

    // Run the command and handle errors
    match cli.run() {
        Ok(code) => code,
        Err(e) => {
            display_error(&e);
            ExitCode::FAILURE
        }
    }
}
