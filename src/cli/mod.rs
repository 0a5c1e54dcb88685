//! Command-line interface module
//!
//! This module handles argument parsing and output formatting.
//! It contains no business logic - that belongs in the [`crate::core`] module.

pub mod commands;
pub mod output;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use commands::Commands;

/// spackdev - develop several interdependent packages as one build
///
/// Sets up a development area in which the chosen packages are built
/// together from source against dependencies installed by spack.
#[derive(Parser, Debug)]
#[command(name = "spackdev")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<ExitCode> {
        self.command.run()
    }
}
