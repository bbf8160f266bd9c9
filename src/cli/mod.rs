//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod index;
mod split;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

pub use split::SplitArgs;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Split AI-generated sprite sheets into named, canvas-sized PNGs
#[derive(Parser)]
#[command(name = "sprsplit")]
#[command(about = "Split a sprite sheet into named PNGs using its prompt and a labeled reference")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Split one batch and add its sprites to the output index
    Split(SplitArgs),

    /// Show or check the sprite index of an output directory
    Index {
        /// Output directory holding the index
        dir: PathBuf,

        /// Index filename inside the directory
        #[arg(long, default_value = crate::index::INDEX_FILENAME)]
        index_file: String,

        /// Verify filenames against the recorded counts; exit 1 on problems
        #[arg(long)]
        check: bool,
    },
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Split(args) => split::run_split(&args),
        Commands::Index { dir, index_file, check } => index::run_index(&dir, &index_file, check),
    }
}
