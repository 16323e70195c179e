//! CLI structure and command definitions.
//!
//! This module defines the main CLI structure using clap's derive macros,
//! including global options and subcommands.

use crate::commands::{CompletionsCommand, PrepareCommand, PublishCommand, ValidateCommand};
use clap::{Parser, Subcommand};

/// Command-line tool for preparing a hosted backend's build.
#[derive(Parser)]
#[command(name = "hostprep")]
#[command(version, about = "Resolve hosted backend build configuration", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand)]
pub enum Command {
    /// Resolve the configuration and write the build inputs
    Prepare(PrepareCommand),

    /// Merge the resolved configuration with the framework bundle
    Publish(PublishCommand),

    /// Validate a configuration document
    Validate(ValidateCommand),

    /// Generate shell completion scripts
    Completions(CompletionsCommand),
}
