//! Main entry point for the hostprep CLI.
//!
//! This is the command-line interface for preparing a hosted backend's build:
//! - `prepare`: Resolve the configuration and write the build inputs
//! - `publish`: Merge the resolved configuration with the framework bundle
//! - `validate`: Validate a configuration document
//! - `completions`: Generate shell completion scripts

mod cli;
mod commands;
mod error;
mod utils;

use clap::Parser;
use cli::Cli;
use error::CliError;
use utils::GlobalOptions;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = hostprep::init_logger(cli.verbose, cli.quiet).install() {
        eprintln!("Warning: {e}");
    }

    let global = GlobalOptions {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    let result = match cli.command {
        cli::Command::Prepare(cmd) => cmd.execute(&global),
        cli::Command::Publish(cmd) => cmd.execute(&global),
        cli::Command::Validate(cmd) => cmd.execute(&global),
        cli::Command::Completions(cmd) => cmd.execute(&global),
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e}");
            print_report(&e);
            std::process::exit(e.exit_code());
        }
    }
}

/// Emit the structured report on stderr for whoever drives the build.
fn print_report(error: &CliError) {
    if let Some(report) = error.report() {
        match serde_json::to_string(&report) {
            Ok(json) => eprintln!("{json}"),
            Err(e) => eprintln!("Error: failed to serialize error report: {e}"),
        }
    }
}
