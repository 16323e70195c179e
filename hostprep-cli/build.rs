//! Build script for hostprep-cli.
//!
//! This script generates man pages at build time using clap_mangen.
//! The generated man page is placed in OUT_DIR for inclusion in release builds.
//!
//! Note: We build a minimal command structure here rather than importing from
//! the main crate, since build scripts cannot depend on the crate being built.

use clap::{Arg, Command};
use clap_mangen::Man;
use std::fs;
use std::path::PathBuf;

/// Build the CLI command structure for man page generation.
///
/// IMPORTANT: Keep this structure synchronized with src/cli.rs
/// When adding/removing/modifying commands, update both files.
fn build_cli() -> Command {
    Command::new("hostprep")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Resolve hosted backend build configuration")
        .long_about(
            "Command-line tool that resolves layered backend configuration documents \
             and writes the environment a build step sees",
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .help("Enable verbose output")
                .global(true)
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .help("Suppress non-essential output")
                .global(true)
                .action(clap::ArgAction::SetTrue),
        )
        .subcommands(vec![
            Command::new("prepare")
                .about("Resolve the configuration and write the build inputs")
                .long_about(
                    "Merge the base document with its environment overlay, apply console \
                     and platform variables, pin secret versions and write the resolved \
                     document, the build environment and the build-directory context",
                ),
            Command::new("publish")
                .about("Merge the resolved configuration with the framework bundle")
                .long_about(
                    "Combine the resolved document with the adapter's bundle file into the \
                     build schema consumed after the build",
                ),
            Command::new("validate")
                .about("Validate a configuration document")
                .long_about("Check a configuration document, and optionally its overlay, for errors"),
            Command::new("completions")
                .about("Generate shell completion scripts")
                .long_about("Generate shell completion scripts for bash, zsh, fish, or PowerShell"),
        ])
}

fn main() {
    // Generate man pages at build time
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).unwrap();

    let app = build_cli();
    let man = Man::new(app);
    let mut buffer = Vec::new();
    man.render(&mut buffer).unwrap();

    fs::write(man_dir.join("hostprep.1"), buffer).unwrap();

    println!("cargo:rerun-if-changed=src/cli.rs");
    println!("cargo:rerun-if-changed=src/commands/");
}
