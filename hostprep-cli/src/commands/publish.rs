//! Command to merge the resolved configuration with the framework bundle.

use crate::error::CliError;
use crate::utils::GlobalOptions;
use clap::Args;
use hostprep::publish;
use std::path::PathBuf;

/// Merge the resolved configuration with the framework bundle.
#[derive(Args)]
pub struct PublishCommand {
    /// Resolved document written by `prepare`
    #[arg(long, value_name = "PATH", env = "HOSTPREP_DOCUMENT")]
    pub document: PathBuf,

    /// Bundle file produced by the framework adapter
    #[arg(long, value_name = "PATH", env = "HOSTPREP_BUNDLE")]
    pub bundle: PathBuf,

    /// Where the build schema is written
    #[arg(long, value_name = "PATH", env = "HOSTPREP_SCHEMA_OUTPUT")]
    pub output: PathBuf,
}

impl PublishCommand {
    /// Execute the publish command.
    pub fn execute(self, global: &GlobalOptions) -> Result<(), CliError> {
        let schema = publish(&self.document, &self.bundle, &self.output)?;

        if !global.quiet {
            println!(
                "Wrote build schema with {} environment variables to {}",
                schema.env.len(),
                self.output.display()
            );
        }

        Ok(())
    }
}
