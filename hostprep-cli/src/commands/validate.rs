//! Command to validate a configuration document.

use crate::error::CliError;
use crate::utils::GlobalOptions;
use clap::Args;
use hostprep::config::{ConfigLoader, ConfigValidator};
use std::path::PathBuf;

/// Validate a configuration document.
#[derive(Args)]
pub struct ValidateCommand {
    /// Document to validate
    #[arg(value_name = "CONFIG_PATH")]
    pub config_path: PathBuf,

    /// Also merge and validate this environment's overlay
    #[arg(long, env = "HOSTPREP_ENVIRONMENT_NAME")]
    pub environment_name: Option<String>,
}

impl ValidateCommand {
    /// Execute the validate command.
    pub fn execute(self, global: &GlobalOptions) -> Result<(), CliError> {
        if !self.config_path.exists() {
            return Err(CliError::InvalidArguments(format!(
                "File not found: {}",
                self.config_path.display()
            )));
        }

        let config = ConfigLoader::load_with_overlay(
            Some(&self.config_path),
            self.environment_name.as_deref(),
        )?;
        ConfigValidator::validate(&config)?;

        if !global.quiet {
            println!(
                "Configuration is valid ({} environment variables)",
                config.env.len()
            );
        }
        Ok(())
    }
}
