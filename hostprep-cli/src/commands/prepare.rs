//! Command to resolve a backend's configuration before its build.

use crate::error::CliError;
use crate::utils::{
    deadline_from_seconds, load_secret_store, resolve_document_path, resolve_workspace,
    GlobalOptions,
};
use clap::{Args, ValueEnum};
use hostprep::operations::BuildContextTarget;
use hostprep::output::EnvLayout;
use hostprep::{prepare, PrepareOptions};
use std::path::PathBuf;

/// Layout of the build environment output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LayoutArg {
    /// A single `KEY=value` file
    Dotenv,
    /// One file per variable inside a directory
    Lifecycle,
}

impl From<LayoutArg> for EnvLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Dotenv => EnvLayout::Dotenv,
            LayoutArg::Lifecycle => EnvLayout::Lifecycle,
        }
    }
}

/// Resolve the configuration and write the build inputs.
#[derive(Args)]
pub struct PrepareCommand {
    /// Project that owns shorthand secrets and bare network ids
    #[arg(long, env = "HOSTPREP_PROJECT_ID")]
    pub project_id: String,

    /// Region used to expand bare connector and subnetwork ids
    #[arg(long, env = "HOSTPREP_REGION")]
    pub region: Option<String>,

    /// Environment whose overlay is merged onto the base document
    #[arg(long, env = "HOSTPREP_ENVIRONMENT_NAME")]
    pub environment_name: Option<String>,

    /// Base document (discovered from the backend root when omitted)
    #[arg(long, value_name = "PATH", env = "HOSTPREP_DOCUMENT")]
    pub document: Option<PathBuf>,

    /// Workspace the backend root is relative to
    #[arg(long, value_name = "PATH", default_value = ".", env = "HOSTPREP_WORKSPACE_PATH")]
    pub workspace_path: PathBuf,

    /// Backend root directory inside the workspace
    #[arg(long, env = "HOSTPREP_BACKEND_ROOT_DIRECTORY")]
    pub backend_root_directory: Option<String>,

    /// Where the resolved document is written
    #[arg(long, value_name = "PATH", env = "HOSTPREP_DOCUMENT_OUTPUT")]
    pub document_output: PathBuf,

    /// Optional second copy of the resolved document
    #[arg(long, value_name = "PATH", env = "HOSTPREP_PREPROCESSED_OUTPUT")]
    pub preprocessed_output: Option<PathBuf>,

    /// Where the build environment is written
    #[arg(long, value_name = "PATH", env = "HOSTPREP_ENV_OUTPUT")]
    pub env_output: PathBuf,

    /// Layout of the build environment (detected from the path when omitted)
    #[arg(long, value_enum, env = "HOSTPREP_ENV_LAYOUT")]
    pub env_layout: Option<LayoutArg>,

    /// Directory receiving the build-directory context files
    #[arg(long, value_name = "PATH", env = "HOSTPREP_BUILD_CONTEXT_OUTPUT")]
    pub build_context_output: Option<PathBuf>,

    /// Console variables as a JSON array
    #[arg(long, value_name = "JSON", env = "HOSTPREP_CONSOLE_ENV")]
    pub console_env: Option<String>,

    /// Value for the FIREBASE_CONFIG platform variable
    #[arg(long, value_name = "JSON", env = "HOSTPREP_FIREBASE_CONFIG")]
    pub firebase_config: Option<String>,

    /// Value for the FIREBASE_WEBAPP_CONFIG platform variable
    #[arg(long, value_name = "JSON", env = "HOSTPREP_FIREBASE_WEBAPP_CONFIG")]
    pub firebase_webapp_config: Option<String>,

    /// YAML file backing the secret store
    #[arg(long, value_name = "PATH", env = "HOSTPREP_SECRETS_FILE")]
    pub secrets_file: Option<PathBuf>,

    /// Abort secret access after this many seconds
    #[arg(long, value_name = "SECONDS", env = "HOSTPREP_TIMEOUT_SECONDS")]
    pub timeout_seconds: Option<u64>,
}

impl PrepareCommand {
    /// Execute the prepare command.
    pub fn execute(self, global: &GlobalOptions) -> Result<(), CliError> {
        let workspace = resolve_workspace(&self.workspace_path)?;
        let backend_root = self.backend_root_directory.unwrap_or_default();
        let document_path = resolve_document_path(self.document, &workspace, &backend_root)?;
        let store = load_secret_store(self.secrets_file.as_deref())?;
        let deadline = deadline_from_seconds(self.timeout_seconds)?;

        let build_context = self.build_context_output.map(|output_dir| BuildContextTarget {
            cwd: workspace,
            root_directory: backend_root,
            output_dir,
        });

        let options = PrepareOptions::new(self.project_id, self.document_output, self.env_output)
            .with_region(self.region)
            .with_environment_name(self.environment_name)
            .with_document_path(document_path)
            .with_preprocessed_output(self.preprocessed_output)
            .with_env_layout(self.env_layout.map(EnvLayout::from))
            .with_build_context(build_context)
            .with_console_env_json(self.console_env)
            .with_firebase_config(self.firebase_config)
            .with_firebase_webapp_config(self.firebase_webapp_config)
            .with_deadline(deadline);

        let outcome = prepare(&options, &store)?;

        if !global.quiet {
            println!(
                "Resolved {} environment variables ({} available at build time)",
                outcome.config.env.len(),
                outcome.build_env.len()
            );
        }
        if let Some(context) = &outcome.build_context {
            log::info!("build directory: {}", context.build_directory.display());
        }

        Ok(())
    }
}
