//! The prepare pipeline.
//!
//! Resolution and writing are separate phases: [`resolve`] does every
//! fallible step in memory, and [`PrepareOutcome::write`] only runs once it
//! has succeeded, so a failed run leaves no output behind.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::vpc::normalize_vpc_access;
use crate::config::{ConfigLoader, ConfigValidator, Configuration, EnvComposer};
use crate::error::{Error, Result};
use crate::operations::build_context::BuildDirectoryContext;
use crate::output::{write_document, EnvLayout, EnvOutput};
use crate::secrets::{self, build_env_map, pin_versions, Deadline, SecretStore};

/// Where to detect and write the build-directory context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContextTarget {
    /// Working directory the build starts in.
    pub cwd: PathBuf,
    /// Application directory relative to `cwd`; empty for the root.
    pub root_directory: String,
    /// Directory receiving the two context files.
    pub output_dir: PathBuf,
}

/// Options for a prepare run.
#[derive(Debug, Clone)]
pub struct PrepareOptions {
    /// Project that owns shorthand secrets and bare VPC ids.
    pub project_id: String,

    /// Region used to expand bare connector and subnetwork ids.
    pub region: Option<String>,

    /// Environment whose overlay is merged onto the base document.
    pub environment_name: Option<String>,

    /// Base document. `None` means the backend has no configuration.
    pub document_path: Option<PathBuf>,

    /// Where the resolved document is written.
    pub document_output: PathBuf,

    /// Optional second copy of the resolved document.
    pub preprocessed_output: Option<PathBuf>,

    /// Where the build environment is written.
    pub env_output: PathBuf,

    /// Layout for `env_output`. Detected from the path when unset.
    pub env_layout: Option<EnvLayout>,

    /// Build-directory context to compute and write.
    pub build_context: Option<BuildContextTarget>,

    /// Console variables as a JSON array. `None` disables the source.
    pub console_env_json: Option<String>,

    /// Platform-provided `FIREBASE_CONFIG` blob.
    pub firebase_config: Option<String>,

    /// Platform-provided `FIREBASE_WEBAPP_CONFIG` blob.
    pub firebase_webapp_config: Option<String>,

    /// Store calls are not started after this point.
    pub deadline: Deadline,
}

impl PrepareOptions {
    /// Creates options with the required fields; everything else is unset.
    ///
    /// # Examples
    ///
    /// ```
    /// use hostprep::operations::PrepareOptions;
    ///
    /// let options = PrepareOptions::new("my-project", "out/apphosting.yaml", "out/.env")
    ///     .with_region(Some("us-central1".to_string()))
    ///     .with_environment_name(Some("staging".to_string()));
    /// assert!(options.validate().is_ok());
    /// assert!(options.document_path.is_none());
    /// ```
    #[must_use]
    pub fn new(
        project_id: impl Into<String>,
        document_output: impl Into<PathBuf>,
        env_output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            region: None,
            environment_name: None,
            document_path: None,
            document_output: document_output.into(),
            preprocessed_output: None,
            env_output: env_output.into(),
            env_layout: None,
            build_context: None,
            console_env_json: None,
            firebase_config: None,
            firebase_webapp_config: None,
            deadline: Deadline::none(),
        }
    }

    /// Sets the region.
    #[must_use]
    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    /// Sets the environment name.
    #[must_use]
    pub fn with_environment_name(mut self, environment_name: Option<String>) -> Self {
        self.environment_name = environment_name;
        self
    }

    /// Sets the base document path.
    #[must_use]
    pub fn with_document_path(mut self, document_path: Option<PathBuf>) -> Self {
        self.document_path = document_path;
        self
    }

    /// Sets the preprocessed output path.
    #[must_use]
    pub fn with_preprocessed_output(mut self, preprocessed_output: Option<PathBuf>) -> Self {
        self.preprocessed_output = preprocessed_output;
        self
    }

    /// Forces an env file layout.
    #[must_use]
    pub const fn with_env_layout(mut self, env_layout: Option<EnvLayout>) -> Self {
        self.env_layout = env_layout;
        self
    }

    /// Sets the build-directory context target.
    #[must_use]
    pub fn with_build_context(mut self, build_context: Option<BuildContextTarget>) -> Self {
        self.build_context = build_context;
        self
    }

    /// Sets the console variables JSON.
    #[must_use]
    pub fn with_console_env_json(mut self, json: Option<String>) -> Self {
        self.console_env_json = json;
        self
    }

    /// Sets the `FIREBASE_CONFIG` blob.
    #[must_use]
    pub fn with_firebase_config(mut self, config: Option<String>) -> Self {
        self.firebase_config = config;
        self
    }

    /// Sets the `FIREBASE_WEBAPP_CONFIG` blob.
    #[must_use]
    pub fn with_firebase_webapp_config(mut self, config: Option<String>) -> Self {
        self.firebase_webapp_config = config;
        self
    }

    /// Sets the deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    /// Check the options before any work starts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the project id or an output path is
    /// empty.
    pub fn validate(&self) -> Result<()> {
        if self.project_id.trim().is_empty() {
            return Err(Error::Validation {
                field: "project_id".to_string(),
                message: "project id cannot be empty".to_string(),
            });
        }
        for (field, path) in [
            ("document_output", &self.document_output),
            ("env_output", &self.env_output),
        ] {
            if path.as_os_str().is_empty() {
                return Err(Error::Validation {
                    field: field.to_string(),
                    message: "output path cannot be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    fn env_output(&self) -> EnvOutput {
        match self.env_layout {
            Some(layout) => EnvOutput {
                path: self.env_output.clone(),
                layout,
            },
            None => EnvOutput::detect(self.env_output.clone()),
        }
    }
}

/// Everything a prepare run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct PrepareOutcome {
    /// The resolved document. Secrets are pinned references, never values.
    pub config: Configuration,
    /// Plaintext build environment.
    pub build_env: BTreeMap<String, String>,
    /// Build-directory context, when requested.
    pub build_context: Option<BuildDirectoryContext>,
}

impl PrepareOutcome {
    /// Write the resolved document, its optional copy, the build environment
    /// and the build-directory context.
    ///
    /// # Errors
    ///
    /// Returns an error if any output cannot be written.
    pub fn write(&self, options: &PrepareOptions) -> Result<()> {
        write_document(&self.config, &options.document_output)?;
        if let Some(path) = &options.preprocessed_output {
            write_document(&self.config, path)?;
        }
        options.env_output().write(&self.build_env)?;
        if let (Some(context), Some(target)) = (&self.build_context, &options.build_context) {
            context.write(&target.output_dir)?;
        }
        Ok(())
    }
}

/// Resolve the configuration and build environment without writing anything.
///
/// # Errors
///
/// Returns the first failure of any stage: invalid options or documents,
/// malformed console input, improper or inaccessible secrets, an expired
/// deadline, or a missing root directory.
pub fn resolve<S: SecretStore + ?Sized>(
    options: &PrepareOptions,
    store: &S,
) -> Result<PrepareOutcome> {
    options.validate()?;

    let mut config = ConfigLoader::load_with_overlay(
        options.document_path.as_deref(),
        options.environment_name.as_deref(),
    )?;
    ConfigValidator::validate_run_config(&config.run_config)?;

    let composer = EnvComposer::new()
        .with_console_json(options.console_env_json.as_deref())?
        .with_system_config(
            options.firebase_config.as_deref(),
            options.firebase_webapp_config.as_deref(),
        );
    config.env = composer.compose(std::mem::take(&mut config.env));

    if let Some(vpc) = config.run_config.vpc_access.as_mut() {
        normalize_vpc_access(vpc, &options.project_id, options.region.as_deref());
    }

    secrets::normalize(&mut config.env, &options.project_id)?;
    pin_versions(store, &mut config.env, &options.deadline)?;
    let build_env = build_env_map(store, &config.env, &options.deadline)?;

    let build_context = options
        .build_context
        .as_ref()
        .map(|target| BuildDirectoryContext::detect(&target.cwd, &target.root_directory))
        .transpose()?;

    log::info!(
        "resolved {} environment variables, {} available at build time",
        config.env.len(),
        build_env.len()
    );
    Ok(PrepareOutcome {
        config,
        build_env,
        build_context,
    })
}

/// Resolve and write all outputs.
///
/// # Errors
///
/// Returns an error if resolution or writing fails. Nothing is written when
/// resolution fails.
///
/// # Examples
///
/// ```
/// use hostprep::operations::{prepare, PrepareOptions};
/// use hostprep::secrets::InMemorySecretStore;
/// use tempfile::TempDir;
///
/// let temp_dir = TempDir::new().unwrap();
/// let options = PrepareOptions::new(
///     "my-project",
///     temp_dir.path().join("apphosting.yaml"),
///     temp_dir.path().join(".env"),
/// );
///
/// let outcome = prepare(&options, &InMemorySecretStore::new()).unwrap();
/// assert!(outcome.build_env.is_empty());
/// assert_eq!(std::fs::read_to_string(temp_dir.path().join(".env")).unwrap(), "\n");
/// ```
pub fn prepare<S: SecretStore + ?Sized>(
    options: &PrepareOptions,
    store: &S,
) -> Result<PrepareOutcome> {
    let outcome = resolve(options, store)?;
    outcome.write(options)?;
    Ok(outcome)
}
