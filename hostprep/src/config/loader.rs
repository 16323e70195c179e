//! Configuration document discovery and loading.
//!
//! Documents are decoded, validated and attributed to their file in one step,
//! so a failing document is rejected as a whole.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::config::merger::ConfigMerger;
use crate::config::schema::{Configuration, Provenance};
use crate::config::validator::ConfigValidator;
use crate::error::{Error, Result};

/// File name of the base configuration document.
pub const BASE_DOCUMENT: &str = "apphosting.yaml";

fn document_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^apphosting(\.[a-z0-9_]+)?\.yaml$").expect("document name pattern is valid")
    })
}

/// Loads configuration documents.
///
/// # Examples
///
/// ```no_run
/// use hostprep::config::ConfigLoader;
/// use std::path::Path;
///
/// let config = ConfigLoader::load_with_overlay(Some(Path::new("apphosting.yaml")), Some("staging")).unwrap();
/// println!("{} environment variables", config.env.len());
/// ```
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load, validate and attribute a document.
    ///
    /// A missing file yields an empty configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDocument`] if the file cannot be decoded or
    /// fails validation, and [`Error::Io`] if it exists but cannot be read.
    pub fn load_file(path: &Path) -> Result<Configuration> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("{} not found, using an empty configuration", path.display());
                return Ok(Configuration::default());
            }
            Err(e) => return Err(Error::io(path, e)),
        };

        let mut config = Self::parse(&contents, path)?;
        let provenance = Provenance::File(Self::file_name(path));
        for var in &mut config.env {
            var.source = provenance.clone();
        }
        Ok(config)
    }

    /// Decode and validate document text. `path` is used for error messages.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDocument`] on decode or validation failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use hostprep::config::ConfigLoader;
    /// use std::path::Path;
    ///
    /// let config = ConfigLoader::parse("runConfig:\n  minInstances: 1\n", Path::new("apphosting.yaml")).unwrap();
    /// assert_eq!(config.run_config.min_instances, Some(1));
    ///
    /// assert!(ConfigLoader::parse("runConfig:\n  cpu: 3\n", Path::new("apphosting.yaml")).is_err());
    /// ```
    pub fn parse(contents: &str, path: &Path) -> Result<Configuration> {
        if Self::is_blank(contents) {
            return Ok(Configuration::default());
        }

        let invalid = |message: String| Error::InvalidDocument {
            path: path.to_path_buf(),
            message,
        };

        let config: Configuration =
            serde_yaml::from_str(contents).map_err(|e| invalid(e.to_string()))?;
        ConfigValidator::validate(&config).map_err(|e| invalid(e.to_string()))?;
        Ok(config)
    }

    fn is_blank(contents: &str) -> bool {
        contents.lines().all(|line| {
            let line = line.trim();
            line.is_empty() || line.starts_with('#') || line == "---"
        })
    }

    fn file_name(path: &Path) -> String {
        path.file_name().map_or_else(
            || path.display().to_string(),
            |name| name.to_string_lossy().into_owned(),
        )
    }

    /// Path of the overlay for `environment` next to `base_path`.
    ///
    /// # Examples
    ///
    /// ```
    /// use hostprep::config::ConfigLoader;
    /// use std::path::{Path, PathBuf};
    ///
    /// assert_eq!(
    ///     ConfigLoader::overlay_path(Path::new("/workspace/apphosting.yaml"), "staging"),
    ///     PathBuf::from("/workspace/apphosting.staging.yaml")
    /// );
    /// ```
    #[must_use]
    pub fn overlay_path(base_path: &Path, environment: &str) -> PathBuf {
        let dir = base_path.parent().unwrap_or_else(|| Path::new(""));
        dir.join(format!("apphosting.{environment}.yaml"))
    }

    fn validate_environment_name(environment: &str) -> Result<()> {
        if environment.contains(['/', '\\']) || environment.contains("..") {
            return Err(Error::Validation {
                field: "environmentName".to_string(),
                message: format!(
                    "environment name {environment:?} must not contain path separators or '..'"
                ),
            });
        }
        Ok(())
    }

    /// Merge the environment overlay next to `base_path` into `config`.
    ///
    /// An empty environment name or a missing overlay leaves `config`
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the environment name could point
    /// outside the document's directory, or an error if the overlay exists
    /// but is invalid.
    pub fn merge_environment_overlay(
        config: &mut Configuration,
        base_path: &Path,
        environment: &str,
    ) -> Result<()> {
        if environment.is_empty() {
            return Ok(());
        }
        Self::validate_environment_name(environment)?;

        let overlay_path = Self::overlay_path(base_path, environment);
        if !overlay_path.exists() {
            log::debug!(
                "no overlay for environment {environment} at {}",
                overlay_path.display()
            );
            return Ok(());
        }

        let overlay = Self::load_file(&overlay_path)?;
        log::info!("merging {} onto {}", overlay_path.display(), base_path.display());
        ConfigMerger::merge_into(config, &overlay);
        Ok(())
    }

    /// Load the base document (if any) with its environment overlay applied.
    ///
    /// # Errors
    ///
    /// Returns an error if either document is invalid.
    pub fn load_with_overlay(
        base_path: Option<&Path>,
        environment: Option<&str>,
    ) -> Result<Configuration> {
        let Some(base_path) = base_path else {
            return Ok(Configuration::default());
        };

        let mut config = Self::load_file(base_path)?;
        if let Some(environment) = environment {
            Self::merge_environment_overlay(&mut config, base_path, environment)?;
        }
        Ok(config)
    }

    /// Locate the base document for a backend.
    ///
    /// Walks up from `workspace/backend_root` until a directory holds any
    /// `apphosting*.yaml` file and returns that directory's `apphosting.yaml`
    /// path (which may itself be absent when only an overlay exists).
    /// Returns `None` when no directory qualifies.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRootDirectory`] if the backend root does not
    /// exist, and [`Error::Io`] if a directory cannot be listed.
    pub fn detect_document_path(workspace: &Path, backend_root: &str) -> Result<Option<PathBuf>> {
        let root = workspace.join(backend_root);
        if let Err(e) = fs::metadata(&root) {
            return Err(Error::InvalidRootDirectory {
                path: root,
                reason: e.to_string(),
            });
        }

        let mut current = root;
        loop {
            if Self::has_document(&current)? {
                log::debug!("found configuration root {}", current.display());
                return Ok(Some(current.join(BASE_DOCUMENT)));
            }
            if !current.pop() || current.as_os_str().is_empty() {
                return Ok(None);
            }
        }
    }

    fn has_document(dir: &Path) -> Result<bool> {
        let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(dir, e))?;
            if document_name().is_match(&entry.file_name().to_string_lossy()) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
