//! Output writers for the resolved document and the build environment.
//!
//! The build environment can be written in two layouts: a single dotenv file
//! or a directory with one file per variable. Both read back to the same
//! key/value map.

mod dotenv;
mod lifecycle;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Configuration;
use crate::error::{Error, Result};

pub use dotenv::DotenvFile;
pub use lifecycle::LifecycleDir;

/// Trait for reading and writing a build environment.
pub trait EnvFileFormat {
    /// Write `env` to the underlying location, replacing what was there.
    ///
    /// # Errors
    ///
    /// Returns an error if a key cannot be represented or the write fails.
    fn write(&self, env: &BTreeMap<String, String>) -> Result<()>;

    /// Read the environment back.
    ///
    /// # Errors
    ///
    /// Returns an error if the location cannot be read or is malformed.
    fn read(&self) -> Result<BTreeMap<String, String>>;
}

/// Available layouts for the build environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvLayout {
    /// A single `KEY=VALUE` file.
    Dotenv,
    /// A directory holding one file per variable.
    Lifecycle,
}

impl EnvLayout {
    /// Pick the layout conventionally used at `path`.
    ///
    /// # Examples
    ///
    /// ```
    /// use hostprep::output::EnvLayout;
    /// use std::path::Path;
    ///
    /// assert_eq!(EnvLayout::for_path(Path::new("/layers/app/platform/env")), EnvLayout::Lifecycle);
    /// assert_eq!(EnvLayout::for_path(Path::new("/workspace/.env")), EnvLayout::Dotenv);
    /// ```
    #[must_use]
    pub fn for_path(path: &Path) -> Self {
        if path.to_string_lossy().contains("platform/env") {
            Self::Lifecycle
        } else {
            Self::Dotenv
        }
    }

    /// Create a reader/writer for this layout at `path`.
    #[must_use]
    pub fn create_writer(self, path: &Path) -> Box<dyn EnvFileFormat> {
        match self {
            Self::Dotenv => Box::new(DotenvFile::new(path)),
            Self::Lifecycle => Box::new(LifecycleDir::new(path)),
        }
    }
}

/// Serialize `config` to `path` as YAML, creating parent directories.
///
/// An empty configuration is still written.
///
/// # Errors
///
/// Returns [`Error::Serialization`] if encoding fails and [`Error::Io`] if
/// the file cannot be written.
pub fn write_document(config: &Configuration, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(config)?;
    create_parent(path)?;
    log::debug!("writing resolved document to {}:\n{yaml}", path.display());
    fs::write(path, yaml).map_err(|e| Error::io(path, e))
}

pub(crate) fn create_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))
        }
        _ => Ok(()),
    }
}

/// Where a build environment lives and in which layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvOutput {
    /// File or directory path.
    pub path: PathBuf,
    /// Layout to use.
    pub layout: EnvLayout,
}

impl EnvOutput {
    /// An output at `path` using the layout conventional for it.
    #[must_use]
    pub fn detect(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let layout = EnvLayout::for_path(&path);
        Self { path, layout }
    }

    /// Write `env` in the chosen layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the layout writer fails.
    pub fn write(&self, env: &BTreeMap<String, String>) -> Result<()> {
        log::debug!(
            "writing {} build variables to {} ({:?})",
            env.len(),
            self.path.display(),
            self.layout
        );
        self.layout.create_writer(&self.path).write(env)
    }
}
