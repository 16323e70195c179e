//! Directory layout: one file per variable.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::EnvFileFormat;

/// A directory where each file name is a variable and its contents the
/// value, byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleDir {
    dir: PathBuf,
}

impl LifecycleDir {
    /// A directory layout rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory location.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key == "." || key == ".." || key.contains(['/', '\\']) {
            return Err(Error::Validation {
                field: "env".to_string(),
                message: format!("'{key}' cannot be used as a file name"),
            });
        }
        Ok(self.dir.join(key))
    }
}

impl EnvFileFormat for LifecycleDir {
    fn write(&self, env: &BTreeMap<String, String>) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        for (key, value) in env {
            let path = self.file_for(key)?;
            fs::write(&path, value).map_err(|e| Error::io(&path, e))?;
        }
        Ok(())
    }

    fn read(&self) -> Result<BTreeMap<String, String>> {
        let mut env = BTreeMap::new();
        let entries = fs::read_dir(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&self.dir, e))?;
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            let bytes = fs::read(&path).map_err(|e| Error::io(&path, e))?;
            env.insert(
                entry.file_name().to_string_lossy().into_owned(),
                String::from_utf8_lossy(&bytes).into_owned(),
            );
        }
        Ok(env)
    }
}
