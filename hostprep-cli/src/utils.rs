//! Utility functions for CLI operations.
//!
//! This module provides helpers shared across CLI commands: document
//! discovery, secret store loading and deadline handling.

use crate::error::CliError;
use hostprep::config::ConfigLoader;
use hostprep::{Deadline, InMemorySecretStore};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Global CLI options shared across all commands.
#[derive(Debug, Clone)]
#[allow(dead_code)] // verbose is consumed by the logger before dispatch
pub struct GlobalOptions {
    /// Enable verbose output.
    pub verbose: bool,

    /// Suppress non-essential output.
    pub quiet: bool,
}

/// Make the workspace path absolute, following symlinks.
///
/// Build-context paths are computed relative to this directory, so it has
/// to exist.
pub fn resolve_workspace(path: &Path) -> Result<PathBuf, CliError> {
    std::fs::canonicalize(path).map_err(|e| {
        CliError::InvalidArguments(format!("Workspace not found: {} ({e})", path.display()))
    })
}

/// Pick the base document for a run.
///
/// An explicit path wins. Otherwise the document is discovered by walking up
/// from `backend_root` inside `workspace`; `None` means the backend has no
/// configuration at all.
pub fn resolve_document_path(
    explicit: Option<PathBuf>,
    workspace: &Path,
    backend_root: &str,
) -> Result<Option<PathBuf>, CliError> {
    if let Some(path) = explicit {
        return Ok(Some(path));
    }
    let found = ConfigLoader::detect_document_path(workspace, backend_root)?;
    if found.is_none() {
        log::info!(
            "no configuration found under {}, continuing with defaults",
            workspace.join(backend_root).display()
        );
    }
    Ok(found)
}

/// Load the secret store backing a run.
///
/// Without a file the store is empty, so only documents that reference no
/// secrets resolve.
pub fn load_secret_store(path: Option<&Path>) -> Result<InMemorySecretStore, CliError> {
    match path {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::InvalidArguments(format!(
                    "Secrets file not found: {}",
                    path.display()
                )));
            }
            Ok(InMemorySecretStore::load_file(path)?)
        }
        None => Ok(InMemorySecretStore::new()),
    }
}

/// Convert a `--timeout-seconds` value into a deadline.
pub fn deadline_from_seconds(seconds: Option<u64>) -> Result<Deadline, CliError> {
    match seconds {
        Some(0) => Err(CliError::InvalidArguments(
            "--timeout-seconds must be greater than zero".to_string(),
        )),
        Some(seconds) => Ok(Deadline::after(Duration::from_secs(seconds))),
        None => Ok(Deadline::none()),
    }
}
