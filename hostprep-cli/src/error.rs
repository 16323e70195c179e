//! CLI-specific error types with exit codes.
//!
//! This module defines error types specific to the CLI layer,
//! wrapping library errors and providing appropriate exit codes.

use std::fmt;

use hostprep::{Error as LibError, ErrorReport};

/// CLI-specific error type with exit code mapping.
#[derive(Debug)]
pub enum CliError {
    /// Library error (wrapped).
    Library(LibError),

    /// Invalid command-line arguments.
    InvalidArguments(String),

    /// I/O error.
    Io(std::io::Error),
}

impl CliError {
    /// Get the appropriate exit code for this error.
    ///
    /// Exit codes:
    /// - 0: Success (not an error)
    /// - 1: Internal failure
    /// - 4: Invalid arguments
    /// - 100: A configuration problem the user can fix
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Library(e) if e.is_user_attributable() => 100,
            CliError::Library(_) | CliError::Io(_) => 1,
            CliError::InvalidArguments(_) => 4,
        }
    }

    /// Structured report for library failures.
    pub fn report(&self) -> Option<ErrorReport> {
        match self {
            CliError::Library(e) => Some(e.report()),
            _ => None,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Library(e) => write!(f, "{e}"),
            CliError::InvalidArguments(msg) => write!(f, "Invalid arguments: {msg}"),
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Library(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::InvalidArguments(_) => None,
        }
    }
}

impl From<LibError> for CliError {
    fn from(e: LibError) -> Self {
        CliError::Library(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}
