//! Error types for the hostprep library.
//!
//! Every failure is classified as either user-attributable (the configuration,
//! secret references or backend layout need fixing) or internal (retry or
//! escalate). The classification, a stable machine-readable code and a
//! remediation message are available through [`Error::report`].

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::secrets::SecretStoreError;

/// Result type alias for operations that may fail with a hostprep error.
///
/// # Examples
///
/// ```
/// use hostprep::{Error, Result};
///
/// fn example_operation() -> Result<u32> {
///     Ok(512)
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

const GENERIC_USER_MESSAGE: &str = "Your build failed due to a misconfiguration. Please check the raw log and build logs for more context about your build error.";
const GENERIC_INTERNAL_MESSAGE: &str = "Your build failed. Please check the raw log and build logs for more context about your build error.";

/// The main error type for the hostprep library.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration document could not be decoded or failed validation.
    #[error("invalid configuration document {}: {message}", path.display())]
    InvalidDocument {
        /// The document that was rejected.
        path: PathBuf,
        /// The decoder or validator message.
        message: String,
    },

    /// A validation error occurred.
    #[error("validation error for '{field}': {message}")]
    Validation {
        /// The field that failed validation.
        field: String,
        /// A description of the validation failure.
        message: String,
    },

    /// A secret reference did not match any accepted form.
    #[error("invalid secret format for {variable}: '{secret}'")]
    ImproperSecretFormat {
        /// The environment variable holding the reference.
        variable: String,
        /// The reference as written by the user.
        secret: String,
    },

    /// The secret store reported the secret missing or inaccessible.
    #[error("resolving secret {secret}: {source}")]
    MisconfiguredSecret {
        /// The secret reference being resolved.
        secret: String,
        /// The store's answer.
        #[source]
        source: SecretStoreError,
    },

    /// The backend root directory does not exist.
    #[error("invalid root directory {}: {reason}", path.display())]
    InvalidRootDirectory {
        /// The directory that was expected to exist.
        path: PathBuf,
        /// Why it was rejected.
        reason: String,
    },

    /// A line in a dotenv file had no `=` separator.
    #[error("invalid line format in environment file: {line}")]
    InvalidEnvFile {
        /// The offending line.
        line: String,
    },

    /// The secret store failed for a reason unrelated to the configuration.
    #[error("secret store failure for {secret}: {source}")]
    SecretStore {
        /// The secret reference being resolved.
        secret: String,
        /// The underlying transport error.
        #[source]
        source: SecretStoreError,
    },

    /// A secret payload did not match the checksum supplied with it.
    #[error("data corruption detected while accessing secret {secret}")]
    ChecksumMismatch {
        /// The secret version that was accessed.
        secret: String,
    },

    /// The run was cancelled or its deadline passed.
    #[error("cancelled during {stage}")]
    Cancelled {
        /// The pipeline stage that observed the cancellation.
        stage: String,
    },

    /// A platform-provided input could not be decoded.
    #[error("invalid server-provided {input}: {message}")]
    InvalidServerInput {
        /// Which input was malformed.
        input: String,
        /// Decoder message.
        message: String,
    },

    /// An I/O error occurred.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The path being read or written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A document could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),
}

/// Machine-readable summary of an [`Error`], suitable for build tooling.
///
/// # Examples
///
/// ```
/// use hostprep::Error;
///
/// let err = Error::ChecksumMismatch { secret: "projects/p/secrets/s/versions/1".into() };
/// let report = err.report();
/// assert_eq!(report.code, "hostprep/other");
/// assert!(!report.is_user_attributed);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    /// Short human-readable category.
    pub reason: String,
    /// Stable error code.
    pub code: String,
    /// Remediation guidance.
    pub user_facing_message: String,
    /// The underlying error text.
    pub raw_log: String,
    /// Whether the user can fix this by changing their configuration.
    pub is_user_attributed: bool,
}

impl Error {
    /// Build an [`Error::Io`] for `path`.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Whether the failure is caused by the user's configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use hostprep::Error;
    ///
    /// let err = Error::ImproperSecretFormat { variable: "API_KEY".into(), secret: "a/b".into() };
    /// assert!(err.is_user_attributable());
    /// ```
    #[must_use]
    pub fn is_user_attributable(&self) -> bool {
        matches!(
            self,
            Self::InvalidDocument { .. }
                | Self::Validation { .. }
                | Self::ImproperSecretFormat { .. }
                | Self::MisconfiguredSecret { .. }
                | Self::InvalidRootDirectory { .. }
                | Self::InvalidEnvFile { .. }
        )
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidDocument { .. } => "hostprep/invalid-config-yaml",
            Self::Validation { .. } => "hostprep/invalid-config",
            Self::ImproperSecretFormat { .. } => "hostprep/improper-secret-format",
            Self::MisconfiguredSecret { .. } => "hostprep/misconfigured-secret",
            Self::InvalidRootDirectory { .. } => "hostprep/invalid-root-directory",
            _ => "hostprep/other",
        }
    }

    /// Short human-readable category.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidDocument { .. } => "Invalid Configuration Document",
            Self::Validation { .. } => "Invalid Configuration",
            Self::ImproperSecretFormat { .. } => "Improper Secret Format",
            Self::MisconfiguredSecret { .. } => "Misconfigured Secret",
            Self::InvalidRootDirectory { .. } => "Invalid Root Directory",
            _ => "Other Reason",
        }
    }

    /// Remediation guidance for the user. Internal errors get a generic message.
    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self {
            Self::InvalidDocument { path, .. } => format!(
                "Your configuration file at path '{}' is not formatted properly. Fix the field named in the raw log and redeploy.",
                path.display()
            ),
            Self::Validation { field, .. } => format!(
                "The value of '{field}' in your configuration is not allowed. Fix the value named in the raw log and redeploy."
            ),
            Self::ImproperSecretFormat { secret, .. } => format!(
                "Your secret '{secret}' is not formatted properly. Use 'name', 'name@version', '@version', 'projects/<project>/secrets/<name>' or 'projects/<project>/secrets/<name>/versions/<version>'."
            ),
            Self::MisconfiguredSecret { secret, .. } => format!(
                "Error resolving secret version with name={secret}. Please ensure the secret exists in your project and that your backend has been granted access to it."
            ),
            Self::InvalidRootDirectory { path, .. } => format!(
                "Invalid root directory specified. No buildable app found rooted at '{}'. Configure your root directory to point to the root of the target application.",
                path.display()
            ),
            Self::InvalidEnvFile { .. } => GENERIC_USER_MESSAGE.to_string(),
            _ => GENERIC_INTERNAL_MESSAGE.to_string(),
        }
    }

    /// Summarize the error for build tooling.
    #[must_use]
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            reason: self.reason().to_string(),
            code: self.code().to_string(),
            user_facing_message: self.user_facing_message(),
            raw_log: self.to_string(),
            is_user_attributed: self.is_user_attributable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_document_error() {
        let err = Error::InvalidDocument {
            path: PathBuf::from("/workspace/apphosting.yaml"),
            message: "unknown field `cpus`".to_string(),
        };
        let display = format!("{err}");
        assert!(display.contains("invalid configuration document"));
        assert!(display.contains("apphosting.yaml"));
        assert!(display.contains("cpus"));
        assert!(err.is_user_attributable());
        assert_eq!(err.code(), "hostprep/invalid-config-yaml");
    }

    #[test]
    fn test_validation_error() {
        let err = Error::Validation {
            field: "runConfig.cpu".to_string(),
            message: "invalid value 3".to_string(),
        };
        let display = format!("{err}");
        assert!(display.contains("validation error"));
        assert!(display.contains("runConfig.cpu"));
        assert!(err.user_facing_message().contains("runConfig.cpu"));
    }

    #[test]
    fn test_misconfigured_secret_is_user_error() {
        let err = Error::MisconfiguredSecret {
            secret: "projects/p/secrets/s/versions/latest".to_string(),
            source: SecretStoreError::PermissionDenied {
                name: "projects/p/secrets/s".to_string(),
            },
        };
        assert!(err.is_user_attributable());
        assert_eq!(err.code(), "hostprep/misconfigured-secret");
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn test_checksum_mismatch_is_internal() {
        let err = Error::ChecksumMismatch {
            secret: "projects/p/secrets/s/versions/3".to_string(),
        };
        assert!(!err.is_user_attributable());
        assert_eq!(err.reason(), "Other Reason");
        assert_eq!(err.user_facing_message(), GENERIC_INTERNAL_MESSAGE);
    }

    #[test]
    fn test_transport_failure_is_internal() {
        let err = Error::SecretStore {
            secret: "projects/p/secrets/s/versions/3".to_string(),
            source: SecretStoreError::Transport {
                message: "connection reset".to_string(),
            },
        };
        assert!(!err.is_user_attributable());
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_io_error_helper() {
        let err = Error::io(
            "/out/env",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        );
        let display = format!("{err}");
        assert!(display.contains("I/O error"));
        assert!(display.contains("read-only"));
        assert!(!err.is_user_attributable());
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let err = Error::ImproperSecretFormat {
            variable: "API_KEY".to_string(),
            secret: "projects/p".to_string(),
        };
        let json = serde_json::to_value(err.report()).unwrap();
        assert_eq!(json["code"], "hostprep/improper-secret-format");
        assert_eq!(json["isUserAttributed"], true);
        assert!(json["userFacingMessage"]
            .as_str()
            .unwrap()
            .contains("projects/p"));
        assert!(json["rawLog"].as_str().unwrap().contains("API_KEY"));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<u16> {
            Err(Error::Cancelled {
                stage: "pinning".to_string(),
            })
        }

        assert!(returns_result().is_err());
    }
}
