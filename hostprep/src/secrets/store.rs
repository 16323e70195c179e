//! The secret store capability and a local implementation.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::error::{Error, Result};
use crate::secrets::reference::{SecretName, LATEST};

/// Failure reported by a secret store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretStoreError {
    /// The secret or version does not exist.
    #[error("secret {name} not found")]
    NotFound {
        /// Secret or version name.
        name: String,
    },

    /// The caller may not read the secret.
    #[error("permission denied on secret {name}")]
    PermissionDenied {
        /// Secret name.
        name: String,
    },

    /// The request was cancelled.
    #[error("request cancelled")]
    Cancelled,

    /// Any other failure talking to the store.
    #[error("transport failure: {message}")]
    Transport {
        /// Description from the transport.
        message: String,
    },
}

impl SecretStoreError {
    /// Whether the user can fix this by creating the secret or granting access.
    #[must_use]
    pub fn is_user_attributable(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::PermissionDenied { .. })
    }
}

/// Secret bytes and the checksum the store computed for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretPayload {
    /// Raw secret material.
    pub data: Vec<u8>,
    /// CRC32C of `data` as reported by the store.
    pub crc32c: Option<u32>,
}

impl SecretPayload {
    /// A payload with a correct checksum.
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        let crc32c = crc32c::crc32c(&data);
        Self {
            data,
            crc32c: Some(crc32c),
        }
    }
}

/// A store holding versioned secrets.
///
/// Implementations must be safe to call repeatedly; callers issue one
/// request at a time.
pub trait SecretStore {
    /// The newest enabled version number of `name`.
    ///
    /// # Errors
    ///
    /// Returns a [`SecretStoreError`] if the secret is missing, inaccessible
    /// or the store cannot be reached.
    fn resolve_latest_version(&self, name: &SecretName) -> std::result::Result<u64, SecretStoreError>;

    /// The payload of `name` at `version` (a number or `latest`).
    ///
    /// # Errors
    ///
    /// Returns a [`SecretStoreError`] if the version is missing, disabled,
    /// inaccessible or the store cannot be reached.
    fn access_payload(
        &self,
        name: &SecretName,
        version: &str,
    ) -> std::result::Result<SecretPayload, SecretStoreError>;
}

#[derive(Debug, Clone)]
struct StoredVersion {
    data: Vec<u8>,
    enabled: bool,
}

#[derive(Debug, Clone, Default)]
struct StoredSecret {
    versions: BTreeMap<u64, StoredVersion>,
    denied: bool,
    corrupt: bool,
}

/// A secret store held in memory.
///
/// Used for local runs and tests. Secrets are keyed by their
/// `projects/<p>/secrets/<s>` name.
///
/// # Examples
///
/// ```
/// use hostprep::secrets::{InMemorySecretStore, SecretName, SecretStore};
///
/// let store = InMemorySecretStore::new()
///     .with_version("projects/p/secrets/api-key", 1, "old")
///     .with_version("projects/p/secrets/api-key", 2, "new");
///
/// let name = SecretName::new("p", "api-key");
/// assert_eq!(store.resolve_latest_version(&name).unwrap(), 2);
/// assert_eq!(store.access_payload(&name, "1").unwrap().data, b"old");
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemorySecretStore {
    secrets: BTreeMap<String, StoredSecret>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SecretsFile {
    #[serde(default)]
    secrets: BTreeMap<String, SecretEntry>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SecretEntry {
    #[serde(default)]
    versions: BTreeMap<u64, String>,
    #[serde(default)]
    disabled: Vec<u64>,
    #[serde(default)]
    denied: bool,
}

impl InMemorySecretStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an enabled version.
    #[must_use]
    pub fn with_version(mut self, name: &str, version: u64, data: impl Into<Vec<u8>>) -> Self {
        self.secrets.entry(name.to_string()).or_default().versions.insert(
            version,
            StoredVersion {
                data: data.into(),
                enabled: true,
            },
        );
        self
    }

    /// Add a disabled version. Disabled versions are never `latest` and
    /// cannot be accessed.
    #[must_use]
    pub fn with_disabled_version(
        mut self,
        name: &str,
        version: u64,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        self.secrets.entry(name.to_string()).or_default().versions.insert(
            version,
            StoredVersion {
                data: data.into(),
                enabled: false,
            },
        );
        self
    }

    /// Deny every request for `name`.
    #[must_use]
    pub fn with_denied_secret(mut self, name: &str) -> Self {
        self.secrets.entry(name.to_string()).or_default().denied = true;
        self
    }

    /// Report a wrong checksum for every payload of `name`.
    #[must_use]
    pub fn with_corrupted_checksum(mut self, name: &str) -> Self {
        self.secrets.entry(name.to_string()).or_default().corrupt = true;
        self
    }

    /// Load a store from a YAML file.
    ///
    /// ```yaml
    /// secrets:
    ///   projects/my-project/secrets/api-key:
    ///     versions:
    ///       1: old-key
    ///       2: new-key
    ///     disabled: [1]
    ///   projects/my-project/secrets/locked:
    ///     denied: true
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read and
    /// [`Error::InvalidDocument`] if it is malformed.
    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let file: SecretsFile =
            serde_yaml::from_str(&contents).map_err(|e| Error::InvalidDocument {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let mut store = Self::new();
        for (name, entry) in file.secrets {
            let secret = store.secrets.entry(name).or_default();
            secret.denied = entry.denied;
            for (version, data) in entry.versions {
                secret.versions.insert(
                    version,
                    StoredVersion {
                        data: data.into_bytes(),
                        enabled: !entry.disabled.contains(&version),
                    },
                );
            }
        }
        log::debug!("loaded {} secrets from {}", store.secrets.len(), path.display());
        Ok(store)
    }

    fn lookup(&self, name: &SecretName) -> std::result::Result<&StoredSecret, SecretStoreError> {
        let key = name.to_string();
        let secret = self
            .secrets
            .get(&key)
            .ok_or_else(|| SecretStoreError::NotFound { name: key.clone() })?;
        if secret.denied {
            return Err(SecretStoreError::PermissionDenied { name: key });
        }
        Ok(secret)
    }

    fn latest(secret: &StoredSecret) -> Option<u64> {
        secret
            .versions
            .iter()
            .rev()
            .find(|(_, v)| v.enabled)
            .map(|(n, _)| *n)
    }
}

impl SecretStore for InMemorySecretStore {
    fn resolve_latest_version(&self, name: &SecretName) -> std::result::Result<u64, SecretStoreError> {
        let secret = self.lookup(name)?;
        Self::latest(secret).ok_or_else(|| SecretStoreError::NotFound {
            name: format!("{name}/versions/{LATEST}"),
        })
    }

    fn access_payload(
        &self,
        name: &SecretName,
        version: &str,
    ) -> std::result::Result<SecretPayload, SecretStoreError> {
        let secret = self.lookup(name)?;
        let not_found = || SecretStoreError::NotFound {
            name: format!("{name}/versions/{version}"),
        };

        let number = if version == LATEST {
            Self::latest(secret).ok_or_else(not_found)?
        } else {
            version.parse::<u64>().map_err(|_| not_found())?
        };

        let stored = secret
            .versions
            .get(&number)
            .filter(|v| v.enabled)
            .ok_or_else(not_found)?;

        let mut payload = SecretPayload::new(stored.data.clone());
        if secret.corrupt {
            payload.crc32c = payload.crc32c.map(|c| !c);
        }
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const NAME: &str = "projects/p/secrets/api-key";

    fn name() -> SecretName {
        SecretName::new("p", "api-key")
    }

    #[test]
    fn test_latest_skips_disabled() {
        let store = InMemorySecretStore::new()
            .with_version(NAME, 1, "one")
            .with_version(NAME, 2, "two")
            .with_disabled_version(NAME, 3, "three");
        assert_eq!(store.resolve_latest_version(&name()).unwrap(), 2);
        assert_eq!(store.access_payload(&name(), "latest").unwrap().data, b"two");
    }

    #[test]
    fn test_disabled_version_not_accessible() {
        let store = InMemorySecretStore::new().with_disabled_version(NAME, 1, "x");
        assert!(matches!(
            store.access_payload(&name(), "1"),
            Err(SecretStoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.resolve_latest_version(&name()),
            Err(SecretStoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_missing_and_denied() {
        let store = InMemorySecretStore::new().with_denied_secret(NAME);
        let err = store.resolve_latest_version(&name()).unwrap_err();
        assert_eq!(
            err,
            SecretStoreError::PermissionDenied {
                name: NAME.to_string()
            }
        );
        assert!(err.is_user_attributable());

        let missing = SecretName::new("p", "missing");
        assert!(store.resolve_latest_version(&missing).unwrap_err().is_user_attributable());
        assert!(store.access_payload(&name(), "bogus").is_err());
    }

    #[test]
    fn test_checksum() {
        let store = InMemorySecretStore::new().with_version(NAME, 1, "secret");
        let payload = store.access_payload(&name(), "1").unwrap();
        assert_eq!(payload.crc32c, Some(crc32c::crc32c(b"secret")));

        let corrupt = store.with_corrupted_checksum(NAME);
        let payload = corrupt.access_payload(&name(), "1").unwrap();
        assert_ne!(payload.crc32c, Some(crc32c::crc32c(b"secret")));
    }

    #[test]
    fn test_transport_errors_are_internal() {
        assert!(!SecretStoreError::Cancelled.is_user_attributable());
        assert!(!SecretStoreError::Transport {
            message: "unavailable".to_string()
        }
        .is_user_attributable());
    }

    #[test]
    fn test_load_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("secrets.yaml");
        fs::write(
            &path,
            "secrets:\n  projects/p/secrets/api-key:\n    versions:\n      1: old-key\n      2: new-key\n    disabled: [2]\n  projects/p/secrets/locked:\n    denied: true\n",
        )
        .unwrap();

        let store = InMemorySecretStore::load_file(&path).unwrap();
        assert_eq!(store.resolve_latest_version(&name()).unwrap(), 1);
        assert_eq!(
            store.access_payload(&name(), "1").unwrap().data,
            b"old-key".to_vec()
        );
        assert!(matches!(
            store.resolve_latest_version(&SecretName::new("p", "locked")),
            Err(SecretStoreError::PermissionDenied { .. })
        ));
    }

    #[test]
    fn test_load_file_errors() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.yaml");
        assert!(matches!(
            InMemorySecretStore::load_file(&missing),
            Err(Error::Io { .. })
        ));

        let bad = temp_dir.path().join("bad.yaml");
        fs::write(&bad, "secrets: [1, 2]\n").unwrap();
        assert!(matches!(
            InMemorySecretStore::load_file(&bad),
            Err(Error::InvalidDocument { .. })
        ));
    }
}
