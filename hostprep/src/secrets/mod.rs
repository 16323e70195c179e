//! Secret references: normalization, version pinning and build-time
//! dereferencing.
//!
//! The pipeline runs in three steps over the composed variable list:
//!
//! 1. [`normalize`] rewrites every reference to
//!    `projects/<p>/secrets/<s>/versions/<v>`
//! 2. [`pin_versions`] replaces `latest` with the store's current version
//!    so build and runtime see the same material
//! 3. [`build_env_map`] fetches build-visible secrets and returns the
//!    plaintext build environment
//!
//! Only step 3 handles plaintext, and its output is never written back into
//! the resolved document.

pub mod dereference;
pub mod pin;
pub mod reference;
pub mod store;

use std::time::{Duration, Instant};

use crate::error::{Error, Result};

pub use dereference::{build_env_map, verify_checksum};
pub use pin::pin_versions;
pub use reference::{normalize, InvalidReferenceError, SecretName, SecretReference, LATEST};
pub use store::{InMemorySecretStore, SecretPayload, SecretStore, SecretStoreError};

/// An optional point in time after which store calls are not started.
///
/// # Examples
///
/// ```
/// use hostprep::secrets::Deadline;
/// use std::time::Duration;
///
/// assert!(Deadline::none().check("pinning").is_ok());
/// assert!(Deadline::after(Duration::ZERO).check("pinning").is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// No deadline.
    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }

    /// A deadline `timeout` from now.
    #[must_use]
    pub fn after(timeout: Duration) -> Self {
        Self(Some(Instant::now() + timeout))
    }

    /// A deadline at `instant`.
    #[must_use]
    pub const fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    /// Whether the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.0.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Fail with [`Error::Cancelled`] if the deadline has passed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] naming `stage`.
    pub fn check(&self, stage: &str) -> Result<()> {
        if self.is_expired() {
            log::warn!("deadline exceeded during {stage}");
            return Err(Error::Cancelled {
                stage: stage.to_string(),
            });
        }
        Ok(())
    }
}

/// Classify a store failure for `reference`.
pub(crate) fn store_error(reference: &str, stage: &str, source: SecretStoreError) -> Error {
    match source {
        SecretStoreError::Cancelled => Error::Cancelled {
            stage: stage.to_string(),
        },
        source if source.is_user_attributable() => Error::MisconfiguredSecret {
            secret: reference.to_string(),
            source,
        },
        source => Error::SecretStore {
            secret: reference.to_string(),
            source,
        },
    }
}
