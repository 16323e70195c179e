//! Materializing the build-time environment.

use std::collections::BTreeMap;

use crate::config::{Availability, EnvironmentVariable};
use crate::error::{Error, Result};
use crate::secrets::reference::SecretReference;
use crate::secrets::store::{SecretPayload, SecretStore};
use crate::secrets::{store_error, Deadline};

const STAGE: &str = "secret dereferencing";

/// Check a payload against the checksum the store sent with it.
///
/// # Errors
///
/// Returns [`Error::ChecksumMismatch`] if the checksum differs or is absent.
pub fn verify_checksum(secret: &str, payload: &SecretPayload) -> Result<()> {
    match payload.crc32c {
        Some(expected) if expected == crc32c::crc32c(&payload.data) => Ok(()),
        _ => Err(Error::ChecksumMismatch {
            secret: secret.to_string(),
        }),
    }
}

/// Build the plaintext environment for the build step.
///
/// Only variables available at build time are included. Literal values are
/// copied; secrets are fetched at their (pinned) version, checksum-verified
/// and decoded as UTF-8, replacing invalid sequences.
///
/// # Errors
///
/// - [`Error::ChecksumMismatch`] if a payload fails verification
/// - [`Error::MisconfiguredSecret`] if a secret is missing or inaccessible
/// - [`Error::Cancelled`] if the deadline passes or the store cancels
/// - [`Error::SecretStore`] for other store failures
///
/// # Examples
///
/// ```
/// use hostprep::config::{Availability, EnvironmentVariable};
/// use hostprep::secrets::{build_env_map, Deadline, InMemorySecretStore};
///
/// let store = InMemorySecretStore::new().with_version("projects/p/secrets/api-key", 1, "s3cr3t");
/// let env = vec![
///     EnvironmentVariable::literal("API_URL", "api.service.com", Some(&[Availability::Build])),
///     EnvironmentVariable::secret_ref(
///         "API_KEY",
///         "projects/p/secrets/api-key/versions/1",
///         Some(&[Availability::Build]),
///     ),
///     EnvironmentVariable::literal("RUNTIME_ONLY", "x", Some(&[Availability::Runtime])),
/// ];
///
/// let map = build_env_map(&store, &env, &Deadline::none()).unwrap();
/// assert_eq!(map["API_KEY"], "s3cr3t");
/// assert!(!map.contains_key("RUNTIME_ONLY"));
/// ```
pub fn build_env_map<S: SecretStore + ?Sized>(
    store: &S,
    env: &[EnvironmentVariable],
    deadline: &Deadline,
) -> Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();

    for var in env.iter().filter(|v| v.is_available_at(Availability::Build)) {
        if let Some(value) = var.literal_value() {
            map.insert(var.variable.clone(), value.to_string());
            continue;
        }
        let Some(secret) = var.secret_reference() else {
            continue;
        };

        let reference: SecretReference =
            secret.parse().map_err(|_| Error::ImproperSecretFormat {
                variable: var.variable.clone(),
                secret: secret.to_string(),
            })?;

        deadline.check(STAGE)?;
        let payload = store
            .access_payload(&reference.name, &reference.version)
            .map_err(|e| store_error(secret, STAGE, e))?;
        verify_checksum(secret, &payload)?;
        log::info!("accessed secret {reference} for the rest of the current build");

        map.insert(
            var.variable.clone(),
            String::from_utf8_lossy(&payload.data).into_owned(),
        );
    }

    Ok(map)
}
