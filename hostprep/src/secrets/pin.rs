//! Pinning `latest` secret references to concrete versions.

use std::collections::BTreeMap;

use crate::config::EnvironmentVariable;
use crate::error::{Error, Result};
use crate::secrets::reference::{SecretName, SecretReference};
use crate::secrets::store::SecretStore;
use crate::secrets::{store_error, Deadline};

const STAGE: &str = "secret version pinning";

/// Replace every `latest` reference in `env` with the store's current
/// version number.
///
/// References must already be canonical (see [`crate::secrets::normalize`]).
/// Each secret is resolved once per call, so variables sharing a secret are
/// pinned to the same version. Availability is left unchanged.
///
/// # Errors
///
/// - [`Error::ImproperSecretFormat`] for a non-canonical reference
/// - [`Error::MisconfiguredSecret`] if the secret is missing or inaccessible
/// - [`Error::Cancelled`] if the deadline passes or the store cancels
/// - [`Error::SecretStore`] for other store failures
///
/// # Examples
///
/// ```
/// use hostprep::config::EnvironmentVariable;
/// use hostprep::secrets::{pin_versions, Deadline, InMemorySecretStore};
///
/// let store = InMemorySecretStore::new().with_version("projects/p/secrets/api-key", 4, "k");
/// let mut env = vec![EnvironmentVariable::secret_ref(
///     "API_KEY",
///     "projects/p/secrets/api-key/versions/latest",
///     None,
/// )];
///
/// pin_versions(&store, &mut env, &Deadline::none()).unwrap();
/// assert_eq!(env[0].secret.as_deref(), Some("projects/p/secrets/api-key/versions/4"));
/// ```
pub fn pin_versions<S: SecretStore + ?Sized>(
    store: &S,
    env: &mut [EnvironmentVariable],
    deadline: &Deadline,
) -> Result<()> {
    let mut resolved: BTreeMap<SecretName, u64> = BTreeMap::new();

    for var in env.iter_mut() {
        let Some(secret) = var.secret_reference() else {
            continue;
        };
        let reference: SecretReference =
            secret.parse().map_err(|_| Error::ImproperSecretFormat {
                variable: var.variable.clone(),
                secret: secret.to_string(),
            })?;
        if !reference.is_latest() {
            continue;
        }

        let version = if let Some(version) = resolved.get(&reference.name) {
            *version
        } else {
            deadline.check(STAGE)?;
            let version = store
                .resolve_latest_version(&reference.name)
                .map_err(|e| store_error(secret, STAGE, e))?;
            resolved.insert(reference.name.clone(), version);
            version
        };

        let pinned = reference.pinned(version);
        log::info!("pinned secret {reference} to {pinned} for the rest of the current build and run");
        var.secret = Some(pinned.to_string());
    }

    Ok(())
}
