//! Secret reference parsing and normalization.
//!
//! Users may write a secret as `name`, `name@version`, `@version`,
//! `projects/<project>/secrets/<name>` or the canonical
//! `projects/<project>/secrets/<name>/versions/<version>`. Everything is
//! rewritten to the canonical form before the store is consulted.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::EnvironmentVariable;
use crate::error::{Error, Result};

/// Version alias resolved by the store to the newest enabled version.
pub const LATEST: &str = "latest";

fn full_unversioned() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^projects/(?P<project>[^/]+)/secrets/(?P<secret>[^/]+)$")
            .expect("secret name pattern is valid")
    })
}

fn full_versioned() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^projects/(?P<project>[^/]+)/secrets/(?P<secret>[^/]+)/versions/(?P<version>[^/]+)$",
        )
        .expect("secret version pattern is valid")
    })
}

fn shorthand() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<name>[\w-]+)?@?(?P<version>\w+)?$").expect("shorthand pattern is valid")
    })
}

/// A secret, without a version: `projects/<project>/secrets/<secret>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SecretName {
    /// Owning project id.
    pub project: String,
    /// Secret id.
    pub secret: String,
}

impl SecretName {
    /// Create a secret name.
    #[must_use]
    pub fn new(project: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Display for SecretName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "projects/{}/secrets/{}", self.project, self.secret)
    }
}

impl FromStr for SecretName {
    type Err = InvalidReferenceError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let caps = full_unversioned()
            .captures(s)
            .ok_or_else(|| InvalidReferenceError::new(s))?;
        Ok(Self::new(&caps["project"], &caps["secret"]))
    }
}

/// A canonical secret reference: `projects/<p>/secrets/<s>/versions/<v>`.
///
/// # Examples
///
/// ```
/// use hostprep::secrets::SecretReference;
///
/// let reference: SecretReference = "projects/p/secrets/api-key/versions/3".parse().unwrap();
/// assert_eq!(reference.name.secret, "api-key");
/// assert_eq!(reference.version, "3");
/// assert_eq!(reference.to_string(), "projects/p/secrets/api-key/versions/3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SecretReference {
    /// The secret.
    pub name: SecretName,
    /// Version number or [`LATEST`].
    pub version: String,
}

/// A string is not a canonical secret reference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a canonical secret reference: {input:?}")]
pub struct InvalidReferenceError {
    /// The rejected input.
    pub input: String,
}

impl InvalidReferenceError {
    fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
        }
    }
}

impl SecretReference {
    /// Create a reference.
    #[must_use]
    pub fn new(name: SecretName, version: impl Into<String>) -> Self {
        Self {
            name,
            version: version.into(),
        }
    }

    /// Whether the version is the `latest` alias.
    #[must_use]
    pub fn is_latest(&self) -> bool {
        self.version == LATEST
    }

    /// The same secret at a concrete version.
    #[must_use]
    pub fn pinned(&self, version: u64) -> Self {
        Self::new(self.name.clone(), version.to_string())
    }

    /// Parse any accepted user form into a canonical reference.
    ///
    /// Full forms are tried first. Shorthand names default to `key` and
    /// versions default to `latest`; shorthand is placed in `project_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImproperSecretFormat`] if `input` matches no form.
    ///
    /// # Examples
    ///
    /// ```
    /// use hostprep::secrets::SecretReference;
    ///
    /// let r = SecretReference::parse_shorthand("API_KEY", "", "p").unwrap();
    /// assert_eq!(r.to_string(), "projects/p/secrets/API_KEY/versions/latest");
    ///
    /// let r = SecretReference::parse_shorthand("API_KEY", "@5", "p").unwrap();
    /// assert_eq!(r.to_string(), "projects/p/secrets/API_KEY/versions/5");
    ///
    /// let r = SecretReference::parse_shorthand("API_KEY", "projects/other/secrets/s", "p").unwrap();
    /// assert_eq!(r.to_string(), "projects/other/secrets/s/versions/latest");
    ///
    /// assert!(SecretReference::parse_shorthand("API_KEY", "projects/p/s", "p").is_err());
    /// ```
    pub fn parse_shorthand(key: &str, input: &str, project_id: &str) -> Result<Self> {
        if let Ok(reference) = input.parse::<Self>() {
            return Ok(reference);
        }
        if let Ok(name) = input.parse::<SecretName>() {
            return Ok(Self::new(name, LATEST));
        }

        let caps = shorthand()
            .captures(input)
            .ok_or_else(|| Error::ImproperSecretFormat {
                variable: key.to_string(),
                secret: input.to_string(),
            })?;
        let secret = caps.name("name").map_or(key, |m| m.as_str());
        let version = caps.name("version").map_or(LATEST, |m| m.as_str());
        Ok(Self::new(SecretName::new(project_id, secret), version))
    }
}

impl fmt::Display for SecretReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/versions/{}", self.name, self.version)
    }
}

impl FromStr for SecretReference {
    type Err = InvalidReferenceError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let caps = full_versioned()
            .captures(s)
            .ok_or_else(|| InvalidReferenceError::new(s))?;
        Ok(Self::new(
            SecretName::new(&caps["project"], &caps["secret"]),
            &caps["version"],
        ))
    }
}

/// Rewrite every secret reference in `env` to canonical form.
///
/// Variables holding a literal value are untouched. An empty secret string
/// counts as no secret.
///
/// # Errors
///
/// Returns [`Error::ImproperSecretFormat`] for the first unparseable
/// reference; `env` may be partially rewritten in that case.
pub fn normalize(env: &mut [EnvironmentVariable], project_id: &str) -> Result<()> {
    for var in env.iter_mut() {
        let Some(input) = var.secret_reference() else {
            continue;
        };
        let reference = SecretReference::parse_shorthand(&var.variable, input, project_id)?;
        log::debug!("normalized secret for {} to {reference}", var.variable);
        var.secret = Some(reference.to_string());
    }
    Ok(())
}


#[cfg(test)]
#[allow(unused_doc_comments)] // proptest! macro doesn't support doc comments
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    /// Property: bare names normalize to `latest` in the given project
    proptest! {
        #[test]
        fn prop_bare_name_gets_latest(name in "[a-zA-Z0-9_-]{1,40}", project in "[a-z][a-z0-9-]{4,20}") {
            let reference = SecretReference::parse_shorthand("KEY", &name, &project).unwrap();
            prop_assert_eq!(&reference.name.project, &project);
            prop_assert_eq!(&reference.name.secret, &name);
            prop_assert!(reference.is_latest());
        }
    }

    /// Property: `name@version` keeps both parts
    proptest! {
        #[test]
        fn prop_versioned_shorthand(name in "[a-zA-Z0-9_-]{1,40}", version in 1u64..100_000) {
            let input = format!("{name}@{version}");
            let reference = SecretReference::parse_shorthand("KEY", &input, "p").unwrap();
            prop_assert_eq!(reference.name.secret, name);
            prop_assert_eq!(reference.version, version.to_string());
        }
    }

    /// Property: canonical output parses back to the same reference
    proptest! {
        #[test]
        fn prop_canonical_reparses(
            key in "[A-Z][A-Z0-9_]{0,10}",
            input in "[a-zA-Z0-9_-]{0,20}(@[0-9]{1,4})?",
        ) {
            let reference = SecretReference::parse_shorthand(&key, &input, "p").unwrap();
            let reparsed: SecretReference = reference.to_string().parse().unwrap();
            prop_assert_eq!(&reparsed, &reference);
            let again = SecretReference::parse_shorthand(&key, &reference.to_string(), "other").unwrap();
            prop_assert_eq!(again, reference);
        }
    }
}
