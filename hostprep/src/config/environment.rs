//! Environment variable composition across sources.
//!
//! Variables reach a build from three places. In precedence order:
//!
//! 1. Variables set in the console, passed in as a JSON array
//! 2. Variables declared in the configuration documents
//! 3. Variables injected by the platform (`FIREBASE_CONFIG`,
//!    `FIREBASE_WEBAPP_CONFIG`)
//!
//! A variable from a higher-precedence source replaces a same-named one from
//! a lower source as a whole.

use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;

use serde::Deserialize;

use crate::config::merger::ConfigMerger;
use crate::config::schema::{Availability, EnvironmentVariable, Provenance, DEFAULT_AVAILABILITY};
use crate::config::validator::ConfigValidator;
use crate::error::{Error, Result};

/// Platform-injected Firebase config, visible at build and run time.
pub const FIREBASE_CONFIG: &str = "FIREBASE_CONFIG";

/// Platform-injected web app config, visible at build time only.
pub const FIREBASE_WEBAPP_CONFIG: &str = "FIREBASE_WEBAPP_CONFIG";

const RESERVED_PREFIX: &str = "X_FIREBASE_";

fn reserved_keys() -> &'static BTreeSet<&'static str> {
    static KEYS: OnceLock<BTreeSet<&'static str>> = OnceLock::new();
    KEYS.get_or_init(|| ["PORT", "K_SERVICE", "K_REVISION", "K_CONFIGURATION"].into_iter().collect())
}

/// Whether `key` is reserved by the runtime and may not be user-defined.
///
/// # Examples
///
/// ```
/// use hostprep::config::is_reserved_key;
///
/// assert!(is_reserved_key("PORT"));
/// assert!(is_reserved_key("X_FIREBASE_ANYTHING"));
/// assert!(!is_reserved_key("API_URL"));
/// ```
#[must_use]
pub fn is_reserved_key(key: &str) -> bool {
    reserved_keys().contains(key) || key.starts_with(RESERVED_PREFIX)
}

/// Drop reserved variables and default missing availability to both stages.
///
/// Each drop and each default is logged as a warning.
#[must_use]
pub fn sanitize(env: Vec<EnvironmentVariable>) -> Vec<EnvironmentVariable> {
    env.into_iter()
        .filter_map(|mut var| {
            if is_reserved_key(&var.variable) {
                log::warn!(
                    "{} is a reserved key, removing it from the final environment variables",
                    var.variable
                );
                return None;
            }
            if var.availability.is_none() {
                log::warn!(
                    "{} has no availability specified, applying the default of 'BUILD' and 'RUNTIME'",
                    var.variable
                );
                var.availability = Some(DEFAULT_AVAILABILITY.to_vec());
            }
            Some(var)
        })
        .collect()
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ConsoleVariable {
    #[serde(alias = "variable")]
    variable: String,
    #[serde(default, alias = "value")]
    value: Option<String>,
    #[serde(default, alias = "secret")]
    secret: Option<String>,
    #[serde(default, alias = "availability")]
    availability: Option<Vec<Availability>>,
}

/// Decode the console's JSON array of variables.
///
/// # Errors
///
/// Returns [`Error::InvalidServerInput`] if the JSON cannot be decoded, a
/// variable does not set exactly one of value and secret, or a name repeats.
///
/// # Examples
///
/// ```
/// use hostprep::config::{parse_console_env, Provenance};
///
/// let vars = parse_console_env(r#"[{"Variable":"API_URL","Value":"console.api.com","Availability":["BUILD"]}]"#).unwrap();
/// assert_eq!(vars[0].value.as_deref(), Some("console.api.com"));
/// assert_eq!(vars[0].source, Provenance::Console);
/// ```
pub fn parse_console_env(json: &str) -> Result<Vec<EnvironmentVariable>> {
    let invalid = |message: String| Error::InvalidServerInput {
        input: "console environment variables".into(),
        message,
    };

    let parsed: Vec<ConsoleVariable> =
        serde_json::from_str(json).map_err(|e| invalid(e.to_string()))?;

    let mut seen = HashSet::new();
    let mut vars = Vec::with_capacity(parsed.len());
    for (index, var) in parsed.into_iter().enumerate() {
        let var = EnvironmentVariable {
            variable: var.variable,
            value: var.value.filter(|v| !v.is_empty()),
            secret: var.secret.filter(|s| !s.is_empty()),
            availability: var.availability,
            source: Provenance::Console,
        };
        ConfigValidator::validate_env_var(&var, index).map_err(|e| invalid(e.to_string()))?;
        if !seen.insert(var.variable.clone()) {
            return Err(invalid(format!(
                "duplicate environment variable {}",
                var.variable
            )));
        }
        vars.push(var);
    }
    Ok(vars)
}

/// Composes the final variable list from console, file and platform sources.
///
/// # Examples
///
/// ```
/// use hostprep::config::{EnvComposer, EnvironmentVariable};
///
/// let file = vec![EnvironmentVariable::literal("API_URL", "file.api.com", None)];
/// let composer = EnvComposer::new()
///     .with_console_json(Some(r#"[{"Variable":"API_URL","Value":"console.api.com"}]"#))
///     .unwrap()
///     .with_system_config(Some(r#"{"projectId":"p"}"#), None);
///
/// let env = composer.compose(file);
/// assert_eq!(env.len(), 2);
/// assert_eq!(env[0].value.as_deref(), Some("console.api.com"));
/// assert_eq!(env[1].variable, "FIREBASE_CONFIG");
/// ```
#[derive(Debug, Clone, Default)]
pub struct EnvComposer {
    console: Option<Vec<EnvironmentVariable>>,
    system: Vec<EnvironmentVariable>,
}

impl EnvComposer {
    /// A composer with no console or platform input.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add console variables. `None` leaves the console source disabled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidServerInput`] if the JSON is malformed.
    pub fn with_console_json(self, json: Option<&str>) -> Result<Self> {
        Ok(match json {
            Some(json) => self.with_console(parse_console_env(json)?),
            None => self,
        })
    }

    pub(crate) fn with_console(mut self, vars: Vec<EnvironmentVariable>) -> Self {
        self.console = Some(vars);
        self
    }

    /// Add the platform-injected config blobs. Empty blobs are ignored.
    #[must_use]
    pub fn with_system_config(
        mut self,
        firebase_config: Option<&str>,
        webapp_config: Option<&str>,
    ) -> Self {
        self.system.clear();
        if let Some(config) = firebase_config.filter(|c| !c.is_empty()) {
            self.system.push(
                EnvironmentVariable::literal(FIREBASE_CONFIG, config, Some(&DEFAULT_AVAILABILITY))
                    .with_source(Provenance::System),
            );
        }
        if let Some(config) = webapp_config.filter(|c| !c.is_empty()) {
            self.system.push(
                EnvironmentVariable::literal(
                    FIREBASE_WEBAPP_CONFIG,
                    config,
                    Some(&[Availability::Build]),
                )
                .with_source(Provenance::System),
            );
        }
        self
    }

    /// Produce the final list: console entries, then surviving file entries,
    /// then platform entries no other source defines.
    ///
    /// File and console variables are sanitized first. Platform variables
    /// are never stripped.
    #[must_use]
    pub fn compose(&self, file_declared: Vec<EnvironmentVariable>) -> Vec<EnvironmentVariable> {
        let mut env = sanitize(file_declared);

        if let Some(console) = &self.console {
            env = ConfigMerger::merge_env_vars(&env, &sanitize(console.clone()));
        }

        for var in &self.system {
            if env.iter().any(|existing| existing.variable == var.variable) {
                log::info!(
                    "{} is user defined, not applying the platform value",
                    var.variable
                );
            } else {
                env.push(var.clone());
            }
        }

        env
    }
}
