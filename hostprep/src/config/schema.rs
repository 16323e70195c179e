//! Configuration schema definitions.
//!
//! These types mirror the user-authored backend configuration document
//! (`apphosting.yaml` and its environment overlays) and the resolved document
//! written for later build steps.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// The availability applied to variables that declare none.
pub const DEFAULT_AVAILABILITY: [Availability; 2] = [Availability::Build, Availability::Runtime];

/// Root of a backend configuration document.
///
/// Unknown top-level keys are ignored so that documents shared with other
/// tooling still load.
///
/// # Examples
///
/// ```
/// use hostprep::config::{Configuration, EnvironmentVariable, RunConfig};
///
/// let config = Configuration {
///     run_config: RunConfig {
///         cpu: Some(1.0),
///         memory_mib: Some(512),
///         ..Default::default()
///     },
///     env: vec![EnvironmentVariable::literal("API_URL", "api.example.com", None)],
///     ..Default::default()
/// };
/// assert!(config.find_env("API_URL").is_some());
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    /// Compute sizing and networking.
    #[serde(default, skip_serializing_if = "RunConfig::is_empty")]
    pub run_config: RunConfig,

    /// Environment variables, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvironmentVariable>,

    /// Build and run command overrides.
    #[serde(default, skip_serializing_if = "Scripts::is_empty")]
    pub scripts: Scripts,

    /// Files to ship with the server app.
    #[serde(default, skip_serializing_if = "OutputFiles::is_empty")]
    pub output_files: OutputFiles,
}

impl Configuration {
    /// Look up an environment variable by name.
    #[must_use]
    pub fn find_env(&self, name: &str) -> Option<&EnvironmentVariable> {
        self.env.iter().find(|var| var.variable == name)
    }

    /// Whether the document declares a variable with this name.
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.find_env(name).is_some()
    }
}

/// Service sizing and networking settings.
///
/// Every field is optional; unset fields fall back to server defaults.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Number of vCPUs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f32>,

    /// Memory in MiB.
    #[serde(rename = "memoryMiB", default, skip_serializing_if = "Option::is_none")]
    pub memory_mib: Option<i32>,

    /// Maximum concurrent requests per instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<i32>,

    /// Upper bound on instance count.
    #[serde(rename = "maxInstances", default, skip_serializing_if = "Option::is_none")]
    pub max_instances: Option<i32>,

    /// Lower bound on instance count.
    #[serde(rename = "minInstances", default, skip_serializing_if = "Option::is_none")]
    pub min_instances: Option<i32>,

    /// Keep CPU allocated outside of request handling.
    #[serde(rename = "cpuAlwaysAllocated", default, skip_serializing_if = "Option::is_none")]
    pub cpu_always_allocated: Option<bool>,

    /// Private networking settings.
    #[serde(rename = "vpcAccess", default, skip_serializing_if = "Option::is_none")]
    pub vpc_access: Option<VpcAccess>,
}

impl RunConfig {
    /// True when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Serverless VPC access: either a connector or direct network interfaces.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VpcAccess {
    /// Connector id or `projects/*/locations/*/connectors/*` name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector: Option<String>,

    /// `ALL_TRAFFIC` or `PRIVATE_RANGES_ONLY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub egress: Option<String>,

    /// Direct VPC egress interfaces. Empty means unset.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub network_interfaces: Vec<NetworkInterface>,
}

/// A direct VPC egress interface.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct NetworkInterface {
    /// Network id or `projects/*/global/networks/*` name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,

    /// Subnetwork id or `projects/*/regions/*/subnetworks/*` name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnetwork: Option<String>,

    /// Network tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Where a variable is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Availability {
    /// Visible to the build.
    Build,
    /// Visible to the running service.
    Runtime,
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => write!(f, "BUILD"),
            Self::Runtime => write!(f, "RUNTIME"),
        }
    }
}

/// Which source contributed a variable. Diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Provenance {
    /// Not yet attributed.
    #[default]
    Unspecified,
    /// Declared in the named configuration file.
    File(String),
    /// Set through the console.
    Console,
    /// Injected by the platform.
    System,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unspecified => write!(f, "unspecified"),
            Self::File(name) => write!(f, "{name}"),
            Self::Console => write!(f, "console"),
            Self::System => write!(f, "system"),
        }
    }
}

/// A single environment variable declaration.
///
/// Exactly one of `value` and `secret` is expected; the validator enforces it.
/// `source` is never serialized and does not take part in equality.
///
/// # Examples
///
/// ```
/// use hostprep::config::{Availability, EnvironmentVariable};
///
/// let var = EnvironmentVariable::secret_ref("API_KEY", "api-key@3", Some(&[Availability::Build]));
/// assert!(var.is_available_at(Availability::Build));
/// assert!(!var.is_available_at(Availability::Runtime));
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentVariable {
    /// Variable name.
    pub variable: String,

    /// Literal value. YAML numbers and booleans are kept in string form.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_scalar"
    )]
    pub value: Option<String>,

    /// Secret reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// Where the variable is visible. `None` means both.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<Vec<Availability>>,

    /// Which source contributed the variable.
    #[serde(skip)]
    pub source: Provenance,
}

impl PartialEq for EnvironmentVariable {
    fn eq(&self, other: &Self) -> bool {
        self.variable == other.variable
            && self.value == other.value
            && self.secret == other.secret
            && self.availability == other.availability
    }
}

impl EnvironmentVariable {
    /// A variable with a literal value.
    #[must_use]
    pub fn literal(
        name: impl Into<String>,
        value: impl Into<String>,
        availability: Option<&[Availability]>,
    ) -> Self {
        Self {
            variable: name.into(),
            value: Some(value.into()),
            availability: availability.map(<[Availability]>::to_vec),
            ..Self::default()
        }
    }

    /// A variable backed by a secret reference.
    #[must_use]
    pub fn secret_ref(
        name: impl Into<String>,
        secret: impl Into<String>,
        availability: Option<&[Availability]>,
    ) -> Self {
        Self {
            variable: name.into(),
            secret: Some(secret.into()),
            availability: availability.map(<[Availability]>::to_vec),
            ..Self::default()
        }
    }

    /// Attach provenance.
    #[must_use]
    pub fn with_source(mut self, source: Provenance) -> Self {
        self.source = source;
        self
    }

    /// The literal value, treating an empty string as unset.
    #[must_use]
    pub fn literal_value(&self) -> Option<&str> {
        self.value.as_deref().filter(|v| !v.is_empty())
    }

    /// The secret reference, treating an empty string as unset.
    #[must_use]
    pub fn secret_reference(&self) -> Option<&str> {
        self.secret.as_deref().filter(|s| !s.is_empty())
    }

    /// The declared availability, or both when none is declared.
    #[must_use]
    pub fn effective_availability(&self) -> &[Availability] {
        self.availability.as_deref().unwrap_or(&DEFAULT_AVAILABILITY)
    }

    /// Whether the variable is visible at `stage`.
    #[must_use]
    pub fn is_available_at(&self, stage: Availability) -> bool {
        self.effective_availability().contains(&stage)
    }
}

/// Build and run command overrides.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Scripts {
    /// Command used to build the app.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,

    /// Command used to start the app.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_command: Option<String>,
}

impl Scripts {
    /// True when no command is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.build_command.is_none() && self.run_command.is_none()
    }
}

/// Files shipped alongside the built app.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OutputFiles {
    /// Server app outputs.
    #[serde(default)]
    pub server_app: ServerApp,
}

impl OutputFiles {
    /// True when nothing is listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.server_app.include.is_empty()
    }
}

/// Server app output list.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerApp {
    /// Paths to include.
    #[serde(default)]
    pub include: Vec<String>,
}

fn deserialize_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        String(String),
        Int(i64),
        Uint(u64),
        Float(f64),
        Bool(bool),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|scalar| match scalar {
        Scalar::String(s) => s,
        Scalar::Int(n) => n.to_string(),
        Scalar::Uint(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Bool(b) => b.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_document() {
        let yaml = r#"
runConfig:
  cpu: 3
  memoryMiB: 1024
  concurrency: 100
  maxInstances: 4
  minInstances: 0
  cpuAlwaysAllocated: true
  vpcAccess:
    egress: ALL_TRAFFIC
    connector: my-connector
env:
  - variable: API_URL
    value: api.service.com
    availability:
      - BUILD
      - RUNTIME
  - variable: API_KEY
    secret: secretID
    availability:
      - BUILD
scripts:
  buildCommand: npm run build:prod
  runCommand: node server.js
outputFiles:
  serverApp:
    include: [dist, server.js]
"#;
        let config: Configuration = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.run_config.cpu, Some(3.0));
        assert_eq!(config.run_config.memory_mib, Some(1024));
        assert_eq!(config.run_config.cpu_always_allocated, Some(true));
        let vpc = config.run_config.vpc_access.as_ref().unwrap();
        assert_eq!(vpc.connector.as_deref(), Some("my-connector"));
        assert_eq!(vpc.egress.as_deref(), Some("ALL_TRAFFIC"));
        assert_eq!(config.env.len(), 2);
        assert_eq!(config.env[1].secret.as_deref(), Some("secretID"));
        assert_eq!(
            config.env[1].availability,
            Some(vec![Availability::Build])
        );
        assert_eq!(config.scripts.build_command.as_deref(), Some("npm run build:prod"));
        assert_eq!(config.output_files.server_app.include, vec!["dist", "server.js"]);
    }

    #[test]
    fn test_scalar_values_kept_as_strings() {
        let yaml = r"
env:
  - variable: VAR_NUMBER
    value: 12345
  - variable: VAR_BOOL
    value: true
  - variable: VAR_FLOAT
    value: 1.5
";
        let config: Configuration = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.env[0].value.as_deref(), Some("12345"));
        assert_eq!(config.env[1].value.as_deref(), Some("true"));
        assert_eq!(config.env[2].value.as_deref(), Some("1.5"));
    }

    #[test]
    fn test_unknown_root_keys_ignored() {
        let yaml = "futureSetting: 1\nenv: []\n";
        let config: Configuration = serde_yaml::from_str(yaml).unwrap();
        assert!(config.env.is_empty());
    }

    #[test]
    fn test_unknown_run_config_key_rejected() {
        let yaml = "runConfig:\n  cpus: 2\n";
        assert!(serde_yaml::from_str::<Configuration>(yaml).is_err());
    }

    #[test]
    fn test_unknown_availability_rejected() {
        let yaml = "env:\n  - variable: A\n    value: b\n    availability: [DEPLOY]\n";
        assert!(serde_yaml::from_str::<Configuration>(yaml).is_err());
    }

    #[test]
    fn test_empty_config_serializes_to_empty_map() {
        let yaml = serde_yaml::to_string(&Configuration::default()).unwrap();
        assert_eq!(yaml.trim(), "{}");
        let back: Configuration = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, Configuration::default());
    }

    #[test]
    fn test_source_not_serialized_or_compared() {
        let a = EnvironmentVariable::literal("A", "1", None)
            .with_source(Provenance::File("apphosting.yaml".to_string()));
        let b = EnvironmentVariable::literal("A", "1", None).with_source(Provenance::Console);
        assert_eq!(a, b);
        let yaml = serde_yaml::to_string(&a).unwrap();
        assert!(!yaml.contains("source"));
        assert!(!yaml.contains("apphosting.yaml"));
    }

    #[test]
    fn test_effective_availability_defaults_to_both() {
        let var = EnvironmentVariable::literal("A", "1", None);
        assert_eq!(var.effective_availability(), &DEFAULT_AVAILABILITY);
        assert!(var.is_available_at(Availability::Build));
        assert!(var.is_available_at(Availability::Runtime));
    }

    #[test]
    fn test_empty_strings_count_as_unset() {
        let var = EnvironmentVariable {
            variable: "A".to_string(),
            value: Some(String::new()),
            secret: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(var.literal_value(), None);
        assert_eq!(var.secret_reference(), None);
    }

    #[test]
    fn test_provenance_display() {
        assert_eq!(
            Provenance::File("apphosting.staging.yaml".to_string()).to_string(),
            "apphosting.staging.yaml"
        );
        assert_eq!(Provenance::Console.to_string(), "console");
        assert_eq!(Provenance::System.to_string(), "system");
    }
}
