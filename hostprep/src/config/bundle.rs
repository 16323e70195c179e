//! The framework adapter's output bundle description (`bundle.yaml`).

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::schema::{Availability, EnvironmentVariable, RunConfig, VpcAccess};
use crate::error::{Error, Result};

/// Root of `bundle.yaml`.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BundleSchema {
    /// Settings requested by the adapter.
    #[serde(default)]
    pub run_config: BundleRunConfig,

    /// Adapter and framework identification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BundleMetadata>,
}

/// Adapter-requested run settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BundleRunConfig {
    /// Runtime variables the adapter needs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment_variables: Vec<EnvironmentVariable>,

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
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_instances: Option<i32>,

    /// Lower bound on instance count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_instances: Option<i32>,

    /// Keep CPU allocated outside of request handling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_always_allocated: Option<bool>,

    /// Private networking settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_access: Option<VpcAccess>,
}

impl BundleRunConfig {
    /// The sizing fields as a [`RunConfig`].
    #[must_use]
    pub fn sizing(&self) -> RunConfig {
        RunConfig {
            cpu: self.cpu,
            memory_mib: self.memory_mib,
            concurrency: self.concurrency,
            max_instances: self.max_instances,
            min_instances: self.min_instances,
            cpu_always_allocated: self.cpu_always_allocated,
            vpc_access: self.vpc_access.clone(),
        }
    }
}

/// Adapter and framework identification. All fields are required.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BundleMetadata {
    /// npm package of the adapter.
    #[serde(default)]
    pub adapter_package_name: String,
    /// Adapter version.
    #[serde(default)]
    pub adapter_version: String,
    /// Framework name.
    #[serde(default)]
    pub framework: String,
    /// Framework version.
    #[serde(default)]
    pub framework_version: String,
}

impl BundleSchema {
    /// Read and validate `bundle.yaml`. Unlike configuration documents, a
    /// missing bundle is an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file is missing or unreadable and
    /// [`Error::InvalidDocument`] if it fails to decode or validate.
    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                log::error!("missing output bundle config at {}", path.display());
            }
            Error::io(path, e)
        })?;

        let invalid = |message: String| Error::InvalidDocument {
            path: path.to_path_buf(),
            message,
        };
        let bundle: Self = serde_yaml::from_str(&contents).map_err(|e| invalid(e.to_string()))?;
        bundle.validate().map_err(|e| invalid(e.to_string()))?;
        Ok(bundle)
    }

    /// Check adapter variables and metadata.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if a variable lacks a value, carries a
    /// secret or is available at build time, or if metadata is incomplete.
    ///
    /// # Examples
    ///
    /// ```
    /// use hostprep::config::{Availability, BundleSchema, EnvironmentVariable};
    ///
    /// let mut bundle = BundleSchema::default();
    /// bundle.run_config.environment_variables.push(
    ///     EnvironmentVariable::literal("HOSTNAME", "0.0.0.0", Some(&[Availability::Runtime])),
    /// );
    /// assert!(bundle.validate().is_ok());
    ///
    /// bundle.run_config.environment_variables[0].availability = Some(vec![Availability::Build]);
    /// assert!(bundle.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        for (index, var) in self.run_config.environment_variables.iter().enumerate() {
            let field = format!("runConfig.environmentVariables[{index}]");
            if var.literal_value().is_none() || var.secret_reference().is_some() {
                return Err(Error::Validation {
                    field,
                    message: format!(
                        "for bundle.yaml environment variable {:?}, 'value' is required and 'secret' should not be present",
                        var.variable
                    ),
                });
            }
            if let Some(availability) = &var.availability {
                if availability.contains(&Availability::Build) {
                    return Err(Error::Validation {
                        field,
                        message: format!(
                            "invalid value {} in 'availability' of {:?}",
                            Availability::Build,
                            var.variable
                        ),
                    });
                }
            }
        }

        if let Some(metadata) = &self.metadata {
            let required = [
                ("adapterPackageName", &metadata.adapter_package_name),
                ("adapterVersion", &metadata.adapter_version),
                ("framework", &metadata.framework),
                ("frameworkVersion", &metadata.framework_version),
            ];
            for (name, value) in required {
                if value.is_empty() {
                    return Err(Error::Validation {
                        field: format!("metadata.{name}"),
                        message: format!("missing {name} in bundle.yaml metadata"),
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BUNDLE: &str = r"
version: v1
runConfig:
  runCommand: node .next/standalone/server.js
  concurrency: 80
  environmentVariables:
    - variable: HOSTNAME
      value: 0.0.0.0
      availability:
        - RUNTIME
metadata:
  adapterPackageName: '@apphosting/adapter-nextjs'
  adapterVersion: 14.0.1
  framework: nextjs
  frameworkVersion: 14.2.3
";

    #[test]
    fn test_load_bundle() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bundle.yaml");
        fs::write(&path, BUNDLE).unwrap();

        let bundle = BundleSchema::load_file(&path).unwrap();
        assert_eq!(bundle.run_config.concurrency, Some(80));
        assert_eq!(bundle.run_config.environment_variables.len(), 1);
        let metadata = bundle.metadata.unwrap();
        assert_eq!(metadata.framework, "nextjs");
        assert_eq!(metadata.adapter_version, "14.0.1");
    }

    #[test]
    fn test_missing_bundle_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = BundleSchema::load_file(&temp_dir.path().join("bundle.yaml")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_bundle_secret_rejected() {
        let mut bundle = BundleSchema::default();
        bundle
            .run_config
            .environment_variables
            .push(EnvironmentVariable::secret_ref("A", "s", Some(&[Availability::Runtime])));
        let err = bundle.validate().unwrap_err();
        assert!(err.to_string().contains("'value' is required"));
    }

    #[test]
    fn test_incomplete_metadata_rejected() {
        let bundle = BundleSchema {
            metadata: Some(BundleMetadata {
                adapter_package_name: "@apphosting/adapter-angular".to_string(),
                adapter_version: "17.2.0".to_string(),
                framework: "angular".to_string(),
                framework_version: String::new(),
            }),
            ..Default::default()
        };
        let err = bundle.validate().unwrap_err();
        assert!(err.to_string().contains("frameworkVersion"));
    }

    #[test]
    fn test_sizing_copies_fields() {
        let run_config = BundleRunConfig {
            cpu: Some(1.0),
            max_instances: Some(5),
            ..Default::default()
        };
        let sizing = run_config.sizing();
        assert_eq!(sizing.cpu, Some(1.0));
        assert_eq!(sizing.max_instances, Some(5));
        assert_eq!(sizing.memory_mib, None);
    }
}
