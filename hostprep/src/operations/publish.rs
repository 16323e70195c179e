//! Combining the resolved document with the adapter's output bundle.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{
    BundleMetadata, BundleSchema, ConfigLoader, Configuration, EnvironmentVariable, RunConfig,
};
use crate::error::{Error, Result};
use crate::output::create_parent;

/// Final build settings handed to the deployment step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSchema {
    /// Sizing from the resolved document. Unset fields get server defaults.
    #[serde(default, skip_serializing_if = "RunConfig::is_empty")]
    pub run_config: RunConfig,

    /// Document variables followed by non-conflicting bundle variables.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvironmentVariable>,

    /// Adapter metadata from the bundle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BundleMetadata>,
}

impl BuildSchema {
    /// Combine a resolved document with a bundle.
    #[must_use]
    pub fn from_parts(document: &Configuration, bundle: &BundleSchema) -> Self {
        Self {
            run_config: document.run_config.clone(),
            env: merge_bundle_env(&document.env, &bundle.run_config.environment_variables),
            metadata: bundle.metadata.clone(),
        }
    }
}

/// Append bundle variables to the document's, unless the document already
/// defines the same name for an overlapping stage.
///
/// # Examples
///
/// ```
/// use hostprep::config::{Availability, EnvironmentVariable};
/// use hostprep::operations::merge_bundle_env;
///
/// let document = vec![EnvironmentVariable::literal("HOSTNAME", "mine", Some(&[Availability::Runtime]))];
/// let bundle = vec![
///     EnvironmentVariable::literal("HOSTNAME", "0.0.0.0", Some(&[Availability::Runtime])),
///     EnvironmentVariable::literal("NODE_ENV", "production", Some(&[Availability::Runtime])),
/// ];
///
/// let merged = merge_bundle_env(&document, &bundle);
/// assert_eq!(merged.len(), 2);
/// assert_eq!(merged[0].value.as_deref(), Some("mine"));
/// assert_eq!(merged[1].variable, "NODE_ENV");
/// ```
#[must_use]
pub fn merge_bundle_env(
    document: &[EnvironmentVariable],
    bundle: &[EnvironmentVariable],
) -> Vec<EnvironmentVariable> {
    let mut merged = document.to_vec();
    for var in bundle {
        let conflict = document.iter().any(|existing| {
            existing.variable == var.variable
                && existing
                    .effective_availability()
                    .iter()
                    .any(|stage| var.effective_availability().contains(stage))
        });
        if conflict {
            log::info!(
                "{} from the bundle conflicts with the configuration, keeping the configured value",
                var.variable
            );
        } else {
            log::debug!("adding {} from the bundle", var.variable);
            merged.push(var.clone());
        }
    }
    merged
}

/// Read the resolved document and the bundle, and write the build schema to
/// `output`.
///
/// A missing document is treated as empty; a missing bundle is an error.
///
/// # Errors
///
/// Returns an error if either input is invalid or the output cannot be
/// written.
pub fn publish(document_path: &Path, bundle_path: &Path, output: &Path) -> Result<BuildSchema> {
    let document = ConfigLoader::load_file(document_path)?;
    let bundle = BundleSchema::load_file(bundle_path)?;
    let schema = BuildSchema::from_parts(&document, &bundle);

    let yaml = serde_yaml::to_string(&schema)?;
    log::info!("final build schema (unset runConfig fields get server defaults):\n{yaml}");
    create_parent(output)?;
    fs::write(output, yaml).map_err(|e| Error::io(output, e))?;
    Ok(schema)
}
