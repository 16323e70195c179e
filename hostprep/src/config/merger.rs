//! Environment overlay merging.
//!
//! An environment overlay (`apphosting.<env>.yaml`) is layered onto the base
//! document field by field. Environment variables merge by name with the
//! overlay winning outright.

use std::collections::HashSet;

use crate::config::schema::{Configuration, EnvironmentVariable, VpcAccess};

/// Merges an overlay document onto a base document.
///
/// # Examples
///
/// ```
/// use hostprep::config::{Configuration, ConfigMerger, RunConfig};
///
/// let mut base = Configuration {
///     run_config: RunConfig { cpu: Some(1.0), memory_mib: Some(512), ..Default::default() },
///     ..Default::default()
/// };
/// let overlay = Configuration {
///     run_config: RunConfig { memory_mib: Some(1024), ..Default::default() },
///     ..Default::default()
/// };
///
/// ConfigMerger::merge_into(&mut base, &overlay);
/// assert_eq!(base.run_config.cpu, Some(1.0));
/// assert_eq!(base.run_config.memory_mib, Some(1024));
/// ```
pub struct ConfigMerger;

impl ConfigMerger {
    /// Merge `overlay` into `target` (overlay wins).
    ///
    /// # Merging Rules
    ///
    /// - Run config fields: overlay overwrites if set
    /// - Scripts: overlay overwrites if non-empty
    /// - `outputFiles.serverApp.include`: whole list replaced if non-empty
    /// - VPC access: merged as a unit, see [`ConfigMerger::merge_vpc_access`]
    /// - Env vars: see [`ConfigMerger::merge_env_vars`]
    pub fn merge_into(target: &mut Configuration, overlay: &Configuration) {
        let base = &mut target.run_config;
        let over = &overlay.run_config;

        if over.cpu.is_some() {
            base.cpu = over.cpu;
        }
        if over.memory_mib.is_some() {
            base.memory_mib = over.memory_mib;
        }
        if over.concurrency.is_some() {
            base.concurrency = over.concurrency;
        }
        if over.max_instances.is_some() {
            base.max_instances = over.max_instances;
        }
        if over.min_instances.is_some() {
            base.min_instances = over.min_instances;
        }
        if over.cpu_always_allocated.is_some() {
            base.cpu_always_allocated = over.cpu_always_allocated;
        }
        base.vpc_access =
            Self::merge_vpc_access(base.vpc_access.as_ref(), over.vpc_access.as_ref());

        Self::merge_non_empty(
            &mut target.scripts.build_command,
            &overlay.scripts.build_command,
        );
        Self::merge_non_empty(&mut target.scripts.run_command, &overlay.scripts.run_command);

        if !overlay.output_files.server_app.include.is_empty() {
            target
                .output_files
                .server_app
                .include
                .clone_from(&overlay.output_files.server_app.include);
        }

        target.env = Self::merge_env_vars(&target.env, &overlay.env);
    }

    fn merge_non_empty(target: &mut Option<String>, source: &Option<String>) {
        if source.as_deref().is_some_and(|s| !s.is_empty()) {
            target.clone_from(source);
        }
    }

    /// Merge VPC access settings.
    ///
    /// When both sides are set, egress comes from the overlay if present and
    /// the overlay's connector or interfaces replace the base's selection.
    ///
    /// # Examples
    ///
    /// ```
    /// use hostprep::config::{ConfigMerger, VpcAccess};
    ///
    /// let base = VpcAccess {
    ///     connector: Some("base-connector".into()),
    ///     egress: Some("ALL_TRAFFIC".into()),
    ///     ..Default::default()
    /// };
    /// let overlay = VpcAccess {
    ///     connector: Some("staging-connector".into()),
    ///     ..Default::default()
    /// };
    /// let merged = ConfigMerger::merge_vpc_access(Some(&base), Some(&overlay)).unwrap();
    /// assert_eq!(merged.connector.as_deref(), Some("staging-connector"));
    /// assert_eq!(merged.egress.as_deref(), Some("ALL_TRAFFIC"));
    /// ```
    #[must_use]
    pub fn merge_vpc_access(
        base: Option<&VpcAccess>,
        overlay: Option<&VpcAccess>,
    ) -> Option<VpcAccess> {
        let (base, overlay) = match (base, overlay) {
            (None, None) => return None,
            (Some(only), None) | (None, Some(only)) => return Some(only.clone()),
            (Some(base), Some(overlay)) => (base, overlay),
        };

        let mut merged = VpcAccess {
            egress: overlay
                .egress
                .clone()
                .filter(|e| !e.is_empty())
                .or_else(|| base.egress.clone()),
            ..Default::default()
        };

        // Connector and interfaces are exclusive, so take one side's selection whole.
        let selection = if Self::has_network_selection(overlay) {
            overlay
        } else {
            base
        };
        merged.connector.clone_from(&selection.connector);
        merged
            .network_interfaces
            .clone_from(&selection.network_interfaces);

        Some(merged)
    }

    fn has_network_selection(access: &VpcAccess) -> bool {
        access.connector.as_deref().is_some_and(|c| !c.is_empty())
            || !access.network_interfaces.is_empty()
    }

    /// Merge environment variables by name.
    ///
    /// Override entries come first, followed by original entries whose name
    /// the overrides do not define.
    ///
    /// # Examples
    ///
    /// ```
    /// use hostprep::config::{ConfigMerger, EnvironmentVariable};
    ///
    /// let base = vec![
    ///     EnvironmentVariable::literal("API_URL", "api.service.com", None),
    ///     EnvironmentVariable::literal("DATABASE_URL", "db.service.com", None),
    /// ];
    /// let overlay = vec![EnvironmentVariable::literal("API_URL", "staging.api.service.com", None)];
    ///
    /// let merged = ConfigMerger::merge_env_vars(&base, &overlay);
    /// assert_eq!(merged.len(), 2);
    /// assert_eq!(merged[0].value.as_deref(), Some("staging.api.service.com"));
    /// assert_eq!(merged[1].variable, "DATABASE_URL");
    /// ```
    #[must_use]
    pub fn merge_env_vars(
        original: &[EnvironmentVariable],
        overrides: &[EnvironmentVariable],
    ) -> Vec<EnvironmentVariable> {
        let overridden: HashSet<&str> = overrides.iter().map(|v| v.variable.as_str()).collect();

        let mut merged = overrides.to_vec();
        for var in original {
            if overridden.contains(var.variable.as_str()) {
                log::debug!(
                    "skipping {} from {} since it is already defined by {}",
                    var.variable,
                    var.source,
                    overrides
                        .iter()
                        .find(|o| o.variable == var.variable)
                        .map_or_else(String::new, |o| o.source.to_string())
                );
            } else {
                merged.push(var.clone());
            }
        }
        merged
    }
}
