//! Configuration validation.
//!
//! Validation is a separate step from decoding so it can be run on documents
//! built in code and re-run after an overlay merge.

use std::collections::HashSet;

use crate::config::schema::{Configuration, EnvironmentVariable, RunConfig};
use crate::config::vpc;
use crate::error::{Error, Result};

/// Validates backend configuration documents.
///
/// # Examples
///
/// ```
/// use hostprep::config::{Configuration, ConfigValidator};
///
/// let config = Configuration::default();
/// ConfigValidator::validate(&config).unwrap();
/// ```
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a complete configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first offending field.
    pub fn validate(config: &Configuration) -> Result<()> {
        Self::validate_run_config(&config.run_config)?;

        let mut seen = HashSet::new();
        for (index, var) in config.env.iter().enumerate() {
            Self::validate_env_var(var, index)?;
            if !seen.insert(var.variable.as_str()) {
                return Err(Error::Validation {
                    field: format!("env[{index}].variable"),
                    message: format!("duplicate environment variable {}", var.variable),
                });
            }
        }

        Ok(())
    }

    /// Validate sizing, scaling and networking settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for out-of-range values or
    /// incompatible cpu/memory/concurrency combinations.
    ///
    /// # Examples
    ///
    /// ```
    /// use hostprep::config::{ConfigValidator, RunConfig};
    ///
    /// let ok = RunConfig { cpu: Some(0.5), concurrency: Some(1), ..Default::default() };
    /// assert!(ConfigValidator::validate_run_config(&ok).is_ok());
    ///
    /// let bad = RunConfig { cpu: Some(0.5), concurrency: Some(2), ..Default::default() };
    /// assert!(ConfigValidator::validate_run_config(&bad).is_err());
    /// ```
    pub fn validate_run_config(rc: &RunConfig) -> Result<()> {
        if let Some(cpu) = rc.cpu {
            Self::validate_cpu(cpu, rc.concurrency)?;
        }

        if let Some(memory) = rc.memory_mib {
            if !(memory == 0 || (128..=32768).contains(&memory)) {
                return Err(Self::invalid(
                    "runConfig.memoryMiB",
                    format!("invalid value {memory}. Must be 0 or between 128 and 32768"),
                ));
            }
        }

        if let Some(concurrency) = rc.concurrency {
            if !(0..=1000).contains(&concurrency) {
                return Err(Self::invalid(
                    "runConfig.concurrency",
                    format!("invalid value {concurrency}. Must be between 0 and 1000"),
                ));
            }
        }

        Self::validate_cpu_memory(rc.cpu, rc.memory_mib)?;
        Self::validate_instances(rc.min_instances, rc.max_instances)?;

        if let Some(access) = &rc.vpc_access {
            vpc::validate_vpc_access(access)?;
        }

        Ok(())
    }

    #[allow(clippy::float_cmp)]
    fn validate_cpu(cpu: f32, concurrency: Option<i32>) -> Result<()> {
        let allowed = cpu == 0.0
            || (0.08..1.0).contains(&cpu)
            || [1.0, 2.0, 4.0, 6.0, 8.0].contains(&cpu);
        if !allowed {
            return Err(Self::invalid(
                "runConfig.cpu",
                format!("invalid value {cpu}. Valid values are 0, 0.08 to <1, 1, 2, 4, 6, or 8"),
            ));
        }

        // Unset concurrency defaults to 80 server-side.
        if cpu > 0.0 && cpu < 1.0 && concurrency != Some(1) {
            return Err(Self::invalid(
                "runConfig.cpu",
                "maximum concurrency must be set to 1 if CPU is less than 1",
            ));
        }

        Ok(())
    }

    fn validate_cpu_memory(cpu: Option<f32>, memory: Option<i32>) -> Result<()> {
        const CPU_FOR_MEMORY: [(i32, f32); 4] = [(24576, 8.0), (16384, 6.0), (8192, 4.0), (4096, 2.0)];

        match (cpu, memory) {
            (Some(cpu), Some(memory)) => {
                for (threshold, min_cpu) in CPU_FOR_MEMORY {
                    if memory >= threshold && cpu < min_cpu {
                        return Err(Self::invalid(
                            "runConfig",
                            format!("a minimum of {min_cpu} CPUs is required for memory >= {threshold} MiB, got CPU {cpu}"),
                        ));
                    }
                }
                if memory > 1024 && cpu < 1.0 {
                    return Err(Self::invalid(
                        "runConfig",
                        format!("a minimum of 1 CPU is required for memory > 1024 MiB, got CPU {cpu}"),
                    ));
                }
                if memory > 512 && cpu < 0.5 {
                    return Err(Self::invalid(
                        "runConfig",
                        format!("a minimum of 0.5 CPU is required for memory > 512 MiB, got CPU {cpu}"),
                    ));
                }
                if cpu >= 6.0 && memory < 4096 {
                    return Err(Self::invalid(
                        "runConfig",
                        format!("a minimum of 4096 MiB memory is required for 6 CPUs, got {memory} MiB"),
                    ));
                }
                if cpu >= 4.0 && memory < 2048 {
                    return Err(Self::invalid(
                        "runConfig",
                        format!("a minimum of 2048 MiB memory is required for 4 CPUs, got {memory} MiB"),
                    ));
                }
            }
            // Server default memory is 512 MiB.
            (Some(cpu), None) if cpu >= 4.0 => {
                let needed = if cpu >= 6.0 { 4096 } else { 2048 };
                return Err(Self::invalid(
                    "runConfig",
                    format!("a minimum of {needed} MiB memory is required for {cpu} CPUs, but memoryMiB is not set"),
                ));
            }
            // Server default cpu is 1.
            (None, Some(memory)) if memory >= 4096 => {
                return Err(Self::invalid(
                    "runConfig",
                    format!("a minimum of 2 CPUs is required for memory {memory} MiB, but CPU is not set"),
                ));
            }
            _ => {}
        }

        Ok(())
    }

    fn validate_instances(min: Option<i32>, max: Option<i32>) -> Result<()> {
        if let Some(min) = min {
            if min < 0 {
                return Err(Self::invalid(
                    "runConfig.minInstances",
                    format!("invalid value {min}. Must be >= 0"),
                ));
            }
        }

        match (min, max) {
            (_, Some(max)) if max < 0 => Err(Self::invalid(
                "runConfig.maxInstances",
                format!("invalid value {max}. Must be >= 0"),
            )),
            (Some(min), Some(max)) if max > 0 && min > max => Err(Self::invalid(
                "runConfig.minInstances",
                format!("{min} cannot be greater than runConfig.maxInstances ({max})"),
            )),
            (Some(min), None) if min > 100 => Err(Self::invalid(
                "runConfig.minInstances",
                format!("invalid value {min}. Must be <= 100 if maxInstances is not set"),
            )),
            _ => Ok(()),
        }
    }

    /// Validate a single environment variable declaration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a bad name, or unless exactly one of
    /// `value` and `secret` is set.
    pub fn validate_env_var(var: &EnvironmentVariable, index: usize) -> Result<()> {
        let field = format!("env[{index}]");
        Self::validate_env_var_name(&format!("{field}.variable"), &var.variable)?;

        match (var.literal_value(), var.secret_reference()) {
            (Some(_), Some(_)) => Err(Self::invalid(
                &field,
                format!("{}: both 'value' and 'secret' fields cannot be present", var.variable),
            )),
            (None, None) => Err(Self::invalid(
                &field,
                format!("{}: either 'value' or 'secret' field is required", var.variable),
            )),
            _ => Ok(()),
        }
    }

    /// Ensures the name is non-empty, alphanumeric plus underscore, and does
    /// not start with a digit.
    fn validate_env_var_name(field: &str, name: &str) -> Result<()> {
        let Some(first) = name.chars().next() else {
            return Err(Self::invalid(field, "environment variable name cannot be empty"));
        };

        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Self::invalid(
                field,
                format!("invalid environment variable name {name:?} (must be alphanumeric + underscore)"),
            ));
        }

        if first.is_ascii_digit() {
            return Err(Self::invalid(
                field,
                format!("environment variable {name:?} must not start with a digit"),
            ));
        }

        Ok(())
    }

    fn invalid(field: &str, message: impl Into<String>) -> Error {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}
