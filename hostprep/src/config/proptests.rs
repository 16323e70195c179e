//! Property-based tests for the configuration model.

use std::collections::{BTreeMap, HashSet};

use proptest::prelude::*;

use super::merger::ConfigMerger;
use super::schema::{Availability, Configuration, EnvironmentVariable, RunConfig, Scripts};
use super::validator::ConfigValidator;

fn availability_strategy() -> impl Strategy<Value = Option<Vec<Availability>>> {
    prop_oneof![
        Just(None),
        Just(Some(vec![Availability::Build])),
        Just(Some(vec![Availability::Runtime])),
        Just(Some(vec![Availability::Build, Availability::Runtime])),
    ]
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9_./:-]{0,30}"
}

// Unique names, each with a literal value or a secret reference.
fn env_strategy() -> impl Strategy<Value = Vec<EnvironmentVariable>> {
    prop::collection::btree_map(
        "[A-Z][A-Z0-9_]{0,15}",
        (any::<bool>(), value_strategy(), availability_strategy()),
        0..8,
    )
    .prop_map(|vars: BTreeMap<String, (bool, String, Option<Vec<Availability>>)>| {
        vars.into_iter()
            .map(|(name, (is_secret, content, availability))| {
                let availability = availability.as_deref();
                if is_secret {
                    EnvironmentVariable::secret_ref(name, content, availability)
                } else {
                    EnvironmentVariable::literal(name, content, availability)
                }
            })
            .collect()
    })
}

fn run_config_strategy() -> impl Strategy<Value = RunConfig> {
    // Sizing pairs that satisfy the cpu/memory tiers.
    let sizing = prop::sample::select(vec![
        (None, None),
        (Some(0.0f32), None),
        (Some(0.0), Some(512)),
        (Some(1.0), None),
        (Some(1.0), Some(1024)),
        (Some(2.0), Some(2048)),
        (Some(2.0), Some(4096)),
        (None, Some(128)),
    ]);
    (
        sizing,
        prop::option::of(2i32..=1000),
        prop::option::of(0i32..=100),
        prop::option::of(0i32..=100),
        prop::option::of(any::<bool>()),
    )
        .prop_map(|((cpu, memory_mib), concurrency, max_instances, min_instances, always)| {
            let max_instances = match (min_instances, max_instances) {
                (Some(min), Some(max)) if max > 0 && min > max => Some(min),
                (_, max) => max,
            };
            RunConfig {
                cpu,
                memory_mib,
                concurrency,
                max_instances,
                min_instances,
                cpu_always_allocated: always,
                vpc_access: None,
            }
        })
}

fn config_strategy() -> impl Strategy<Value = Configuration> {
    (
        run_config_strategy(),
        env_strategy(),
        prop::option::of(value_strategy()),
        prop::option::of(value_strategy()),
    )
        .prop_map(|(run_config, env, build_command, run_command)| Configuration {
            run_config,
            env,
            scripts: Scripts {
                build_command,
                run_command,
            },
            ..Default::default()
        })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 500,
        .. ProptestConfig::default()
    })]

    // Serializing and re-decoding yields the same document
    #[test]
    fn config_yaml_round_trip(config in config_strategy()) {
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back: Configuration = serde_yaml::from_str(&yaml).unwrap();
        prop_assert_eq!(back, config);
    }

    // Generated documents pass validation
    #[test]
    fn generated_configs_validate(config in config_strategy()) {
        prop_assert!(ConfigValidator::validate(&config).is_ok());
    }

    // Overlay scalar fields win whenever they are set
    #[test]
    fn overlay_run_config_wins(base in run_config_strategy(), overlay in run_config_strategy()) {
        let mut merged = Configuration { run_config: base.clone(), ..Default::default() };
        let over = Configuration { run_config: overlay.clone(), ..Default::default() };
        ConfigMerger::merge_into(&mut merged, &over);

        prop_assert_eq!(merged.run_config.cpu, overlay.cpu.or(base.cpu));
        prop_assert_eq!(merged.run_config.memory_mib, overlay.memory_mib.or(base.memory_mib));
        prop_assert_eq!(merged.run_config.concurrency, overlay.concurrency.or(base.concurrency));
        prop_assert_eq!(merged.run_config.max_instances, overlay.max_instances.or(base.max_instances));
        prop_assert_eq!(merged.run_config.min_instances, overlay.min_instances.or(base.min_instances));
    }

    // Overlay variables win outright and base-only variables survive
    #[test]
    fn env_merge_precedence(base in env_strategy(), overlay in env_strategy()) {
        let merged = ConfigMerger::merge_env_vars(&base, &overlay);

        let names: Vec<&str> = merged.iter().map(|v| v.variable.as_str()).collect();
        let unique: HashSet<&str> = names.iter().copied().collect();
        prop_assert_eq!(names.len(), unique.len());

        for var in &overlay {
            let found = merged.iter().find(|m| m.variable == var.variable).unwrap();
            prop_assert_eq!(found, var);
        }
        for var in &base {
            if !overlay.iter().any(|o| o.variable == var.variable) {
                let found = merged.iter().find(|m| m.variable == var.variable).unwrap();
                prop_assert_eq!(found, var);
            }
        }
    }

    // Merging an empty overlay changes nothing
    #[test]
    fn empty_overlay_is_identity(config in config_strategy()) {
        let mut merged = config.clone();
        ConfigMerger::merge_into(&mut merged, &Configuration::default());
        prop_assert_eq!(merged, config);
    }
}
