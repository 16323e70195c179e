//! Integration tests for the `publish` and `validate` commands.

mod common;

use common::{parse_report, TestEnv};
use predicates::prelude::*;

// ============================================================================
// Publish
// ============================================================================

/// Test that publish merges a prepared document with the bundle.
#[test]
fn test_publish_after_prepare() {
    let env = TestEnv::with_backend();
    env.prepare().assert().success();

    env.command()
        .arg("publish")
        .arg("--document")
        .arg(env.path_to("out/apphosting.yaml"))
        .arg("--bundle")
        .arg(env.path_to("bundle.yaml"))
        .arg("--output")
        .arg(env.path_to("out/schema.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote build schema"));

    let schema: serde_yaml::Value =
        serde_yaml::from_str(&env.read_file("out/schema.yaml")).unwrap();
    let names: Vec<&str> = schema["env"]
        .as_sequence()
        .unwrap()
        .iter()
        .filter_map(|v| v["variable"].as_str())
        .collect();
    assert!(names.contains(&"API_URL"));
    assert!(names.contains(&"HOSTNAME"));
    assert_eq!(
        schema["metadata"]["adapterPackageName"].as_str(),
        Some("@apphosting/adapter-nextjs")
    );
    assert_eq!(schema["runConfig"]["cpu"].as_f64(), Some(1.0));
}

/// Test that a missing bundle is an internal failure.
#[test]
fn test_publish_missing_bundle() {
    let env = TestEnv::with_backend();
    let output = env
        .command()
        .arg("publish")
        .arg("--document")
        .arg(env.path_to("apphosting.yaml"))
        .arg("--bundle")
        .arg(env.path_to("missing.yaml"))
        .arg("--output")
        .arg(env.path_to("out/schema.yaml"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(parse_report(&output.stderr)["isUserAttributed"], false);
    assert!(!env.path_to("out/schema.yaml").exists());
}

// ============================================================================
// Validate
// ============================================================================

/// Test that a valid document passes.
#[test]
fn test_validate_valid_document() {
    let env = TestEnv::with_backend();
    env.command()
        .arg("validate")
        .arg(env.path_to("apphosting.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

/// Test that validate also checks the requested overlay.
#[test]
fn test_validate_with_invalid_overlay() {
    let env = TestEnv::with_backend();
    env.write_file(
        "apphosting.prod.yaml",
        "env:\n  - variable: A\n    value: x\n    secret: y\n",
    );

    env.command()
        .arg("validate")
        .arg(env.path_to("apphosting.yaml"))
        .args(["--environment-name", "prod"])
        .assert()
        .code(100)
        .stderr(predicate::str::contains("apphosting.prod.yaml"));
}

/// Test that a schema violation exits with the user error code.
#[test]
fn test_validate_invalid_document() {
    let env = TestEnv::new();
    let path = env.write_file(
        "apphosting.yaml",
        "runConfig:\n  cpu: 0.5\n  concurrency: 2\n",
    );

    env.command()
        .arg("validate")
        .arg(&path)
        .assert()
        .code(100)
        .stderr(predicate::str::contains("hostprep/invalid-config-yaml"));
}

/// Test that a missing file is an invalid argument.
#[test]
fn test_validate_missing_file() {
    let env = TestEnv::new();
    env.command()
        .arg("validate")
        .arg(env.path_to("apphosting.yaml"))
        .assert()
        .code(4)
        .stderr(predicate::str::contains("File not found"));
}
