//! Integration tests for document discovery, loading and overlay merging.

mod common;

use std::fs;

use common::{create_temp_dir, fixture_path};
use hostprep::config::{
    Availability, BundleSchema, ConfigLoader, ConfigValidator, Configuration, Provenance,
    BASE_DOCUMENT,
};
use hostprep::operations::publish;
use hostprep::Error;

// ============================================================================
// Discovery
// ============================================================================

/// Discovery walks up from the backend root to the nearest directory with a
/// document.
#[test]
fn test_detect_walks_up_to_document() {
    let found = ConfigLoader::detect_document_path(&fixture_path("monorepo"), "apps/site")
        .unwrap()
        .unwrap();
    assert_eq!(found, fixture_path("monorepo").join(BASE_DOCUMENT));
}

/// A directory holding only an overlay still counts as the document root.
#[test]
fn test_detect_with_overlay_only() {
    let temp = create_temp_dir();
    fs::create_dir_all(temp.path().join("app/src")).unwrap();
    fs::write(temp.path().join("app/apphosting.dev.yaml"), "env: []\n").unwrap();

    let found = ConfigLoader::detect_document_path(temp.path(), "app/src")
        .unwrap()
        .unwrap();
    assert_eq!(found, temp.path().join("app").join(BASE_DOCUMENT));
    assert!(!found.exists());
    assert_eq!(ConfigLoader::load_file(&found).unwrap(), Configuration::default());
}

/// A missing backend root is the user's to fix.
#[test]
fn test_detect_missing_root() {
    let temp = create_temp_dir();
    let err = ConfigLoader::detect_document_path(temp.path(), "nope").unwrap_err();
    assert!(matches!(err, Error::InvalidRootDirectory { .. }));
    assert_eq!(err.code(), "hostprep/invalid-root-directory");
}

// ============================================================================
// Loading and merging
// ============================================================================

/// The fixture documents load, validate and carry their file as provenance.
#[test]
fn test_load_fixture_documents() {
    let base = ConfigLoader::load_file(&fixture_path("backend/apphosting.yaml")).unwrap();
    ConfigValidator::validate(&base).unwrap();
    assert_eq!(base.env.len(), 6);
    assert_eq!(base.scripts.build_command.as_deref(), Some("npm run build"));
    assert_eq!(base.output_files.server_app.include, vec![".next", "public"]);
    assert!(base
        .env
        .iter()
        .all(|v| v.source == Provenance::File("apphosting.yaml".to_string())));

    let upload = base.find_env("MAX_UPLOAD").unwrap();
    assert_eq!(upload.value.as_deref(), Some("1048576"));
}

/// Overlay-only variables are added, base-only ones kept, shared ones
/// replaced whole.
#[test]
fn test_overlay_merge_precedence() {
    let base_path = fixture_path("backend/apphosting.yaml");
    let merged = ConfigLoader::load_with_overlay(Some(&base_path), Some("staging")).unwrap();

    let api_url = merged.find_env("API_URL").unwrap();
    assert_eq!(api_url.value.as_deref(), Some("staging.api.service.com"));
    assert_eq!(api_url.availability, Some(vec![Availability::Build]));

    assert!(merged.declares("STAGING_ONLY"));
    assert!(merged.declares("STORAGE_BUCKET"));
    assert_eq!(merged.env.len(), 7);
    assert_eq!(merged.run_config.min_instances, Some(1));
    assert_eq!(merged.run_config.cpu, Some(1.0));
}

/// An empty environment name leaves the base untouched.
#[test]
fn test_empty_environment_name() {
    let base_path = fixture_path("backend/apphosting.yaml");
    let base = ConfigLoader::load_with_overlay(Some(&base_path), None).unwrap();
    let empty = ConfigLoader::load_with_overlay(Some(&base_path), Some("")).unwrap();
    assert_eq!(base, empty);
}

/// An invalid overlay fails the load even when the base is valid.
#[test]
fn test_invalid_overlay_rejected() {
    let temp = create_temp_dir();
    let base = temp.path().join(BASE_DOCUMENT);
    fs::write(&base, "runConfig:\n  cpu: 1\n").unwrap();
    fs::write(
        temp.path().join("apphosting.prod.yaml"),
        "env:\n  - variable: A\n    value: x\n    secret: y\n",
    )
    .unwrap();

    let err = ConfigLoader::load_with_overlay(Some(&base), Some("prod")).unwrap_err();
    assert!(err.is_user_attributable());
    assert!(err.to_string().contains("apphosting.prod.yaml"));
}

// ============================================================================
// Bundle and publish
// ============================================================================

/// The fixture bundle loads, and publishing keeps the document's values on
/// conflict.
#[test]
fn test_publish_fixture_bundle() {
    let bundle = BundleSchema::load_file(&fixture_path("backend/bundle.yaml")).unwrap();
    assert_eq!(bundle.run_config.environment_variables.len(), 2);

    let temp = create_temp_dir();
    let output = temp.path().join("build/schema.yaml");
    let schema = publish(
        &fixture_path("backend/apphosting.yaml"),
        &fixture_path("backend/bundle.yaml"),
        &output,
    )
    .unwrap();

    let api_urls: Vec<_> = schema.env.iter().filter(|v| v.variable == "API_URL").collect();
    assert_eq!(api_urls.len(), 1);
    assert_eq!(api_urls[0].value.as_deref(), Some("api.service.com"));
    assert!(schema.env.iter().any(|v| v.variable == "HOSTNAME"));
    assert_eq!(schema.metadata.unwrap().adapter_package_name, "@apphosting/adapter-nextjs");
    assert!(output.is_file());
}
