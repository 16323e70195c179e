//! Common test utilities for integration tests.
//!
//! Fixtures live under `tests/fixtures/`; tests read them in place and write
//! every output into a temporary directory.

use std::path::{Path, PathBuf};

use hostprep::operations::PrepareOptions;
use hostprep::secrets::InMemorySecretStore;
use tempfile::TempDir;

/// Project id the fixture secrets are stored under.
#[allow(dead_code)]
pub const PROJECT_ID: &str = "test-project";

/// Region used to expand bare VPC ids.
#[allow(dead_code)]
pub const REGION: &str = "us-central1";

/// Path to a file or directory under `tests/fixtures`.
#[allow(dead_code)]
pub fn fixture_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(relative)
}

/// The secret store described by `fixtures/backend/secrets.yaml`.
#[allow(dead_code)]
pub fn fixture_store() -> InMemorySecretStore {
    InMemorySecretStore::load_file(&fixture_path("backend/secrets.yaml"))
        .expect("fixture secrets file should load")
}

/// Prepare options reading the backend fixture and writing into `out`.
#[allow(dead_code)]
pub fn backend_options(out: &Path) -> PrepareOptions {
    PrepareOptions::new(
        PROJECT_ID,
        out.join("output/apphosting.yaml"),
        out.join("output/.env"),
    )
    .with_document_path(Some(fixture_path("backend/apphosting.yaml")))
    .with_region(Some(REGION.to_string()))
}

/// Creates a temporary directory for test outputs.
#[allow(dead_code)]
pub fn create_temp_dir() -> TempDir {
    TempDir::new().expect("temporary directory should be created")
}
