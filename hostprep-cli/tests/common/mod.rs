//! Common test utilities for CLI integration tests.
//!
//! This module provides shared helpers for CLI testing, including:
//! - Test environment setup with temporary directories
//! - Command builder helpers for common patterns
//! - Test data fixtures

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Project id the fixture secrets are stored under.
#[allow(dead_code)]
pub const PROJECT_ID: &str = "cli-project";

/// Base document with a literal, a build secret and a runtime secret.
#[allow(dead_code)]
pub const DOCUMENT: &str = "\
runConfig:
  cpu: 1
  memoryMiB: 512
env:
  - variable: API_URL
    value: api.service.com
    availability:
      - BUILD
      - RUNTIME
  - variable: API_KEY
    secret: api-key
    availability:
      - BUILD
  - variable: DB_PASSWORD
    secret: db-password@1
    availability:
      - RUNTIME
";

/// Staging overlay replacing `API_URL`.
#[allow(dead_code)]
pub const STAGING_OVERLAY: &str = "\
env:
  - variable: API_URL
    value: staging.api.service.com
    availability:
      - BUILD
";

/// Secret store contents for [`DOCUMENT`].
#[allow(dead_code)]
pub const SECRETS: &str = "\
secrets:
  projects/cli-project/secrets/api-key:
    versions:
      1: old-key
      4: current-key
  projects/cli-project/secrets/db-password:
    versions:
      1: hunter2
";

/// Framework bundle for the publish step.
#[allow(dead_code)]
pub const BUNDLE: &str = "\
version: v1
runConfig:
  runCommand: node server.js
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

/// Test environment with an isolated workspace.
pub struct TestEnv {
    /// Temporary directory (kept alive for the duration of the test)
    #[allow(dead_code)]
    temp_dir: TempDir,
    /// Path to the temporary directory
    pub temp_path: PathBuf,
}

#[allow(dead_code)]
impl TestEnv {
    /// Create a new test environment with an empty workspace.
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let temp_path = temp_dir.path().to_path_buf();
        Self {
            temp_dir,
            temp_path,
        }
    }

    /// Create a test environment holding the fixture backend.
    ///
    /// The workspace gets `apphosting.yaml`, `apphosting.staging.yaml`,
    /// `secrets.yaml`, `bundle.yaml` and an application at `apps/web`.
    pub fn with_backend() -> Self {
        let env = Self::new();
        env.write_file("apphosting.yaml", DOCUMENT);
        env.write_file("apphosting.staging.yaml", STAGING_OVERLAY);
        env.write_file("secrets.yaml", SECRETS);
        env.write_file("bundle.yaml", BUNDLE);
        env.write_file("apps/web/package.json", "{}\n");
        env
    }

    /// Get a command builder for the hostprep binary.
    ///
    /// Every `HOSTPREP_*` variable the CLI reads is cleared so the host
    /// environment cannot leak into a test.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("hostprep").expect("Failed to find hostprep binary");
        for var in [
            "HOSTPREP_LOG_MODE",
            "HOSTPREP_PROJECT_ID",
            "HOSTPREP_REGION",
            "HOSTPREP_ENVIRONMENT_NAME",
            "HOSTPREP_DOCUMENT",
            "HOSTPREP_WORKSPACE_PATH",
            "HOSTPREP_BACKEND_ROOT_DIRECTORY",
            "HOSTPREP_DOCUMENT_OUTPUT",
            "HOSTPREP_PREPROCESSED_OUTPUT",
            "HOSTPREP_ENV_OUTPUT",
            "HOSTPREP_ENV_LAYOUT",
            "HOSTPREP_BUILD_CONTEXT_OUTPUT",
            "HOSTPREP_CONSOLE_ENV",
            "HOSTPREP_FIREBASE_CONFIG",
            "HOSTPREP_FIREBASE_WEBAPP_CONFIG",
            "HOSTPREP_SECRETS_FILE",
            "HOSTPREP_TIMEOUT_SECONDS",
            "HOSTPREP_BUNDLE",
            "HOSTPREP_SCHEMA_OUTPUT",
        ] {
            cmd.env_remove(var);
        }
        cmd.current_dir(&self.temp_path);
        cmd
    }

    /// A `prepare` command wired to the fixture backend.
    ///
    /// Outputs land under `out/`.
    pub fn prepare(&self) -> Command {
        let mut cmd = self.command();
        cmd.arg("prepare")
            .arg("--project-id")
            .arg(PROJECT_ID)
            .arg("--workspace-path")
            .arg(&self.temp_path)
            .arg("--backend-root-directory")
            .arg("apps/web")
            .arg("--secrets-file")
            .arg(self.path_to("secrets.yaml"))
            .arg("--document-output")
            .arg(self.path_to("out/apphosting.yaml"))
            .arg("--env-output")
            .arg(self.path_to("out/.env"));
        cmd
    }

    /// Get the temp path.
    pub fn path(&self) -> &Path {
        &self.temp_path
    }

    /// Absolute path of a file inside the workspace.
    pub fn path_to(&self, relative: &str) -> PathBuf {
        self.temp_path.join(relative)
    }

    /// Write a file inside the workspace, creating parent directories.
    pub fn write_file(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.path_to(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&path, contents).expect("Failed to write test file");
        path
    }

    /// Read a file inside the workspace.
    pub fn read_file(&self, relative: &str) -> String {
        std::fs::read_to_string(self.path_to(relative)).expect("Failed to read test file")
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the JSON error report the CLI prints as its last stderr line.
#[allow(dead_code)]
pub fn parse_report(stderr: &[u8]) -> serde_json::Value {
    let text = String::from_utf8_lossy(stderr);
    let line = text
        .lines()
        .rev()
        .find(|line| line.starts_with('{'))
        .expect("stderr should carry a JSON report");
    serde_json::from_str(line).expect("report should be valid JSON")
}
