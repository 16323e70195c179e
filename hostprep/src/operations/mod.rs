//! Pipeline operations.
//!
//! - [`prepare`] resolves a backend's configuration, pins and dereferences
//!   its secrets, and writes the resolved document, the build environment
//!   and the build-directory context
//! - [`publish`] combines the resolved document with the framework
//!   adapter's bundle into the final build schema
//!
//! Prepare is split into a resolve phase and a write phase so a failed run
//! writes nothing.
//!
//! # Examples
//!
//! ```no_run
//! use hostprep::operations::{prepare, PrepareOptions};
//! use hostprep::secrets::{Deadline, InMemorySecretStore};
//! use std::path::{Path, PathBuf};
//! use std::time::Duration;
//!
//! let store = InMemorySecretStore::load_file(Path::new("secrets.yaml")).unwrap();
//! let options = PrepareOptions::new("my-project", "/out/apphosting.yaml", "/out/.env")
//!     .with_document_path(Some(PathBuf::from("apphosting.yaml")))
//!     .with_environment_name(Some("staging".to_string()))
//!     .with_deadline(Deadline::after(Duration::from_secs(60)));
//!
//! let outcome = prepare(&options, &store).unwrap();
//! println!("{} build variables", outcome.build_env.len());
//! ```

pub mod build_context;
pub mod prepare;
pub mod publish;

pub use build_context::BuildDirectoryContext;
pub use prepare::{prepare, resolve, BuildContextTarget, PrepareOptions, PrepareOutcome};
pub use publish::{merge_bundle_env, publish, BuildSchema};
