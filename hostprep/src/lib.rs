#![deny(missing_docs, unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! # hostprep
//!
//! A library for preparing a hosted backend's build: it resolves layered
//! configuration documents into one validated configuration and materializes
//! the environment the build step sees.
//!
//! ## Core Types
//!
//! - [`Configuration`] and [`EnvironmentVariable`]: the document model
//! - [`PrepareOptions`] and [`prepare`]: the resolution pipeline
//! - [`SecretStore`]: the secret store capability
//! - [`Error`] and [`Result`]: Error handling types
//! - [`Logger`] and [`LogLevel`]: Logging infrastructure
//!
//! ## Examples
//!
//! ```
//! use hostprep::config::ConfigLoader;
//! use hostprep::secrets::{build_env_map, normalize, pin_versions, Deadline, InMemorySecretStore};
//! use std::path::Path;
//!
//! let yaml = "env:\n  - variable: API_KEY\n    secret: api-key\n    availability:\n      - BUILD\n";
//! let mut config = ConfigLoader::parse(yaml, Path::new("apphosting.yaml")).unwrap();
//! let store = InMemorySecretStore::new().with_version("projects/demo/secrets/api-key", 3, "s3cr3t");
//!
//! normalize(&mut config.env, "demo").unwrap();
//! pin_versions(&store, &mut config.env, &Deadline::none()).unwrap();
//! assert_eq!(config.env[0].secret.as_deref(), Some("projects/demo/secrets/api-key/versions/3"));
//!
//! let build_env = build_env_map(&store, &config.env, &Deadline::none()).unwrap();
//! assert_eq!(build_env["API_KEY"], "s3cr3t");
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod operations;
pub mod output;
pub mod secrets;

// Re-export key types at crate root for convenience
pub use config::{Availability, Configuration, EnvironmentVariable, RunConfig};
pub use error::{Error, ErrorReport, Result};
pub use logging::{init_logger, LogLevel, Logger};
pub use operations::{prepare, publish, PrepareOptions, PrepareOutcome};
pub use secrets::{Deadline, InMemorySecretStore, SecretStore};
