//! Backend configuration model and resolution.
//!
//! A backend is described by `apphosting.yaml`, optionally refined by an
//! environment overlay such as `apphosting.staging.yaml`. This module
//! decodes and validates those documents, merges the overlay, and composes
//! environment variables from the console, the documents and the platform.
//!
//! # Precedence
//!
//! For environment variables (highest to lowest):
//!
//! 1. Console variables
//! 2. Environment overlay (`apphosting.<env>.yaml`)
//! 3. Base document (`apphosting.yaml`)
//! 4. Platform-injected variables
//!
//! # Examples
//!
//! ```
//! use hostprep::config::{ConfigLoader, EnvComposer};
//! use std::path::Path;
//!
//! let yaml = "env:\n  - variable: API_URL\n    value: api.service.com\n";
//! let config = ConfigLoader::parse(yaml, Path::new("apphosting.yaml")).unwrap();
//!
//! let env = EnvComposer::new()
//!     .with_system_config(Some(r#"{"projectId":"demo"}"#), None)
//!     .compose(config.env);
//! assert_eq!(env.len(), 2);
//! ```

pub mod bundle;
pub mod environment;
pub mod loader;
pub mod merger;
pub mod schema;
pub mod validator;
pub mod vpc;

#[cfg(test)]
mod proptests;

pub use bundle::{BundleMetadata, BundleRunConfig, BundleSchema};
pub use environment::{
    is_reserved_key, parse_console_env, sanitize, EnvComposer, FIREBASE_CONFIG,
    FIREBASE_WEBAPP_CONFIG,
};
pub use loader::{ConfigLoader, BASE_DOCUMENT};
pub use merger::ConfigMerger;
pub use schema::{
    Availability, Configuration, EnvironmentVariable, NetworkInterface, OutputFiles, Provenance,
    RunConfig, Scripts, ServerApp, VpcAccess, DEFAULT_AVAILABILITY,
};
pub use validator::ConfigValidator;
