//! CLI command implementations.
//!
//! This module contains the implementations of all CLI commands:
//! - `prepare`: Resolve the configuration and write the build inputs
//! - `publish`: Merge the resolved configuration with the framework bundle
//! - `validate`: Validate a configuration document
//! - `completions`: Generate shell completion scripts

pub mod completions;
pub mod prepare;
pub mod publish;
pub mod validate;

pub use completions::CompletionsCommand;
pub use prepare::PrepareCommand;
pub use publish::PublishCommand;
pub use validate::ValidateCommand;
