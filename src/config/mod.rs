//! Configuration module for stackshift.
//!
//! This module handles all input-side functionality:
//! - Loading `stackshift.yaml` settings with environment overrides
//! - Assembling a [`Deployment`] from a template and parameter sources
//! - Validation of settings and deployments
//! - Template fingerprints

mod deployment;
mod hash;
mod parameters;
mod parser;
mod settings;
mod validator;

pub use deployment::{Deployment, DeploymentBuilder};
pub use hash::TemplateHasher;
pub use parameters::{load_parameter_file, parse_key_value, parse_parameters};
pub use parser::{DEFAULT_SETTINGS_FILES, SettingsParser, find_settings_file};
pub use settings::{AwsSettings, PollSettings, Settings, StagingSettings};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
