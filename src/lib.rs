// ============================================================================
// Linting
// ============================================================================

#![forbid(unsafe_code)]               // Unsafe code is forbidden
#![warn(missing_docs)]                // Public items should be documented
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

#![warn(unused_imports)]
#![warn(unused_variables)]
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]
#![deny(non_upper_case_globals)]
#![deny(nonstandard_style)]
#![forbid(unsafe_op_in_unsafe_fn)]

// Clippy lints (warnings only)
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]
#![warn(clippy::todo)]
#![warn(clippy::unimplemented)]
#![warn(clippy::unwrap_in_result)]
#![warn(clippy::redundant_clone)]
#![warn(clippy::cognitive_complexity)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Stackshift
//!
//! Change-set driven `CloudFormation` deployments with review, confirmation
//! and live monitoring.
//!
//! ## Overview
//!
//! A deploy never calls `UpdateStack` directly. Instead stackshift:
//!
//! 1. Checks whether the stack exists, asking before creating a new one
//! 2. Optionally shows a line diff of the deployed template
//! 3. Creates a change set and waits for it to be ready
//! 4. Renders the proposed resource changes for review
//! 5. Executes the change set (after confirmation for protected stacks)
//! 6. Follows the stack to a terminal status, surfacing failed resources
//! 7. Offers to delete a stack whose creation rolled back
//!
//! ## Modules
//!
//! - [`config`]: Settings, deployments and parameter files
//! - [`cloudformation`]: Remote API traits, AWS adapters and the status model
//! - [`planner`]: Template diff, change-set lifecycle and change rendering
//! - [`deployer`]: Deploy orchestration, stack monitoring and backoff
//! - [`cli`]: Command-line interface and console output
//!
//! ## Example
//!
//! ```yaml
//! # stackshift.yaml
//! aws:
//!   region: eu-west-1
//! polling:
//!   timeout_secs: 1800
//! staging:
//!   bucket: my-template-bucket
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod cloudformation;
pub mod config;
pub mod deployer;
pub mod error;
pub mod planner;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, ConsoleSink};
pub use cloudformation::{
    CloudFormationApi, CloudFormationClient, IdentityApi, S3TemplateStager, StackStatus,
    StsIdentityClient, TemplateStager,
};
pub use config::{ConfigValidator, Deployment, DeploymentBuilder, Settings, SettingsParser};
pub use deployer::{DeployOutcome, Deployer, OutputSink, StackMonitor};
pub use error::{Result, StackshiftError};
pub use planner::{ChangeFormatter, ChangeSetManager, DiffEngine};
