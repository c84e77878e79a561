//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Stackshift - change-set driven `CloudFormation` deployments.
#[derive(Parser, Debug)]
#[command(name = "stackshift")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the settings file.
    #[arg(short, long, global = true, env = "STACKSHIFT_CONFIG")]
    pub config: Option<PathBuf>,

    /// AWS profile to use.
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// AWS region to deploy to.
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Override the `CloudFormation` endpoint URL.
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create or update a stack through a reviewed change set.
    Deploy {
        /// Template and parameters.
        #[command(flatten)]
        target: TargetArgs,

        /// Tenant the stack is deployed for.
        #[arg(long)]
        tenant: Option<String>,

        /// Manifest label of the stack.
        #[arg(long)]
        label: Option<String>,

        /// Resolved constants (Key=Value, repeatable).
        #[arg(long = "constant", value_name = "KEY=VALUE")]
        constants: Vec<String>,

        /// Stack tags (Key=Value, repeatable).
        #[arg(long = "tag", value_name = "KEY=VALUE")]
        tags: Vec<String>,

        /// Ask before executing the change set.
        #[arg(long)]
        protected: bool,

        /// Show the template diff before creating the change set.
        #[arg(long)]
        diff: bool,

        /// Answer yes to every prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the diff between the deployed and local template.
    Diff {
        /// Template and parameters.
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Show the AWS identity in use.
    Whoami,
}

/// Arguments naming a template and the stack it deploys to.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Path to the template file.
    #[arg(short = 't', long)]
    pub template_file: PathBuf,

    /// Stack name (defaults to the template file stem).
    #[arg(short, long)]
    pub stack_name: Option<String>,

    /// Template parameters (Key=Value, repeatable).
    #[arg(short = 'P', long = "parameter", value_name = "KEY=VALUE")]
    pub parameters: Vec<String>,

    /// Parameter files, applied in order before inline parameters.
    #[arg(long = "parameter-file", value_name = "PATH")]
    pub parameter_files: Vec<PathBuf>,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_deploy() {
        let cli = Cli::try_parse_from([
            "stackshift",
            "--region",
            "eu-west-1",
            "deploy",
            "-t",
            "web.yaml",
            "-P",
            "Env=prod",
            "--parameter",
            "Size=2",
            "--tag",
            "team=core",
            "--tenant",
            "acme",
            "--constant",
            "Domain=acme.test",
            "--protected",
            "-y",
        ])
        .unwrap();

        assert_eq!(cli.region.as_deref(), Some("eu-west-1"));
        match cli.command {
            Commands::Deploy {
                target,
                tenant,
                label,
                constants,
                tags,
                protected,
                diff,
                yes,
            } => {
                assert_eq!(target.template_file, PathBuf::from("web.yaml"));
                assert_eq!(target.stack_name, None);
                assert_eq!(target.parameters, vec!["Env=prod", "Size=2"]);
                assert_eq!(tags, vec!["team=core"]);
                assert_eq!(tenant.as_deref(), Some("acme"));
                assert_eq!(label, None);
                assert_eq!(constants, vec!["Domain=acme.test"]);
                assert!(protected);
                assert!(!diff);
                assert!(yes);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["stackshift", "whoami", "--no-color", "-v"]).unwrap();

        assert!(cli.no_color);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Whoami));
    }

    #[test]
    fn test_diff_requires_template() {
        assert!(Cli::try_parse_from(["stackshift", "diff"]).is_err());
    }
}
