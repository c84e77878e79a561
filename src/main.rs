//! Stackshift CLI entrypoint.
//!
//! This is the main entrypoint for the stackshift command-line tool.

use std::path::Path;
use std::process::ExitCode;

use stackshift::cli::{Cli, Commands, ConsoleSink, TargetArgs};
use stackshift::cloudformation::{
    CloudFormationClient, IdentityApi, S3TemplateStager, StsIdentityClient, TemplateStager,
};
use stackshift::config::{
    AwsSettings, ConfigValidator, Deployment, DeploymentBuilder, Settings, SettingsParser,
    parse_key_value,
};
use stackshift::deployer::{Deployer, OutputSink, whoami};
use stackshift::error::Result;

use aws_config::SdkConfig;
use clap::Parser;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("\nError: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// Logs go to stderr and stay at `warn` unless verbose, so they do not
/// interleave with deploy output.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point. Returns whether the command succeeded.
async fn run(cli: Cli) -> Result<bool> {
    let settings = load_settings(&cli)?;

    if cli.no_color || !settings.color {
        colored::control::set_override(false);
    }

    let sdk_config = load_aws_config(&settings.aws).await;
    debug!(
        "Using region {}",
        sdk_config.region().map_or("(none)", |r| r.as_ref())
    );

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
            let labels = Labels {
                tenant,
                stack: label,
                constants,
                tags,
            };
            cmd_deploy(&settings, &sdk_config, &target, labels, protected, diff, yes).await
        }
        Commands::Diff { target } => cmd_diff(&settings, &sdk_config, &target).await,
        Commands::Whoami => cmd_whoami(&sdk_config).await,
    }
}

/// Deploy metadata given on the command line.
struct Labels {
    tenant: Option<String>,
    stack: Option<String>,
    constants: Vec<String>,
    tags: Vec<String>,
}

/// Create or update a stack.
async fn cmd_deploy(
    settings: &Settings,
    sdk_config: &SdkConfig,
    target: &TargetArgs,
    labels: Labels,
    protected: bool,
    show_diff: bool,
    auto_approve: bool,
) -> Result<bool> {
    let sink = ConsoleSink::stderr(auto_approve);

    // The account is only announced, so a failed lookup is not fatal.
    let account = match StsIdentityClient::new(sdk_config).get_caller_identity().await {
        Ok(identity) => Some(identity.account),
        Err(e) => {
            warn!("Could not resolve the AWS account: {e}");
            None
        }
    };

    let mut builder = target_builder(target)?
        .tenant_label(labels.tenant)
        .stack_label(labels.stack)
        .protected(protected)
        .account_id(account)
        .region(sdk_config.region().map(ToString::to_string));
    for spec in &labels.constants {
        let (key, value) = parse_key_value(spec)?;
        builder = builder.constant(key, value);
    }
    for tag in &labels.tags {
        let (key, value) = parse_key_value(tag)?;
        builder = builder.tag(key, value);
    }
    let deployment = build_deployment(builder)?;

    let client = CloudFormationClient::new(sdk_config);
    let stager = settings.staging.bucket.as_deref().map(|bucket| {
        S3TemplateStager::new(sdk_config, bucket, settings.staging.prefix.as_deref())
    });

    let deployer = Deployer::new(&client, &sink, &settings.polling)
        .with_stager(stager.as_ref().map(|s| s as &dyn TemplateStager))
        .with_cancel(cancel_on_ctrl_c());

    let outcome = deployer.deploy(&deployment, show_diff).await?;
    info!("Deploy of {} finished: {outcome:?}", deployment.stack_name);

    Ok(outcome.is_success())
}

/// Show the template diff for an existing stack.
async fn cmd_diff(settings: &Settings, sdk_config: &SdkConfig, target: &TargetArgs) -> Result<bool> {
    let sink = ConsoleSink::stderr(false);
    let deployment = build_deployment(target_builder(target)?)?;

    let client = CloudFormationClient::new(sdk_config);
    let deployer = Deployer::new(&client, &sink, &settings.polling);
    let diff = deployer.template_diff(&deployment).await?;

    if diff.has_changes() {
        sink.message(&format!(
            "\n{} additions, {} removals",
            diff.additions, diff.removals
        ));
    }

    Ok(true)
}

/// Show the caller identity.
async fn cmd_whoami(sdk_config: &SdkConfig) -> Result<bool> {
    let sink = ConsoleSink::stderr(false);
    let client = StsIdentityClient::new(sdk_config);
    let region = sdk_config.region().map(ToString::to_string);

    whoami(&client, &sink, region.as_deref()).await?;
    Ok(true)
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Loads settings from file and environment, then applies CLI flags.
fn load_settings(cli: &Cli) -> Result<Settings> {
    let cwd = std::env::current_dir()?;
    let base = cli
        .config
        .as_deref()
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(cwd.as_path());

    let parser = SettingsParser::new().with_base_path(base);
    parser.load_dotenv()?;

    let mut settings = parser.load(cli.config.as_deref(), &cwd)?;
    if let Some(profile) = &cli.profile {
        settings.aws.profile = Some(profile.clone());
    }
    if let Some(region) = &cli.region {
        settings.aws.region = Some(region.clone());
    }
    if let Some(endpoint) = &cli.endpoint {
        settings.aws.endpoint = Some(endpoint.clone());
    }

    let validation = ConfigValidator::new().validate_settings(&settings)?;
    for warning in &validation.warnings {
        warn!("{warning}");
    }

    Ok(settings)
}

/// Builds the shared AWS configuration.
async fn load_aws_config(aws: &AwsSettings) -> SdkConfig {
    let mut loader = aws_config::from_env();
    if let Some(profile) = &aws.profile {
        loader = loader.profile_name(profile);
    }
    if let Some(region) = &aws.region {
        loader = loader.region(aws_config::Region::new(region.clone()));
    }
    if let Some(endpoint) = &aws.endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    loader.load().await
}

/// Starts a deployment builder from the template arguments.
fn target_builder(target: &TargetArgs) -> Result<DeploymentBuilder> {
    let mut builder =
        DeploymentBuilder::new(&target.template_file).stack_name(target.stack_name.clone());
    for path in &target.parameter_files {
        builder = builder.parameter_file(path);
    }
    for spec in &target.parameters {
        let (key, value) = parse_key_value(spec)?;
        builder = builder.parameter(key, value);
    }
    Ok(builder)
}

/// Builds and validates a deployment.
fn build_deployment(builder: DeploymentBuilder) -> Result<Deployment> {
    let deployment = builder.build()?;
    let validation = ConfigValidator::new().validate_deployment(&deployment)?;
    for warning in &validation.warnings {
        warn!("{warning}");
    }
    Ok(deployment)
}

/// Returns a signal that turns true on the first Ctrl-C. A second Ctrl-C
/// exits immediately.
fn cancel_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current poll");
            let _ = tx.send(true);
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
    rx
}
