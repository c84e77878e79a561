//! Deployment orchestration.
//!
//! The [`Deployer`] drives one deploy invocation end to end: it checks whether
//! the stack exists, optionally shows the template diff, creates and reviews a
//! change set, executes it, follows the stack to a terminal status and offers
//! to clean up a stack whose creation rolled back.

mod backoff;
mod monitor;
mod sink;
#[cfg(test)]
pub(crate) mod testing;

pub use backoff::{BackoffPolicy, Waiter};
pub use monitor::StackMonitor;
pub use sink::OutputSink;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::cloudformation::{
    CallerIdentity, CloudFormationApi, IdentityApi, StackStatus, TemplateStager,
};
use crate::config::{Deployment, PollSettings, TemplateHasher};
use crate::error::{DeployError, Result, ResultExt};
use crate::planner::{ChangeFormatter, ChangeSetManager, ChangeSetOutcome, DiffEngine, TemplateDiff};

/// How a deploy invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// The change set was executed and the stack reached `status`.
    Completed {
        /// Final stack status.
        status: StackStatus,
    },
    /// The template and parameters match what is deployed.
    NoChange,
    /// The user declined a confirmation.
    Aborted,
    /// A stack whose creation rolled back was deleted.
    Cleaned,
}

impl DeployOutcome {
    /// Returns false when the executed change set ended in failure or
    /// rollback.
    #[must_use]
    pub fn is_success(&self) -> bool {
        match self {
            Self::Completed { status } => !status.is_unsuccessful(),
            Self::NoChange | Self::Aborted | Self::Cleaned => true,
        }
    }
}

/// Orchestrates change set deployments against one CloudFormation client.
pub struct Deployer<'a, C: CloudFormationApi + ?Sized, O: OutputSink + ?Sized> {
    api: &'a C,
    sink: &'a O,
    stager: Option<&'a dyn TemplateStager>,
    polling: PollSettings,
    cancel: Option<watch::Receiver<bool>>,
    diff_engine: DiffEngine,
    formatter: ChangeFormatter,
}

impl<'a, C: CloudFormationApi + ?Sized, O: OutputSink + ?Sized> Deployer<'a, C, O> {
    /// Creates a new deployer.
    #[must_use]
    pub fn new(api: &'a C, sink: &'a O, polling: &PollSettings) -> Self {
        Self {
            api,
            sink,
            stager: None,
            polling: polling.clone(),
            cancel: None,
            diff_engine: DiffEngine::new(),
            formatter: ChangeFormatter::new(),
        }
    }

    /// Uses `stager` for templates above the inline limit.
    #[must_use]
    pub fn with_stager(mut self, stager: Option<&'a dyn TemplateStager>) -> Self {
        self.stager = stager;
        self
    }

    /// Stops polling once `cancel` turns true.
    #[must_use]
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Deploys `deployment`, showing the template diff first when `show_diff`
    /// is set and the stack exists.
    ///
    /// # Errors
    ///
    /// Returns an error if any remote call fails, or the change set cannot be
    /// created, or polling times out or is interrupted. Declined
    /// confirmations are not errors.
    pub async fn deploy(&self, deployment: &Deployment, show_diff: bool) -> Result<DeployOutcome> {
        let stack_name = deployment.stack_name.as_str();
        self.announce(deployment);

        let exists = self
            .stack_exists(stack_name)
            .await
            .with_context(|| format!("describe stack {stack_name}"))?;

        if !exists && !self.confirm(&format!("Stack {stack_name} does not exist. Create?")) {
            info!("Creation of {stack_name} declined");
            return Ok(DeployOutcome::Aborted);
        }

        if exists && show_diff {
            self.render_diff(deployment)
                .await
                .context("template diff")?;
        }

        if self.interrupted() {
            return Ok(DeployOutcome::Aborted);
        }

        let manager = ChangeSetManager::new(self.api, self.polling.change_set_interval())
            .with_stager(self.stager)
            .with_timeout(self.polling.timeout())
            .with_cancel(self.cancel.clone());

        let description = match manager
            .create_and_await(deployment, !exists)
            .await
            .context("create change set")?
        {
            ChangeSetOutcome::Ready(description) => description,
            ChangeSetOutcome::NoChanges => {
                self.sink.message("No change.");
                let stack = self
                    .api
                    .describe_stack(stack_name)
                    .await
                    .context("get stack outputs")?;
                self.show_outputs(&stack.outputs);
                return Ok(DeployOutcome::NoChange);
            }
        };

        self.sink
            .change_set(&self.formatter.format(&description.changes));

        if deployment.protected && !self.confirm("Execute change set?") {
            info!("Execution of {} declined", description.change_set_name);
            return Ok(DeployOutcome::Aborted);
        }
        if self.interrupted() {
            return Ok(DeployOutcome::Aborted);
        }

        let since = Utc::now();
        self.api
            .execute_change_set(&description.stack_name, &description.change_set_name)
            .await
            .context("execute change set")?;
        info!("Executing change set {}", description.change_set_name);

        let stack = self
            .monitor()
            .watch(stack_name, since)
            .await
            .context("monitor stack update")?;

        if !exists
            && stack.status.is_rollback_complete()
            && self.confirm("Stack failed creation, and must be deleted. Continue?")
        {
            info!("Deleting failed stack {stack_name}");
            self.api
                .delete_stack(stack_name)
                .await
                .context("delete failed stack")?;
            self.monitor()
                .watch(stack_name, Utc::now())
                .await
                .context("monitor stack delete")?;
            return Ok(DeployOutcome::Cleaned);
        }

        self.show_outputs(&stack.outputs);
        Ok(DeployOutcome::Completed {
            status: stack.status,
        })
    }

    /// Shows the diff between the deployed template and the deployment's
    /// template.
    ///
    /// # Errors
    ///
    /// Returns an error if the stack does not exist or a remote call fails.
    pub async fn template_diff(&self, deployment: &Deployment) -> Result<TemplateDiff> {
        let stack_name = deployment.stack_name.as_str();
        self.sink.field("StackName", stack_name);

        let exists = self
            .stack_exists(stack_name)
            .await
            .with_context(|| format!("describe stack {stack_name}"))?;
        if !exists {
            return Err(DeployError::StackMissing {
                stack: stack_name.to_string(),
            }
            .into());
        }

        self.render_diff(deployment).await
    }

    async fn render_diff(&self, deployment: &Deployment) -> Result<TemplateDiff> {
        let deployed = self
            .api
            .get_template(&deployment.stack_name)
            .await
            .context("get template")?;

        let diff = self
            .diff_engine
            .compute_diff(&deployed, deployment.template_text()?);
        if diff.has_changes() {
            for line in &diff.lines {
                self.sink.diff_line(line);
            }
        } else {
            self.sink.message("Template unchanged.");
        }
        Ok(diff)
    }

    /// Asks `prompt`. An interruption before or while asking counts as no.
    fn confirm(&self, prompt: &str) -> bool {
        !self.interrupted() && self.sink.confirm(prompt) && !self.interrupted()
    }

    /// Returns true once the cancellation signal is set.
    fn interrupted(&self) -> bool {
        let interrupted = self.cancel.as_ref().is_some_and(|rx| *rx.borrow());
        if interrupted {
            info!("Interrupted, skipping remaining changes");
        }
        interrupted
    }

    async fn stack_exists(&self, stack_name: &str) -> Result<bool> {
        match self.api.describe_stack(stack_name).await {
            Ok(stack) => {
                debug!("Stack {stack_name} exists with status {}", stack.status);
                Ok(true)
            }
            Err(e) if e.is_stack_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn monitor(&self) -> StackMonitor<'_, C, O> {
        StackMonitor::new(
            self.api,
            self.sink,
            BackoffPolicy::from(&self.polling),
            self.polling.timeout(),
            self.cancel.clone(),
        )
    }

    fn announce(&self, deployment: &Deployment) {
        if let Some(tenant) = &deployment.tenant_label {
            self.sink.field("Tenant", tenant);
        }
        if let Some(label) = &deployment.stack_label {
            self.sink.field("Stack", label);
        }
        self.sink.field("StackName", &deployment.stack_name);
        if let Some(account) = &deployment.account_id {
            self.sink.field("Account", account);
        }
        if let Some(region) = &deployment.region {
            self.sink.field("Region", region);
        }
        self.sink.field(
            "Template",
            &format!(
                "{} ({})",
                deployment.template_path.display(),
                TemplateHasher::new().short_digest(&deployment.template_digest)
            ),
        );
        if !deployment.tags.is_empty() {
            let tags: Vec<String> = deployment
                .tags
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect();
            self.sink.field("Tags", &tags.join(", "));
        }
    }

    fn show_outputs(&self, outputs: &[crate::cloudformation::StackOutput]) {
        if !outputs.is_empty() {
            self.sink.stack_outputs(outputs);
        }
    }
}

/// Looks up and shows the principal behind the current credentials.
///
/// # Errors
///
/// Returns an error if the identity call fails.
pub async fn whoami<I, O>(api: &I, sink: &O, region: Option<&str>) -> Result<CallerIdentity>
where
    I: IdentityApi + ?Sized,
    O: OutputSink + ?Sized,
{
    let identity = api.get_caller_identity().await.context("get caller identity")?;
    sink.identity(&identity, region);
    Ok(identity)
}
