//! Change set lifecycle.
//!
//! Creates a uniquely named change set for a deployment and polls it until the
//! service has either computed it or given up.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use crate::cloudformation::{
    ChangeSetDescription, ChangeSetState, ChangeSetType, CloudFormationApi,
    CreateChangeSetRequest, MAX_INLINE_TEMPLATE_BYTES, TemplateSource, TemplateStager,
};
use crate::config::Deployment;
use crate::deployer::Waiter;
use crate::error::{ChangeSetError, ConfigError, Result, ResultExt};

/// Capabilities acknowledged on every change set.
pub const CAPABILITIES: &[&str] = &["CAPABILITY_IAM", "CAPABILITY_NAMED_IAM"];

/// How a change set request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSetOutcome {
    /// The change set is computed and can be executed.
    Ready(ChangeSetDescription),
    /// The template and parameters match what is deployed.
    NoChanges,
}

/// Creates change sets and waits for them to become usable.
pub struct ChangeSetManager<'a, C: CloudFormationApi + ?Sized> {
    api: &'a C,
    stager: Option<&'a dyn TemplateStager>,
    interval: Duration,
    timeout: Option<Duration>,
    cancel: Option<watch::Receiver<bool>>,
}

impl<'a, C: CloudFormationApi + ?Sized> ChangeSetManager<'a, C> {
    /// Creates a manager that checks change set status every `interval`.
    #[must_use]
    pub const fn new(api: &'a C, interval: Duration) -> Self {
        Self {
            api,
            stager: None,
            interval,
            timeout: None,
            cancel: None,
        }
    }

    /// Uses `stager` for templates above the inline limit.
    #[must_use]
    pub fn with_stager(mut self, stager: Option<&'a dyn TemplateStager>) -> Self {
        self.stager = stager;
        self
    }

    /// Bounds how long one change set may take to compute.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Stops polling once `cancel` turns true.
    #[must_use]
    pub fn with_cancel(mut self, cancel: Option<watch::Receiver<bool>>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns a fresh change set name.
    #[must_use]
    pub fn change_set_name() -> String {
        format!("StackUpdate-{}", Uuid::new_v4())
    }

    /// Resolves how the template reaches the service: inline when small
    /// enough, otherwise through the stager.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is not UTF-8, or is too large and no
    /// stager is configured, or staging fails.
    pub async fn template_source(&self, deployment: &Deployment) -> Result<TemplateSource> {
        let body = deployment.template_text()?;
        let size = deployment.template_size();

        if size <= MAX_INLINE_TEMPLATE_BYTES {
            return Ok(TemplateSource::Body(body.to_string()));
        }

        let Some(stager) = self.stager else {
            return Err(ConfigError::TemplateTooLarge {
                size,
                limit: MAX_INLINE_TEMPLATE_BYTES,
            }
            .into());
        };

        let url = stager
            .stage(&deployment.stack_name, &deployment.template_digest, body)
            .await
            .context("stage template")?;
        Ok(TemplateSource::Url(url))
    }

    /// Creates a change set for `deployment` and waits until it is usable.
    ///
    /// `create_new` selects a creation change set for a stack that does not
    /// exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if creation is rejected for any reason other than an
    /// empty change, or the change set fails or disappears, or polling times
    /// out or is cancelled.
    pub async fn create_and_await(
        &self,
        deployment: &Deployment,
        create_new: bool,
    ) -> Result<ChangeSetOutcome> {
        let stack_name = deployment.stack_name.as_str();
        let request = CreateChangeSetRequest {
            stack_name: stack_name.to_string(),
            change_set_name: Self::change_set_name(),
            template: self.template_source(deployment).await?,
            parameters: deployment.parameter_list(),
            change_set_type: if create_new {
                ChangeSetType::Create
            } else {
                ChangeSetType::Update
            },
            capabilities: CAPABILITIES.iter().map(ToString::to_string).collect(),
        };
        let name = request.change_set_name.as_str();

        match self.api.create_change_set(&request).await {
            Ok(id) => info!("Created change set {name} ({id})"),
            Err(e) if e.is_no_changes() => {
                debug!("Change set for {stack_name} contains no changes");
                return Ok(ChangeSetOutcome::NoChanges);
            }
            Err(e) => return Err(e),
        }

        let mut waiter = Waiter::start(
            format!("change set {name}"),
            self.timeout,
            self.cancel.clone(),
        );

        loop {
            waiter.wait(self.interval).await?;

            let description = self
                .api
                .describe_change_set(stack_name, name)
                .await
                .context("describe change set")?;

            match description.status.state() {
                ChangeSetState::Ready => {
                    info!(
                        "Change set {name} ready with {} changes",
                        description.changes.len()
                    );
                    return Ok(ChangeSetOutcome::Ready(description));
                }
                ChangeSetState::Failed if description.contains_no_changes => {
                    debug!("Change set {name} failed without changes");
                    return Ok(ChangeSetOutcome::NoChanges);
                }
                ChangeSetState::Failed => {
                    return Err(ChangeSetError::Failed {
                        reason: description.status_reason.unwrap_or_default(),
                    }
                    .into());
                }
                ChangeSetState::Removed => {
                    return Err(ChangeSetError::RemovedUnexpectedly {
                        name: name.to_string(),
                    }
                    .into());
                }
                ChangeSetState::Pending => {
                    debug!("Change set {name} is {}", description.status);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloudformation::{
        ChangeSetStatus, MockCloudFormationApi, MockTemplateStager,
    };
    use crate::error::ApiError;
    use mockall::Sequence;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn deployment(body: &str) -> Deployment {
        Deployment {
            tenant_label: None,
            stack_label: None,
            stack_name: String::from("web"),
            template_path: PathBuf::from("web.yaml"),
            template_body: body.as_bytes().to_vec(),
            template_digest: String::from("abc123"),
            parameters: BTreeMap::from([(String::from("Env"), String::from("prod"))]),
            constants: BTreeMap::new(),
            tags: BTreeMap::new(),
            protected: false,
            account_id: None,
            region: None,
        }
    }

    fn description(status: ChangeSetStatus, reason: Option<&str>) -> ChangeSetDescription {
        ChangeSetDescription {
            stack_name: String::from("web"),
            change_set_name: String::from("StackUpdate-x"),
            change_set_id: None,
            contains_no_changes: status == ChangeSetStatus::Failed
                && reason.is_some_and(|r| r.contains("didn't contain changes")),
            status,
            status_reason: reason.map(ToString::to_string),
            execution_status: None,
            changes: vec![],
        }
    }

    fn manager(api: &MockCloudFormationApi) -> ChangeSetManager<'_, MockCloudFormationApi> {
        ChangeSetManager::new(api, Duration::from_secs(2))
    }

    #[test]
    fn test_change_set_names_are_unique() {
        let first = ChangeSetManager::<MockCloudFormationApi>::change_set_name();
        let second = ChangeSetManager::<MockCloudFormationApi>::change_set_name();

        assert!(first.starts_with("StackUpdate-"));
        assert_ne!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_ready() {
        let mut api = MockCloudFormationApi::new();
        let mut seq = Sequence::new();

        api.expect_create_change_set()
            .withf(|request| {
                request.change_set_type == ChangeSetType::Update
                    && request.parameters.len() == 1
                    && request.capabilities.len() == 2
                    && matches!(request.template, TemplateSource::Body(_))
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(String::from("arn:changeset")));
        api.expect_describe_change_set()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(description(ChangeSetStatus::CreateInProgress, None)));
        api.expect_describe_change_set()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(description(ChangeSetStatus::CreateComplete, None)));

        let start = tokio::time::Instant::now();
        let outcome = manager(&api)
            .create_and_await(&deployment("Resources: {}"), false)
            .await
            .unwrap();

        assert!(matches!(outcome, ChangeSetOutcome::Ready(_)));
        assert!(start.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_changes_on_create_is_not_an_error() {
        let mut api = MockCloudFormationApi::new();
        api.expect_create_change_set()
            .times(1)
            .returning(|_| Err(ApiError::NoChanges.into()));
        api.expect_describe_change_set().never();

        let outcome = manager(&api)
            .create_and_await(&deployment("Resources: {}"), false)
            .await
            .unwrap();

        assert_eq!(outcome, ChangeSetOutcome::NoChanges);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_without_changes_is_no_changes() {
        let mut api = MockCloudFormationApi::new();
        api.expect_create_change_set()
            .returning(|_| Ok(String::from("id")));
        api.expect_describe_change_set().times(1).returning(|_, _| {
            Ok(description(
                ChangeSetStatus::Failed,
                Some("The submitted information didn't contain changes."),
            ))
        });

        let outcome = manager(&api)
            .create_and_await(&deployment("Resources: {}"), true)
            .await
            .unwrap();

        assert_eq!(outcome, ChangeSetOutcome::NoChanges);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_change_set_carries_reason() {
        let mut api = MockCloudFormationApi::new();
        api.expect_create_change_set()
            .withf(|request| request.change_set_type == ChangeSetType::Create)
            .returning(|_| Ok(String::from("id")));
        api.expect_describe_change_set().returning(|_, _| {
            Ok(description(
                ChangeSetStatus::Failed,
                Some("Template format error"),
            ))
        });

        let err = manager(&api)
            .create_and_await(&deployment("Resources: {}"), true)
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "failed to create change set: Template format error"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_removed_change_set_is_an_error() {
        let mut api = MockCloudFormationApi::new();
        api.expect_create_change_set()
            .returning(|_| Ok(String::from("id")));
        api.expect_describe_change_set()
            .returning(|_, _| Ok(description(ChangeSetStatus::DeleteComplete, None)));

        let err = manager(&api)
            .create_and_await(&deployment("Resources: {}"), false)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("removed unexpectedly"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_describe_errors_are_labelled() {
        let mut api = MockCloudFormationApi::new();
        api.expect_create_change_set()
            .returning(|_| Ok(String::from("id")));
        api.expect_describe_change_set().returning(|_, _| {
            Err(ApiError::service("DescribeChangeSet", "Throttling", "Rate exceeded").into())
        });

        let err = manager(&api)
            .create_and_await(&deployment("Resources: {}"), false)
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("describe change set: "));
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_honours_timeout() {
        let mut api = MockCloudFormationApi::new();
        api.expect_create_change_set()
            .returning(|_| Ok(String::from("id")));
        api.expect_describe_change_set()
            .returning(|_, _| Ok(description(ChangeSetStatus::CreateInProgress, None)));

        let err = manager(&api)
            .with_timeout(Some(Duration::from_secs(10)))
            .create_and_await(&deployment("Resources: {}"), false)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_large_template_without_stager_is_rejected() {
        let mut api = MockCloudFormationApi::new();
        api.expect_create_change_set().never();

        let body = "#".repeat(MAX_INLINE_TEMPLATE_BYTES + 1);
        let err = manager(&api)
            .create_and_await(&deployment(&body), false)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("inline limit"));
    }

    #[tokio::test]
    async fn test_large_template_is_staged() {
        let api = MockCloudFormationApi::new();
        let mut stager = MockTemplateStager::new();
        stager
            .expect_stage()
            .withf(|stack, digest, _| stack == "web" && digest == "abc123")
            .times(1)
            .returning(|_, _, _| Ok(String::from("https://bucket.s3.amazonaws.com/web/abc123.template")));

        let body = "#".repeat(MAX_INLINE_TEMPLATE_BYTES + 1);
        let source = manager(&api)
            .with_stager(Some(&stager))
            .template_source(&deployment(&body))
            .await
            .unwrap();

        assert_eq!(
            source,
            TemplateSource::Url(String::from(
                "https://bucket.s3.amazonaws.com/web/abc123.template"
            ))
        );
    }
}
