//! CloudFormation API adapter.
//!
//! This module implements [`CloudFormationApi`] on top of the AWS SDK and is
//! the only place where service error text is inspected: missing stacks and
//! empty change sets are turned into typed [`ApiError`] kinds here.

use async_trait::async_trait;
use aws_sdk_cloudformation::Client;
use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cloudformation::primitives::DateTime as SdkDateTime;
use aws_sdk_cloudformation::types as cfn;
use tracing::{debug, trace};

use crate::error::{ApiError, Result, StackshiftError};

use super::api::CloudFormationApi;
use super::status::{ChangeSetStatus, StackStatus};
use super::types::{
    Change, ChangeAction, ChangeDetail, ChangeSetDescription, CreateChangeSetRequest, Replacement,
    RequiresRecreation, ResourceChange, ResourceTarget, Stack, StackEvent, StackOutput,
    TemplateSource,
};

/// Message fragment the service uses for missing stacks.
const NOT_FOUND_MARKER: &str = "does not exist";

/// Message fragments the service uses for empty change sets and updates.
const NO_CHANGES_MARKERS: &[&str] = &[
    "didn't contain changes",
    "No updates are to be performed",
];

/// CloudFormation operations, for error labels and classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    DescribeStacks,
    CreateChangeSet,
    DescribeChangeSet,
    ExecuteChangeSet,
    DeleteStack,
    DescribeStackEvents,
    GetTemplate,
}

impl Operation {
    const fn name(self) -> &'static str {
        match self {
            Self::DescribeStacks => "DescribeStacks",
            Self::CreateChangeSet => "CreateChangeSet",
            Self::DescribeChangeSet => "DescribeChangeSet",
            Self::ExecuteChangeSet => "ExecuteChangeSet",
            Self::DeleteStack => "DeleteStack",
            Self::DescribeStackEvents => "DescribeStackEvents",
            Self::GetTemplate => "GetTemplate",
        }
    }

    /// Operations whose "does not exist" errors refer to the stack itself.
    const fn addresses_stack(self) -> bool {
        matches!(
            self,
            Self::DescribeStacks | Self::DescribeStackEvents | Self::GetTemplate | Self::DeleteStack
        )
    }
}

/// Maps a service error onto a typed [`ApiError`].
pub(crate) fn classify_error(
    operation: Operation,
    stack_name: &str,
    code: Option<&str>,
    message: &str,
) -> ApiError {
    if operation.addresses_stack() && message.contains(NOT_FOUND_MARKER) {
        return ApiError::StackNotFound {
            stack: stack_name.to_string(),
        };
    }

    if is_no_changes_message(message) {
        return ApiError::NoChanges;
    }

    ApiError::service(operation.name(), code.unwrap_or("Unknown"), message)
}

/// Returns true if a service message reports an empty change set.
pub(crate) fn is_no_changes_message(message: &str) -> bool {
    NO_CHANGES_MARKERS.iter().any(|marker| message.contains(marker))
}

/// Converts an SDK error into a classified stackshift error.
fn sdk_error<E, R>(operation: Operation, stack_name: &str, err: &SdkError<E, R>) -> StackshiftError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let (code, message) = err.as_service_error().map_or((None, None), |service| {
        (
            service.code().map(str::to_string),
            service.message().map(str::to_string),
        )
    });
    let message = message.unwrap_or_else(|| DisplayErrorContext(err).to_string());

    debug!("{} failed: {message}", operation.name());
    StackshiftError::Api(classify_error(operation, stack_name, code.as_deref(), &message))
}

/// Normalizes SDK accessors; required members are non-optional in some SDK releases.
fn opt<'a, T: ?Sized + 'a>(value: impl Into<Option<&'a T>>) -> Option<&'a T> {
    value.into()
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

/// AWS SDK backed CloudFormation client.
#[derive(Debug, Clone)]
pub struct CloudFormationClient {
    /// SDK client.
    client: Client,
}

impl CloudFormationClient {
    /// Creates a client from a loaded AWS configuration.
    #[must_use]
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    fn convert_stack(stack: &cfn::Stack) -> Result<Stack> {
        let stack_name = opt::<str>(stack.stack_name()).ok_or_else(|| {
            ApiError::invalid_response(Operation::DescribeStacks.name(), "stack has no name")
        })?;
        let status = opt::<cfn::StackStatus>(stack.stack_status()).ok_or_else(|| {
            ApiError::invalid_response(
                Operation::DescribeStacks.name(),
                format!("stack {stack_name} has no status"),
            )
        })?;

        Ok(Stack {
            stack_id: opt::<str>(stack.stack_id()).map(str::to_string),
            stack_name: stack_name.to_string(),
            status: StackStatus::new(status.as_str()),
            status_reason: owned(stack.stack_status_reason()),
            outputs: stack.outputs().iter().filter_map(Self::convert_output).collect(),
        })
    }

    fn convert_output(output: &cfn::Output) -> Option<StackOutput> {
        Some(StackOutput {
            key: output.output_key()?.to_string(),
            value: output.output_value().unwrap_or_default().to_string(),
            description: owned(output.description()),
            export_name: owned(output.export_name()),
        })
    }

    fn convert_event(event: &cfn::StackEvent) -> Option<StackEvent> {
        let timestamp = opt::<SdkDateTime>(event.timestamp())?;
        let timestamp = chrono::DateTime::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())?;

        Some(StackEvent {
            event_id: opt::<str>(event.event_id()).unwrap_or_default().to_string(),
            timestamp,
            logical_resource_id: event.logical_resource_id().unwrap_or_default().to_string(),
            resource_type: event.resource_type().unwrap_or_default().to_string(),
            resource_status: event
                .resource_status()
                .map(|status| status.as_str().to_string())
                .unwrap_or_default(),
            resource_status_reason: owned(event.resource_status_reason()),
        })
    }

    fn convert_change(change: &cfn::Change) -> Change {
        Change {
            change_type: change
                .r#type()
                .map_or_else(|| String::from("Resource"), |t| t.as_str().to_string()),
            resource_change: change.resource_change().map(Self::convert_resource_change),
        }
    }

    fn convert_resource_change(change: &cfn::ResourceChange) -> ResourceChange {
        ResourceChange {
            action: change
                .action()
                .map_or(ChangeAction::Other(String::new()), |a| ChangeAction::parse(a.as_str())),
            logical_resource_id: change.logical_resource_id().unwrap_or_default().to_string(),
            resource_type: change.resource_type().unwrap_or_default().to_string(),
            physical_resource_id: owned(change.physical_resource_id()),
            replacement: change
                .replacement()
                .map_or(Replacement::False, |r| Replacement::parse(r.as_str())),
            details: change.details().iter().map(Self::convert_detail).collect(),
        }
    }

    fn convert_detail(detail: &cfn::ResourceChangeDetail) -> ChangeDetail {
        let target = detail.target().map_or_else(ResourceTarget::default, |target| ResourceTarget {
            attribute: target.attribute().map(|a| a.as_str().to_string()),
            name: owned(target.name()),
            requires_recreation: target
                .requires_recreation()
                .map_or(RequiresRecreation::Never, |r| RequiresRecreation::parse(r.as_str())),
        });

        ChangeDetail {
            causing_entity: owned(detail.causing_entity()),
            evaluation: detail.evaluation().map(|e| e.as_str().to_string()),
            change_source: detail.change_source().map(|s| s.as_str().to_string()),
            target,
        }
    }
}

#[async_trait]
impl CloudFormationApi for CloudFormationClient {
    async fn describe_stack(&self, stack_name: &str) -> Result<Stack> {
        trace!("DescribeStacks {stack_name}");

        let output = self
            .client
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| sdk_error(Operation::DescribeStacks, stack_name, &e))?;

        let stack = output.stacks().first().ok_or_else(|| ApiError::StackNotFound {
            stack: stack_name.to_string(),
        })?;

        Self::convert_stack(stack)
    }

    async fn create_change_set(&self, request: &CreateChangeSetRequest) -> Result<String> {
        debug!(
            "CreateChangeSet {} for {} ({})",
            request.change_set_name, request.stack_name, request.change_set_type
        );

        let parameters = request
            .parameters
            .iter()
            .map(|p| {
                cfn::Parameter::builder()
                    .parameter_key(&p.key)
                    .parameter_value(&p.value)
                    .build()
            })
            .collect();

        let capabilities = request
            .capabilities
            .iter()
            .map(|c| cfn::Capability::from(c.as_str()))
            .collect();

        let builder = self
            .client
            .create_change_set()
            .stack_name(&request.stack_name)
            .change_set_name(&request.change_set_name)
            .change_set_type(cfn::ChangeSetType::from(request.change_set_type.as_str()))
            .set_parameters(Some(parameters))
            .set_capabilities(Some(capabilities));

        let builder = match &request.template {
            TemplateSource::Body(body) => builder.template_body(body),
            TemplateSource::Url(url) => builder.template_url(url),
        };

        let output = builder
            .send()
            .await
            .map_err(|e| sdk_error(Operation::CreateChangeSet, &request.stack_name, &e))?;

        Ok(opt::<str>(output.id())
            .unwrap_or(request.change_set_name.as_str())
            .to_string())
    }

    async fn describe_change_set(
        &self,
        stack_name: &str,
        change_set_name: &str,
    ) -> Result<ChangeSetDescription> {
        let mut changes = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .describe_change_set()
                .stack_name(stack_name)
                .change_set_name(change_set_name)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error(Operation::DescribeChangeSet, stack_name, &e))?;

            changes.extend(output.changes().iter().map(Self::convert_change));

            if let Some(token) = output.next_token() {
                next_token = Some(token.to_string());
                continue;
            }

            let status = opt::<cfn::ChangeSetStatus>(output.status())
                .map_or(ChangeSetStatus::Other(String::new()), |s| {
                    ChangeSetStatus::parse(s.as_str())
                });
            let status_reason = owned(output.status_reason());
            let contains_no_changes = status == ChangeSetStatus::Failed
                && status_reason.as_deref().is_some_and(is_no_changes_message);

            return Ok(ChangeSetDescription {
                stack_name: opt::<str>(output.stack_name())
                    .unwrap_or(stack_name)
                    .to_string(),
                change_set_name: opt::<str>(output.change_set_name())
                    .unwrap_or(change_set_name)
                    .to_string(),
                change_set_id: owned(opt::<str>(output.change_set_id())),
                status,
                status_reason,
                contains_no_changes,
                execution_status: opt::<cfn::ExecutionStatus>(output.execution_status())
                    .map(|s| s.as_str().to_string()),
                changes,
            });
        }
    }

    async fn execute_change_set(&self, stack_name: &str, change_set_name: &str) -> Result<()> {
        debug!("ExecuteChangeSet {change_set_name} for {stack_name}");

        self.client
            .execute_change_set()
            .stack_name(stack_name)
            .change_set_name(change_set_name)
            .send()
            .await
            .map_err(|e| sdk_error(Operation::ExecuteChangeSet, stack_name, &e))?;

        Ok(())
    }

    async fn delete_stack(&self, stack_name: &str) -> Result<()> {
        debug!("DeleteStack {stack_name}");

        self.client
            .delete_stack()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| sdk_error(Operation::DeleteStack, stack_name, &e))?;

        Ok(())
    }

    async fn describe_stack_events(&self, stack_name: &str) -> Result<Vec<StackEvent>> {
        // The first page holds the most recent events, which covers a poll window.
        let output = self
            .client
            .describe_stack_events()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| sdk_error(Operation::DescribeStackEvents, stack_name, &e))?;

        Ok(output
            .stack_events()
            .iter()
            .filter_map(Self::convert_event)
            .collect())
    }

    async fn get_template(&self, stack_name: &str) -> Result<String> {
        let output = self
            .client
            .get_template()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| sdk_error(Operation::GetTemplate, stack_name, &e))?;

        output.template_body().map(str::to_string).ok_or_else(|| {
            ApiError::invalid_response(Operation::GetTemplate.name(), "no template body").into()
        })
    }
}
