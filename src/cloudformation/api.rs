//! Remote API seams.
//!
//! The deployer talks to CloudFormation, STS and the template staging bucket
//! through these traits so that clients can be constructed once per
//! invocation and injected, and so that tests can script the service.

use async_trait::async_trait;

use crate::error::Result;

use super::types::{
    CallerIdentity, ChangeSetDescription, CreateChangeSetRequest, Stack, StackEvent,
};

/// Operations consumed from the CloudFormation API.
///
/// Implementations classify service errors: a missing stack is reported as
/// [`crate::error::ApiError::StackNotFound`] and an empty change set
/// submission as [`crate::error::ApiError::NoChanges`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CloudFormationApi: Send + Sync {
    /// Describes a stack by name.
    async fn describe_stack(&self, stack_name: &str) -> Result<Stack>;

    /// Creates a change set and returns its ID.
    async fn create_change_set(&self, request: &CreateChangeSetRequest) -> Result<String>;

    /// Describes a change set, including all of its changes.
    async fn describe_change_set(
        &self,
        stack_name: &str,
        change_set_name: &str,
    ) -> Result<ChangeSetDescription>;

    /// Executes a change set.
    async fn execute_change_set(&self, stack_name: &str, change_set_name: &str) -> Result<()>;

    /// Deletes a stack.
    async fn delete_stack(&self, stack_name: &str) -> Result<()>;

    /// Returns the most recent stack events.
    async fn describe_stack_events(&self, stack_name: &str) -> Result<Vec<StackEvent>>;

    /// Returns the deployed template body.
    async fn get_template(&self, stack_name: &str) -> Result<String>;
}

/// Caller identity lookup.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Returns the principal behind the current credentials.
    async fn get_caller_identity(&self) -> Result<CallerIdentity>;
}

/// Uploads templates too large to submit inline.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TemplateStager: Send + Sync {
    /// Stores the template and returns a URL the service can read it from.
    async fn stage(&self, stack_name: &str, digest: &str, body: &str) -> Result<String>;
}
