//! CloudFormation integration module.
//!
//! This module provides the remote API seams used by the deployer, their AWS
//! SDK implementations, the owned domain types, and stack status
//! classification.

mod api;
mod client;
mod identity;
mod staging;
mod status;
mod types;

pub use api::{CloudFormationApi, IdentityApi, TemplateStager};
#[cfg(test)]
pub use api::{MockCloudFormationApi, MockIdentityApi, MockTemplateStager};
pub use client::CloudFormationClient;
pub use identity::StsIdentityClient;
pub use staging::{MAX_INLINE_TEMPLATE_BYTES, S3TemplateStager};
pub use status::{
    ChangeSetState, ChangeSetStatus, DELETE_COMPLETE, ROLLBACK_COMPLETE, StackStatus,
};
pub use types::{
    CallerIdentity, Change, ChangeAction, ChangeDetail, ChangeSetDescription, ChangeSetType,
    CreateChangeSetRequest, Parameter, Replacement, RequiresRecreation, ResourceChange,
    ResourceTarget, Stack, StackEvent, StackOutput, TemplateSource,
};
