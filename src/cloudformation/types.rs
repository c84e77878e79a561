//! CloudFormation domain types.
//!
//! These are owned, SDK-independent views of the API shapes the deployer
//! works with. The adapter in `client.rs` converts the SDK's output into them.

use chrono::{DateTime, Utc};
use std::fmt;

use super::status::{ChangeSetStatus, DELETE_COMPLETE, StackStatus};

/// Resource status suffix marking a failed resource operation.
const EVENT_FAILED_SUFFIX: &str = "_FAILED";

/// Resource status suffix marking the start of a rollback.
const EVENT_ROLLBACK_SUFFIX: &str = "_ROLLBACK_IN_PROGRESS";

/// A deployed stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    /// Stack ARN.
    pub stack_id: Option<String>,
    /// Stack name.
    pub stack_name: String,
    /// Current status.
    pub status: StackStatus,
    /// Reason for the current status, if reported.
    pub status_reason: Option<String>,
    /// Declared outputs.
    pub outputs: Vec<StackOutput>,
}

impl Stack {
    /// A placeholder for a stack the service no longer knows about.
    #[must_use]
    pub fn deleted(stack_name: &str) -> Self {
        Self {
            stack_id: None,
            stack_name: stack_name.to_string(),
            status: StackStatus::new(DELETE_COMPLETE),
            status_reason: None,
            outputs: Vec::new(),
        }
    }
}

/// A stack output value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackOutput {
    /// Output key.
    pub key: String,
    /// Output value.
    pub value: String,
    /// Optional description.
    pub description: Option<String>,
    /// Export name, if exported.
    pub export_name: Option<String>,
}

/// A resource status transition recorded during a stack operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackEvent {
    /// Event ID.
    pub event_id: String,
    /// When the transition happened.
    pub timestamp: DateTime<Utc>,
    /// Logical ID of the resource.
    pub logical_resource_id: String,
    /// Resource type.
    pub resource_type: String,
    /// Resource status after the transition.
    pub resource_status: String,
    /// Reason for the transition.
    pub resource_status_reason: Option<String>,
}

impl StackEvent {
    /// Returns true for failed resource operations and rollback starts.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.resource_status.ends_with(EVENT_FAILED_SUFFIX)
            || self.resource_status.ends_with(EVENT_ROLLBACK_SUFFIX)
    }

    /// Returns true if the event falls within `[since, until)`.
    #[must_use]
    pub fn within(&self, since: DateTime<Utc>, until: DateTime<Utc>) -> bool {
        self.timestamp >= since && self.timestamp < until
    }
}

/// Whether a change set creates a new stack or updates an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSetType {
    /// Create a new stack.
    Create,
    /// Update an existing stack.
    Update,
}

impl ChangeSetType {
    /// Returns the service's value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
        }
    }
}

/// Where the service reads the template from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// Inline template body.
    Body(String),
    /// URL of a staged template.
    Url(String),
}

/// A stack parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Parameter key.
    pub key: String,
    /// Parameter value.
    pub value: String,
}

/// Request to create a change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateChangeSetRequest {
    /// Target stack.
    pub stack_name: String,
    /// Unique change set name.
    pub change_set_name: String,
    /// Template location.
    pub template: TemplateSource,
    /// Parameters; order is not significant.
    pub parameters: Vec<Parameter>,
    /// Create or update.
    pub change_set_type: ChangeSetType,
    /// Acknowledged capabilities.
    pub capabilities: Vec<String>,
}

/// A described change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSetDescription {
    /// Target stack.
    pub stack_name: String,
    /// Change set name.
    pub change_set_name: String,
    /// Change set ARN.
    pub change_set_id: Option<String>,
    /// Creation status.
    pub status: ChangeSetStatus,
    /// Reason for the status, if reported.
    pub status_reason: Option<String>,
    /// True if the service rejected the change set for containing no changes.
    pub contains_no_changes: bool,
    /// Execution status, if reported.
    pub execution_status: Option<String>,
    /// Described changes, in service order.
    pub changes: Vec<Change>,
}

/// One entry in a change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// Change type, normally `Resource`.
    pub change_type: String,
    /// Resource change, for resource changes.
    pub resource_change: Option<ResourceChange>,
}

/// A change to a single resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceChange {
    /// What happens to the resource.
    pub action: ChangeAction,
    /// Logical ID.
    pub logical_resource_id: String,
    /// Resource type.
    pub resource_type: String,
    /// Physical ID, for existing resources.
    pub physical_resource_id: Option<String>,
    /// Whether the resource is replaced.
    pub replacement: Replacement,
    /// Why properties change.
    pub details: Vec<ChangeDetail>,
}

/// Action taken on a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeAction {
    /// Resource is added.
    Add,
    /// Resource is modified.
    Modify,
    /// Resource is removed.
    Remove,
    /// Resource is imported.
    Import,
    /// Action is determined during execution.
    Dynamic,
    /// An action this client does not know about.
    Other(String),
}

impl ChangeAction {
    /// Parses the service's action value.
    #[must_use]
    pub fn parse(action: &str) -> Self {
        match action {
            "Add" => Self::Add,
            "Modify" => Self::Modify,
            "Remove" => Self::Remove,
            "Import" => Self::Import,
            "Dynamic" => Self::Dynamic,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Replacement indicator for a modified resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Replacement {
    /// The resource is replaced.
    True,
    /// The resource is updated in place.
    #[default]
    False,
    /// Replacement depends on values only known during execution.
    Conditional,
}

impl Replacement {
    /// Parses the service's replacement value; unknown values mean no replacement.
    #[must_use]
    pub fn parse(replacement: &str) -> Self {
        match replacement {
            "True" => Self::True,
            "Conditional" => Self::Conditional,
            _ => Self::False,
        }
    }
}

/// Why a resource property changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeDetail {
    /// Entity that caused the change, e.g. `MyBucket.Arn`.
    pub causing_entity: Option<String>,
    /// `Static` or `Dynamic`.
    pub evaluation: Option<String>,
    /// Source of the change, e.g. `ResourceAttribute` or `DirectModification`.
    pub change_source: Option<String>,
    /// Affected part of the resource.
    pub target: ResourceTarget,
}

/// The part of a resource a change detail targets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResourceTarget {
    /// Attribute, e.g. `Properties`.
    pub attribute: Option<String>,
    /// Property name.
    pub name: Option<String>,
    /// Whether changing the property recreates the resource.
    pub requires_recreation: RequiresRecreation,
}

/// Recreation requirement of a property change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequiresRecreation {
    /// Updated in place.
    #[default]
    Never,
    /// Always recreated.
    Always,
    /// Recreation depends on the update policy.
    Conditionally,
}

impl RequiresRecreation {
    /// Parses the service's value; unknown values mean no recreation.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "Always" => Self::Always,
            "Conditionally" => Self::Conditionally,
            _ => Self::Never,
        }
    }
}

/// The principal behind the current credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// Account ID.
    pub account: String,
    /// Principal ARN.
    pub arn: String,
    /// Unique user ID.
    pub user_id: String,
}

impl fmt::Display for ChangeSetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
