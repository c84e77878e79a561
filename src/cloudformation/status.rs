//! Stack and change set status classification.
//!
//! Stack statuses are open-ended strings; only the completion and failure
//! suffixes carry meaning. Any other value is an in-progress status that is
//! displayed verbatim.

use std::fmt;

/// Suffix shared by all successful terminal statuses.
const COMPLETE_SUFFIX: &str = "_COMPLETE";

/// Suffix shared by all failed terminal statuses.
const FAILED_SUFFIX: &str = "_FAILED";

/// Status of a stack that failed creation and was rolled back.
pub const ROLLBACK_COMPLETE: &str = "ROLLBACK_COMPLETE";

/// Status of a deleted stack.
pub const DELETE_COMPLETE: &str = "DELETE_COMPLETE";

/// A raw stack status string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StackStatus(String);

impl StackStatus {
    /// Creates a status from its raw value.
    #[must_use]
    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    /// Returns the raw status value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for statuses ending in `_COMPLETE`.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.0.ends_with(COMPLETE_SUFFIX)
    }

    /// Returns true for statuses ending in `_FAILED`.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.0.ends_with(FAILED_SUFFIX)
    }

    /// Returns true once no further automatic transition will occur.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.is_complete() || self.is_failed()
    }

    /// Returns true if the stack failed creation and was rolled back.
    #[must_use]
    pub fn is_rollback_complete(&self) -> bool {
        self.0 == ROLLBACK_COMPLETE
    }

    /// Returns true if the stack reached a terminal state without applying the update.
    #[must_use]
    pub fn is_unsuccessful(&self) -> bool {
        self.is_failed() || self.0.contains("ROLLBACK")
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StackStatus {
    fn from(status: &str) -> Self {
        Self::new(status)
    }
}

impl From<String> for StackStatus {
    fn from(status: String) -> Self {
        Self(status)
    }
}

/// Status of a change set as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSetStatus {
    /// Queued for creation.
    CreatePending,
    /// Being computed.
    CreateInProgress,
    /// Ready to describe and execute.
    CreateComplete,
    /// Queued for deletion.
    DeletePending,
    /// Being deleted.
    DeleteInProgress,
    /// Deleted.
    DeleteComplete,
    /// Deletion failed.
    DeleteFailed,
    /// Creation failed.
    Failed,
    /// A status this client does not know about.
    Other(String),
}

/// What a change set status means to a caller waiting on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSetState {
    /// Still being worked on; poll again.
    Pending,
    /// Usable.
    Ready,
    /// Creation failed.
    Failed,
    /// The change set is gone.
    Removed,
}

impl ChangeSetStatus {
    /// Parses the service's status value.
    #[must_use]
    pub fn parse(status: &str) -> Self {
        match status {
            "CREATE_PENDING" => Self::CreatePending,
            "CREATE_IN_PROGRESS" => Self::CreateInProgress,
            "CREATE_COMPLETE" => Self::CreateComplete,
            "DELETE_PENDING" => Self::DeletePending,
            "DELETE_IN_PROGRESS" => Self::DeleteInProgress,
            "DELETE_COMPLETE" => Self::DeleteComplete,
            "DELETE_FAILED" => Self::DeleteFailed,
            "FAILED" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }

    /// Classifies the status for a caller waiting on creation.
    #[must_use]
    pub const fn state(&self) -> ChangeSetState {
        match self {
            Self::CreateComplete => ChangeSetState::Ready,
            Self::Failed => ChangeSetState::Failed,
            Self::DeleteComplete => ChangeSetState::Removed,
            Self::CreatePending
            | Self::CreateInProgress
            | Self::DeletePending
            | Self::DeleteInProgress
            | Self::DeleteFailed
            | Self::Other(_) => ChangeSetState::Pending,
        }
    }

    /// Returns the service's status value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::CreatePending => "CREATE_PENDING",
            Self::CreateInProgress => "CREATE_IN_PROGRESS",
            Self::CreateComplete => "CREATE_COMPLETE",
            Self::DeletePending => "DELETE_PENDING",
            Self::DeleteInProgress => "DELETE_IN_PROGRESS",
            Self::DeleteComplete => "DELETE_COMPLETE",
            Self::DeleteFailed => "DELETE_FAILED",
            Self::Failed => "FAILED",
            Self::Other(other) => other,
        }
    }
}

impl fmt::Display for ChangeSetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_statuses_are_terminal() {
        for raw in [
            "CREATE_COMPLETE",
            "UPDATE_COMPLETE",
            "DELETE_COMPLETE",
            "ROLLBACK_COMPLETE",
            "UPDATE_ROLLBACK_COMPLETE",
            "IMPORT_COMPLETE",
        ] {
            let status = StackStatus::from(raw);
            assert!(status.is_complete(), "{raw}");
            assert!(!status.is_failed(), "{raw}");
            assert!(status.is_terminal(), "{raw}");
        }
    }

    #[test]
    fn test_failed_statuses_are_terminal() {
        for raw in ["CREATE_FAILED", "ROLLBACK_FAILED", "DELETE_FAILED", "UPDATE_ROLLBACK_FAILED"] {
            let status = StackStatus::from(raw);
            assert!(status.is_failed(), "{raw}");
            assert!(!status.is_complete(), "{raw}");
            assert!(status.is_terminal(), "{raw}");
        }
    }

    #[test]
    fn test_other_statuses_are_in_progress() {
        for raw in [
            "CREATE_IN_PROGRESS",
            "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS",
            "UPDATE_ROLLBACK_IN_PROGRESS",
            "REVIEW_IN_PROGRESS",
            "UNKNOWN",
            "",
            "COMPLETE",
        ] {
            let status = StackStatus::from(raw);
            assert!(!status.is_complete(), "{raw}");
            assert!(!status.is_failed(), "{raw}");
            assert!(!status.is_terminal(), "{raw}");
        }
    }

    #[test]
    fn test_unsuccessful_statuses() {
        assert!(StackStatus::from("UPDATE_ROLLBACK_COMPLETE").is_unsuccessful());
        assert!(StackStatus::from("CREATE_FAILED").is_unsuccessful());
        assert!(!StackStatus::from("UPDATE_COMPLETE").is_unsuccessful());
        assert!(StackStatus::from(ROLLBACK_COMPLETE).is_rollback_complete());
    }

    #[test]
    fn test_change_set_states() {
        assert_eq!(ChangeSetStatus::parse("CREATE_COMPLETE").state(), ChangeSetState::Ready);
        assert_eq!(ChangeSetStatus::parse("FAILED").state(), ChangeSetState::Failed);
        assert_eq!(ChangeSetStatus::parse("DELETE_COMPLETE").state(), ChangeSetState::Removed);
        assert_eq!(ChangeSetStatus::parse("CREATE_PENDING").state(), ChangeSetState::Pending);
        assert_eq!(ChangeSetStatus::parse("SOMETHING_NEW").state(), ChangeSetState::Pending);
        assert_eq!(ChangeSetStatus::parse("SOMETHING_NEW").as_str(), "SOMETHING_NEW");
    }
}
