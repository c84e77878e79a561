//! Error types for stackshift.
//!
//! Errors are grouped by the layer that produces them: configuration and
//! deployment assembly, the remote CloudFormation API, the change-set
//! lifecycle, and the deployment orchestrator. Remote errors are classified
//! into typed kinds at the API adapter so the orchestration code never has to
//! inspect message text.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for stackshift.
#[derive(Debug, Error)]
pub enum StackshiftError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Remote API errors.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Change set lifecycle errors.
    #[error(transparent)]
    ChangeSet(#[from] ChangeSetError),

    /// Deployment orchestration errors.
    #[error(transparent)]
    Deploy(#[from] DeployError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An error annotated with the operation that produced it.
    #[error("{context}: {source}")]
    Context {
        /// Short label of the failed operation.
        context: String,
        /// The underlying error.
        source: Box<StackshiftError>,
    },
}

/// Configuration and deployment assembly errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file was not found.
    #[error("File not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// A file could not be parsed.
    #[error("Failed to parse {location}: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Source location (usually a path).
        location: String,
    },

    /// Validation failed.
    #[error("Validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// A `Key=Value` specification could not be parsed.
    #[error("Invalid key/value specification '{spec}', expected Key=Value")]
    InvalidKeyValue {
        /// The offending specification.
        spec: String,
    },

    /// The template is too large to submit inline and no staging bucket is configured.
    #[error("Template is {size} bytes, above the inline limit of {limit} bytes; configure a staging bucket")]
    TemplateTooLarge {
        /// Template size in bytes.
        size: usize,
        /// Inline size limit in bytes.
        limit: usize,
    },

    /// The template body is not valid UTF-8.
    #[error("Template body is not valid UTF-8: {message}")]
    TemplateEncoding {
        /// Decoder message.
        message: String,
    },
}

/// Remote API errors, classified at the adapter boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The named stack does not exist.
    #[error("Stack {stack} does not exist")]
    StackNotFound {
        /// Stack name.
        stack: String,
    },

    /// The submitted template and parameters contain no changes.
    #[error("The submitted information didn't contain changes")]
    NoChanges,

    /// The service rejected or failed a request.
    #[error("{operation} failed ({code}): {message}")]
    Service {
        /// API operation name.
        operation: &'static str,
        /// Service error code.
        code: String,
        /// Service error message.
        message: String,
    },

    /// The service returned a response missing required data.
    #[error("Invalid response from {operation}: {message}")]
    InvalidResponse {
        /// API operation name.
        operation: &'static str,
        /// Description of the problem.
        message: String,
    },

    /// Uploading a template to the staging bucket failed.
    #[error("Template staging failed: {message}")]
    Staging {
        /// Description of the failure.
        message: String,
    },
}

/// Change set lifecycle errors.
#[derive(Debug, Error)]
pub enum ChangeSetError {
    /// The service failed to create the change set.
    #[error("failed to create change set: {reason}")]
    Failed {
        /// Reason reported by the service.
        reason: String,
    },

    /// The change set was deleted while waiting for it.
    #[error("change set {name} removed unexpectedly")]
    RemovedUnexpectedly {
        /// Change set name.
        name: String,
    },
}

/// Deployment orchestration errors.
#[derive(Debug, Error)]
pub enum DeployError {
    /// A stack that was expected to exist does not.
    #[error("stack {stack} does not exist.")]
    StackMissing {
        /// Stack name.
        stack: String,
    },

    /// A polling loop ran past its deadline.
    #[error("timed out after {waited_secs}s waiting for {what}")]
    Timeout {
        /// What was being waited for.
        what: String,
        /// Configured timeout in seconds.
        waited_secs: u64,
    },

    /// Polling was interrupted by the cancellation signal.
    #[error("interrupted while waiting for {what}")]
    Cancelled {
        /// What was being waited for.
        what: String,
    },
}

/// Result type alias for stackshift operations.
pub type Result<T> = std::result::Result<T, StackshiftError>;

impl StackshiftError {
    /// Wraps this error with an operation label.
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, looking through context labels.
    #[must_use]
    pub fn root(&self) -> &Self {
        let mut current = self;
        while let Self::Context { source, .. } = current {
            current = source;
        }
        current
    }

    /// Returns true if the root cause is a missing stack.
    #[must_use]
    pub fn is_stack_not_found(&self) -> bool {
        matches!(self.root(), Self::Api(ApiError::StackNotFound { .. }))
    }

    /// Returns true if the root cause is an empty change set submission.
    #[must_use]
    pub fn is_no_changes(&self) -> bool {
        matches!(self.root(), Self::Api(ApiError::NoChanges))
    }

    /// Returns true if the root cause is the cancellation signal.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Self::Deploy(DeployError::Cancelled { .. }))
    }
}

/// Extension for annotating results with an operation label.
pub trait ResultExt<T> {
    /// Wraps the error, if any, with a fixed label.
    ///
    /// # Errors
    ///
    /// Returns the original error wrapped in [`StackshiftError::Context`].
    fn context(self, context: &str) -> Result<T>;

    /// Wraps the error, if any, with a lazily built label.
    ///
    /// # Errors
    ///
    /// Returns the original error wrapped in [`StackshiftError::Context`].
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<StackshiftError>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: &str) -> Result<T> {
        self.map_err(|e| e.into().context(context))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| e.into().context(f()))
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a parse error for the given location.
    #[must_use]
    pub fn parse(message: impl Into<String>, location: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
            location: location.into(),
        }
    }
}

impl ApiError {
    /// Creates a service error.
    #[must_use]
    pub fn service(
        operation: &'static str,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Service {
            operation,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid response error.
    #[must_use]
    pub fn invalid_response(operation: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            operation,
            message: message.into(),
        }
    }
}
