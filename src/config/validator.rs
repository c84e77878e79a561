//! Validation of settings and deployments.
//!
//! Checks run before any remote call so that malformed input never reaches
//! the change set API.

use tracing::debug;

use crate::error::{ConfigError, Result};

use super::deployment::Deployment;
use super::settings::Settings;

/// Longest stack name CloudFormation accepts.
const MAX_STACK_NAME_LEN: usize = 128;

/// Validator for settings and deployments.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates settings.
    ///
    /// # Errors
    ///
    /// Returns the first validation error found.
    pub fn validate_settings(&self, settings: &Settings) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        let polling = &settings.polling;
        for (field, value) in [
            ("polling.change_set_interval_secs", polling.change_set_interval_secs),
            ("polling.short_interval_secs", polling.short_interval_secs),
            ("polling.long_interval_secs", polling.long_interval_secs),
        ] {
            if value == 0 {
                result.errors.push(ValidationError {
                    field: field.to_string(),
                    message: format!("{field} must be at least 1 second"),
                });
            }
        }

        if polling.timeout_secs == Some(0) {
            result.errors.push(ValidationError {
                field: String::from("polling.timeout_secs"),
                message: String::from("Poll timeout must be at least 1 second"),
            });
        }

        if polling.short_interval_secs > polling.long_interval_secs {
            result.warnings.push(format!(
                "polling.short_interval_secs ({}) is longer than polling.long_interval_secs ({})",
                polling.short_interval_secs, polling.long_interval_secs
            ));
        }

        if settings.staging.bucket.as_ref().is_some_and(String::is_empty) {
            result.errors.push(ValidationError {
                field: String::from("staging.bucket"),
                message: String::from("Staging bucket name cannot be empty"),
            });
        }

        result.into_result()
    }

    /// Validates a deployment.
    ///
    /// # Errors
    ///
    /// Returns the first validation error found.
    pub fn validate_deployment(&self, deployment: &Deployment) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        if !is_valid_stack_name(&deployment.stack_name) {
            result.errors.push(ValidationError {
                field: String::from("stack_name"),
                message: format!(
                    "Stack name '{}' is invalid. Must start with a letter and contain only \
                     letters, digits and hyphens (at most {MAX_STACK_NAME_LEN} characters).",
                    deployment.stack_name
                ),
            });
        }

        for key in deployment.parameters.keys() {
            if !is_valid_parameter_key(key) {
                result.errors.push(ValidationError {
                    field: format!("parameters.{key}"),
                    message: format!("Parameter key '{key}' must be alphanumeric"),
                });
            }
        }

        if deployment.template_body.is_empty() {
            result.errors.push(ValidationError {
                field: String::from("template"),
                message: format!(
                    "Template {} is empty",
                    deployment.template_path.display()
                ),
            });
        }

        result.into_result()
    }
}

/// Checks a CloudFormation stack name.
fn is_valid_stack_name(name: &str) -> bool {
    let mut chars = name.chars();

    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }

    name.len() <= MAX_STACK_NAME_LEN && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn is_valid_parameter_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric())
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    fn into_result(self) -> Result<Self> {
        if let Some(first) = self.errors.first() {
            return Err(
                ConfigError::validation(first.message.clone(), first.field.clone()).into(),
            );
        }

        debug!("Validation passed with {} warnings", self.warnings.len());
        Ok(self)
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn deployment(stack_name: &str) -> Deployment {
        Deployment {
            tenant_label: None,
            stack_label: None,
            stack_name: stack_name.to_string(),
            template_path: PathBuf::from("stack.yaml"),
            template_body: b"Resources: {}".to_vec(),
            template_digest: String::new(),
            parameters: BTreeMap::new(),
            constants: BTreeMap::new(),
            tags: BTreeMap::new(),
            protected: false,
            account_id: None,
            region: None,
        }
    }

    #[test]
    fn test_valid_stack_name() {
        assert!(is_valid_stack_name("web"));
        assert!(is_valid_stack_name("Web-App-2"));
        assert!(is_valid_stack_name(&"a".repeat(128)));
    }

    #[test]
    fn test_invalid_stack_name() {
        assert!(!is_valid_stack_name(""));
        assert!(!is_valid_stack_name("1-stack"));
        assert!(!is_valid_stack_name("-stack"));
        assert!(!is_valid_stack_name("my_stack"));
        assert!(!is_valid_stack_name("my.stack"));
        assert!(!is_valid_stack_name(&"a".repeat(129)));
    }

    #[test]
    fn test_validate_deployment() {
        let validator = ConfigValidator::new();
        assert!(validator.validate_deployment(&deployment("web")).is_ok());
        assert!(validator.validate_deployment(&deployment("web_app")).is_err());

        let mut bad_key = deployment("web");
        bad_key
            .parameters
            .insert(String::from("Bad-Key"), String::from("x"));
        let err = validator.validate_deployment(&bad_key).unwrap_err();
        assert!(err.to_string().contains("Bad-Key"));
    }

    #[test]
    fn test_validate_settings() {
        let validator = ConfigValidator::new();
        let result = validator.validate_settings(&Settings::default()).unwrap();
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 0);

        let mut settings = Settings::default();
        settings.polling.long_interval_secs = 0;
        assert!(validator.validate_settings(&settings).is_err());

        let mut settings = Settings::default();
        settings.polling.short_interval_secs = 10;
        let result = validator.validate_settings(&settings).unwrap();
        assert_eq!(result.warning_count(), 1);
    }
}
