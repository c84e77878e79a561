//! Resolved deploy intent.
//!
//! A [`Deployment`] is assembled once per invocation by [`DeploymentBuilder`]
//! and read by the deployer for the rest of the run. It is never mutated
//! after `build`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::cloudformation::Parameter;
use crate::error::{ConfigError, Result};

use super::hash::TemplateHasher;
use super::parameters::load_parameter_file;

/// One fully resolved deploy intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    /// Tenant the deployment is made for.
    pub tenant_label: Option<String>,
    /// Manifest label of the stack, as opposed to its final name.
    pub stack_label: Option<String>,
    /// Target stack name.
    pub stack_name: String,
    /// Template file the body was read from.
    pub template_path: PathBuf,
    /// Raw template body.
    pub template_body: Vec<u8>,
    /// Hex SHA-256 of the template body.
    pub template_digest: String,
    /// Parameter key to value; keys are unique by construction.
    pub parameters: BTreeMap<String, String>,
    /// Resolved constants available to parameter values.
    pub constants: BTreeMap<String, String>,
    /// Tags announced with the deployment.
    pub tags: BTreeMap<String, String>,
    /// Whether executing a change set needs explicit confirmation.
    pub protected: bool,
    /// Target account, when known.
    pub account_id: Option<String>,
    /// Target region, when known.
    pub region: Option<String>,
}

impl Deployment {
    /// Returns the template body as text.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid UTF-8.
    pub fn template_text(&self) -> Result<&str> {
        std::str::from_utf8(&self.template_body).map_err(|e| {
            ConfigError::TemplateEncoding {
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Returns the parameters as an API parameter list.
    #[must_use]
    pub fn parameter_list(&self) -> Vec<Parameter> {
        self.parameters
            .iter()
            .map(|(key, value)| Parameter {
                key: key.clone(),
                value: value.clone(),
            })
            .collect()
    }

    /// Returns the template size in bytes.
    #[must_use]
    pub fn template_size(&self) -> usize {
        self.template_body.len()
    }
}

/// Assembles a [`Deployment`] from files and command line values.
#[derive(Debug, Default)]
pub struct DeploymentBuilder {
    template_path: PathBuf,
    tenant_label: Option<String>,
    stack_label: Option<String>,
    stack_name: Option<String>,
    parameter_files: Vec<PathBuf>,
    parameters: Vec<(String, String)>,
    constants: BTreeMap<String, String>,
    tags: BTreeMap<String, String>,
    protected: bool,
    account_id: Option<String>,
    region: Option<String>,
}

impl DeploymentBuilder {
    /// Starts a builder for the given template file.
    #[must_use]
    pub fn new(template_path: impl Into<PathBuf>) -> Self {
        Self {
            template_path: template_path.into(),
            ..Self::default()
        }
    }

    /// Sets the stack name. Defaults to the template file stem.
    #[must_use]
    pub fn stack_name(mut self, name: Option<String>) -> Self {
        self.stack_name = name;
        self
    }

    /// Adds a parameter file. Later files override earlier ones.
    #[must_use]
    pub fn parameter_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.parameter_files.push(path.into());
        self
    }

    /// Adds an inline parameter. Inline parameters override files.
    #[must_use]
    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((key.into(), value.into()));
        self
    }

    /// Sets the tenant label.
    #[must_use]
    pub fn tenant_label(mut self, label: Option<String>) -> Self {
        self.tenant_label = label;
        self
    }

    /// Sets the stack label.
    #[must_use]
    pub fn stack_label(mut self, label: Option<String>) -> Self {
        self.stack_label = label;
        self
    }

    /// Adds a resolved constant.
    #[must_use]
    pub fn constant(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.constants.insert(key.into(), value.into());
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Marks the deployment as protected.
    #[must_use]
    pub const fn protected(mut self, protected: bool) -> Self {
        self.protected = protected;
        self
    }

    /// Sets the target account.
    #[must_use]
    pub fn account_id(mut self, account_id: Option<String>) -> Self {
        self.account_id = account_id;
        self
    }

    /// Sets the target region.
    #[must_use]
    pub fn region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    /// Reads the template and parameter files and builds the deployment.
    ///
    /// # Errors
    ///
    /// Returns an error if a file is missing or unreadable, or the stack name
    /// cannot be derived.
    pub fn build(self) -> Result<Deployment> {
        let template_path = self.template_path;
        info!("Loading template from: {}", template_path.display());

        if !template_path.exists() {
            return Err(ConfigError::FileNotFound {
                path: template_path,
            }
            .into());
        }

        let template_body = std::fs::read(&template_path)?;
        let template_digest = TemplateHasher::new().digest(&template_body);

        let mut parameters = BTreeMap::new();
        for file in &self.parameter_files {
            parameters.extend(load_parameter_file(file)?);
        }
        parameters.extend(self.parameters);

        let stack_name = match self.stack_name {
            Some(name) => name,
            None => default_stack_name(&template_path)?,
        };

        debug!(
            "Resolved deployment for {stack_name}: {} parameters, {} constants, {} bytes",
            parameters.len(),
            self.constants.len(),
            template_body.len()
        );

        Ok(Deployment {
            tenant_label: self.tenant_label,
            stack_label: self.stack_label,
            stack_name,
            template_path,
            template_body,
            template_digest,
            parameters,
            constants: self.constants,
            tags: self.tags,
            protected: self.protected,
            account_id: self.account_id,
            region: self.region,
        })
    }
}

/// Derives a stack name from the template file stem.
fn default_stack_name(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| {
            ConfigError::validation(
                format!(
                    "cannot derive a stack name from {}; pass --stack-name",
                    path.display()
                ),
                "stack_name",
            )
            .into()
        })
}
