//! Template parameter sources.
//!
//! Parameters come from `Key=Value` pairs on the command line and from
//! parameter files. A file is either the CloudFormation JSON array form:
//!
//! ```json
//! [{"ParameterKey": "Env", "ParameterValue": "prod"}]
//! ```
//!
//! or a plain YAML/JSON mapping of key to value.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value;
use tracing::debug;

use crate::error::{ConfigError, Result};

/// One entry of the CloudFormation array form.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParameterEntry {
    parameter_key: String,
    parameter_value: Value,
}

/// Splits a `Key=Value` pair on the first `=`.
///
/// # Errors
///
/// Returns an error if there is no `=` or the key is empty.
pub fn parse_key_value(spec: &str) -> Result<(String, String)> {
    match spec.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(ConfigError::InvalidKeyValue {
            spec: spec.to_string(),
        }
        .into()),
    }
}

/// Loads a parameter file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or has neither supported shape.
pub fn load_parameter_file(path: impl AsRef<Path>) -> Result<BTreeMap<String, String>> {
    let path = path.as_ref();
    debug!("Loading parameters from: {}", path.display());

    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.to_path_buf(),
        }
        .into());
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::parse(format!("Failed to read file: {e}"), path.display().to_string())
    })?;

    parse_parameters(&content, &path.display().to_string())
}

/// Parses parameter file content. JSON is a subset of YAML so one parser
/// covers both encodings.
///
/// # Errors
///
/// Returns an error if the content has neither supported shape.
pub fn parse_parameters(content: &str, location: &str) -> Result<BTreeMap<String, String>> {
    let value: Value = serde_yaml::from_str(content)
        .map_err(|e| ConfigError::parse(format!("YAML parse error: {e}"), location))?;

    match value {
        Value::Null => Ok(BTreeMap::new()),
        Value::Sequence(_) => {
            let entries: Vec<ParameterEntry> = serde_yaml::from_value(value).map_err(|e| {
                ConfigError::parse(format!("Invalid parameter list: {e}"), location)
            })?;
            entries
                .into_iter()
                .map(|entry| -> Result<(String, String)> {
                    Ok((entry.parameter_key, scalar(&entry.parameter_value, location)?))
                })
                .collect()
        }
        Value::Mapping(mapping) => mapping
            .iter()
            .map(|(key, value)| -> Result<(String, String)> {
                Ok((scalar(key, location)?, scalar(value, location)?))
            })
            .collect(),
        _ => Err(ConfigError::parse(
            "expected a list of ParameterKey/ParameterValue entries or a mapping",
            location,
        )
        .into()),
    }
}

/// Renders a scalar YAML value as a parameter string.
fn scalar(value: &Value, location: &str) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        _ => Err(ConfigError::parse("parameter values must be scalars", location).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("Env=prod").unwrap(),
            (String::from("Env"), String::from("prod"))
        );
        assert_eq!(
            parse_key_value("Query=a=b").unwrap(),
            (String::from("Query"), String::from("a=b"))
        );
        assert_eq!(
            parse_key_value("Empty=").unwrap(),
            (String::from("Empty"), String::new())
        );
    }

    #[test]
    fn test_parse_key_value_rejects_malformed() {
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=value").is_err());
    }

    #[test]
    fn test_parse_cloudformation_array() {
        let json = r#"[
            {"ParameterKey": "Env", "ParameterValue": "prod"},
            {"ParameterKey": "Size", "ParameterValue": 3}
        ]"#;
        let params = parse_parameters(json, "params.json").unwrap();

        assert_eq!(params.len(), 2);
        assert_eq!(params["Env"], "prod");
        assert_eq!(params["Size"], "3");
    }

    #[test]
    fn test_parse_mapping() {
        let yaml = "Env: staging\nEnabled: true\n";
        let params = parse_parameters(yaml, "params.yaml").unwrap();

        assert_eq!(params["Env"], "staging");
        assert_eq!(params["Enabled"], "true");
    }

    #[test]
    fn test_parse_rejects_nested_values() {
        let yaml = "Env:\n  nested: value\n";
        assert!(parse_parameters(yaml, "params.yaml").is_err());
        assert!(parse_parameters("just a string", "params.yaml").is_err());
    }

    #[test]
    fn test_load_parameter_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "BucketName: logs").unwrap();

        let params = load_parameter_file(file.path()).unwrap();
        assert_eq!(params["BucketName"], "logs");
    }

    #[test]
    fn test_load_missing_parameter_file() {
        let err = load_parameter_file("/nonexistent/params.yaml").unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }
}
