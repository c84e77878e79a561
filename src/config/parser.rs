//! Settings loading.
//!
//! Settings come from an optional YAML file, then environment variables, then
//! command line flags, each layer overriding the one before. The command line
//! layer is applied by the caller.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, Result};

use super::settings::Settings;

/// Settings file names searched for, in order.
pub const DEFAULT_SETTINGS_FILES: &[&str] = &["stackshift.yaml", "stackshift.yml"];

/// Loader for [`Settings`].
#[derive(Debug, Default)]
pub struct SettingsParser {
    /// Base path for resolving `.env`.
    base_path: Option<PathBuf>,
}

impl SettingsParser {
    /// Creates a new settings parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving `.env`.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads settings from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Settings> {
        let path = path.as_ref();
        info!("Loading settings from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::parse(format!("Failed to read file: {e}"), path.display().to_string())
        })?;

        self.parse_yaml(&content, &path.display().to_string())
    }

    /// Parses settings from a YAML string. An empty document yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, location: &str) -> Result<Settings> {
        debug!("Parsing settings YAML");

        if content.trim().is_empty() {
            return Ok(Settings::default());
        }

        let settings: Settings = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::parse(format!("YAML parse error: {e}"), location))?;

        Ok(settings)
    }

    /// Loads settings from an explicit path, or from the nearest settings
    /// file above `start_dir`, or falls back to defaults. Environment
    /// overrides are applied in every case.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit path is missing, or a file cannot be
    /// parsed, or an override is malformed.
    pub fn load(&self, explicit: Option<&Path>, start_dir: impl AsRef<Path>) -> Result<Settings> {
        let mut settings = match explicit {
            Some(path) => self.load_file(path)?,
            None => match find_settings_file(start_dir) {
                Some(path) => self.load_file(path)?,
                None => {
                    debug!("No settings file found, using defaults");
                    Settings::default()
                }
            },
        };

        Self::apply_env_overrides(&mut settings, |name| std::env::var(name).ok())?;
        Ok(settings)
    }

    /// Applies `STACKSHIFT_*` overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric override does not parse.
    pub fn apply_env_overrides<F>(settings: &mut Settings, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(profile) = lookup("STACKSHIFT_PROFILE") {
            debug!("Overriding aws.profile from environment");
            settings.aws.profile = Some(profile);
        }

        if let Some(region) = lookup("STACKSHIFT_REGION") {
            debug!("Overriding aws.region from environment");
            settings.aws.region = Some(region);
        }

        if let Some(endpoint) = lookup("STACKSHIFT_ENDPOINT") {
            debug!("Overriding aws.endpoint from environment");
            settings.aws.endpoint = Some(endpoint);
        }

        if let Some(bucket) = lookup("STACKSHIFT_STAGING_BUCKET") {
            debug!("Overriding staging.bucket from environment");
            settings.staging.bucket = Some(bucket);
        }

        if let Some(timeout) = lookup("STACKSHIFT_POLL_TIMEOUT_SECS") {
            debug!("Overriding polling.timeout_secs from environment");
            let secs = timeout.trim().parse::<u64>().map_err(|e| {
                ConfigError::validation(
                    format!("STACKSHIFT_POLL_TIMEOUT_SECS must be a number of seconds: {e}"),
                    "polling.timeout_secs",
                )
            })?;
            settings.polling.timeout_secs = Some(secs);
        }

        Ok(())
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                ConfigError::parse(
                    format!("Failed to load .env file: {e}"),
                    env_path.display().to_string(),
                )
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Finds the settings file in `start_dir` or its parents.
#[must_use]
pub fn find_settings_file(start_dir: impl AsRef<Path>) -> Option<PathBuf> {
    let mut current = start_dir.as_ref().to_path_buf();

    loop {
        for filename in DEFAULT_SETTINGS_FILES {
            let candidate = current.join(filename);
            if candidate.exists() {
                info!("Found settings file: {}", candidate.display());
                return Some(candidate);
            }
        }

        if !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_partial_settings() {
        let yaml = r"
aws:
  region: eu-west-1
polling:
  long_interval_secs: 10
";
        let settings = SettingsParser::new().parse_yaml(yaml, "test").unwrap();

        assert_eq!(settings.aws.region.as_deref(), Some("eu-west-1"));
        assert_eq!(settings.polling.long_interval_secs, 10);
        assert_eq!(settings.polling.short_interval_secs, 2);
        assert!(settings.color);
    }

    #[test]
    fn test_parse_empty_settings() {
        let settings = SettingsParser::new().parse_yaml("  \n", "test").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_parse_invalid_settings() {
        let result = SettingsParser::new().parse_yaml("polling: [1, 2", "test");
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("STACKSHIFT_REGION", "us-east-2"),
            ("STACKSHIFT_STAGING_BUCKET", "templates"),
            ("STACKSHIFT_POLL_TIMEOUT_SECS", "900"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        SettingsParser::apply_env_overrides(&mut settings, |name| {
            env.get(name).map(ToString::to_string)
        })
        .unwrap();

        assert_eq!(settings.aws.region.as_deref(), Some("us-east-2"));
        assert_eq!(settings.staging.bucket.as_deref(), Some("templates"));
        assert_eq!(settings.polling.timeout_secs, Some(900));
        assert!(settings.aws.profile.is_none());
    }

    #[test]
    fn test_env_override_rejects_bad_timeout() {
        let mut settings = Settings::default();
        let result = SettingsParser::apply_env_overrides(&mut settings, |name| {
            (name == "STACKSHIFT_POLL_TIMEOUT_SECS").then(|| String::from("soon"))
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_find_settings_file_in_parent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("stackshift.yml"), "color: false\n").unwrap();

        let found = find_settings_file(&nested).unwrap();
        assert_eq!(found, dir.path().join("stackshift.yml"));

        let settings = SettingsParser::new().load_file(&found).unwrap();
        assert!(!settings.color);
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yaml");
        let result = SettingsParser::new().load(Some(missing.as_path()), dir.path());
        assert!(result.is_err());
    }
}
