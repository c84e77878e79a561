//! Tool settings.
//!
//! These structs map to the optional `stackshift.yaml` file. Every field has a
//! default so an absent or partial file is valid.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root settings structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// AWS connection settings.
    pub aws: AwsSettings,
    /// Polling intervals and limits.
    pub polling: PollSettings,
    /// Template staging bucket.
    pub staging: StagingSettings,
    /// Whether console output is colored.
    pub color: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            aws: AwsSettings::default(),
            polling: PollSettings::default(),
            staging: StagingSettings::default(),
            color: true,
        }
    }
}

/// AWS connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AwsSettings {
    /// Shared credentials profile.
    pub profile: Option<String>,
    /// Region override.
    pub region: Option<String>,
    /// Endpoint URL override, e.g. for local emulators.
    pub endpoint: Option<String>,
}

/// Polling intervals and limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PollSettings {
    /// Wait before each change set status check.
    pub change_set_interval_secs: u64,
    /// Stack poll interval right after a status transition.
    pub short_interval_secs: u64,
    /// Stack poll interval once a status has settled.
    pub long_interval_secs: u64,
    /// Number of short-interval polls after each transition.
    pub rapid_polls: u32,
    /// Upper bound for a single polling operation; unbounded when absent.
    pub timeout_secs: Option<u64>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            change_set_interval_secs: 2,
            short_interval_secs: 2,
            long_interval_secs: 5,
            rapid_polls: 5,
            timeout_secs: None,
        }
    }
}

impl PollSettings {
    /// Wait before each change set status check.
    #[must_use]
    pub const fn change_set_interval(&self) -> Duration {
        Duration::from_secs(self.change_set_interval_secs)
    }

    /// Stack poll interval right after a status transition.
    #[must_use]
    pub const fn short_interval(&self) -> Duration {
        Duration::from_secs(self.short_interval_secs)
    }

    /// Stack poll interval once a status has settled.
    #[must_use]
    pub const fn long_interval(&self) -> Duration {
        Duration::from_secs(self.long_interval_secs)
    }

    /// Upper bound for a single polling operation.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Template staging bucket.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StagingSettings {
    /// Bucket for templates above the inline size limit.
    pub bucket: Option<String>,
    /// Key prefix inside the bucket.
    pub prefix: Option<String>,
}
