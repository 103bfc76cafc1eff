//! Flat pipeline settings
//!
//! The deployment-specific names the pipeline needs at runtime live in a flat
//! `key = value` file without sections:
//!
//! ```ini
//! devshell_project_id = devshell-1234
//! dataset = chain
//! streaming_error_topic = ingest-errors
//! streaming_success_topic = ingest-success
//! ```
//!
//! Each key can be overridden with `SLUICE_SETTINGS_<KEY>` in the environment.

use crate::core::notify::topic_path;
use crate::domain::{Result, SluiceError};
use ::config::{Config, Environment, File, FileFormat};
use std::path::Path;

/// Environment prefix for settings overrides
pub const SETTINGS_ENV_PREFIX: &str = "SLUICE_SETTINGS";

const DEVSHELL_PROJECT_ID: &str = "devshell_project_id";
const DATASET: &str = "dataset";
const STREAMING_ERROR_TOPIC: &str = "streaming_error_topic";
const STREAMING_SUCCESS_TOPIC: &str = "streaming_success_topic";

/// Required keys, in the order they are reported when missing
pub const REQUIRED_KEYS: [&str; 4] = [
    DEVSHELL_PROJECT_ID,
    DATASET,
    STREAMING_ERROR_TOPIC,
    STREAMING_SUCCESS_TOPIC,
];

/// Pipeline settings read once at process start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Project owning the notification topics
    pub devshell_project_id: String,

    /// Dataset receiving new tables
    pub dataset: String,

    /// Topic name for failure notifications
    pub streaming_error_topic: String,

    /// Topic name for success notifications
    pub streaming_success_topic: String,
}

impl PipelineSettings {
    /// Loads settings from a flat INI file plus environment overrides
    ///
    /// # Errors
    ///
    /// Returns `ConfigMissing` naming every required key that is absent or
    /// empty, or `Configuration` if the file cannot be parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let config = Config::builder()
            .add_source(File::new(&path.to_string_lossy(), FileFormat::Ini).required(false))
            .add_source(Environment::with_prefix(SETTINGS_ENV_PREFIX))
            .build()
            .map_err(|e| {
                SluiceError::Configuration(format!(
                    "Failed to read settings file {}: {e}",
                    path.display()
                ))
            })?;

        Self::from_config(&config)
    }

    fn from_config(config: &Config) -> Result<Self> {
        let mut missing = Vec::new();
        let mut value = |key: &str| -> String {
            match config.get_string(key) {
                Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
                _ => {
                    missing.push(key.to_string());
                    String::new()
                }
            }
        };

        let settings = Self {
            devshell_project_id: value(DEVSHELL_PROJECT_ID),
            dataset: value(DATASET),
            streaming_error_topic: value(STREAMING_ERROR_TOPIC),
            streaming_success_topic: value(STREAMING_SUCCESS_TOPIC),
        };

        if !missing.is_empty() {
            return Err(SluiceError::ConfigMissing(missing));
        }
        Ok(settings)
    }

    /// `projects/{project}/topics/{success topic}`
    pub fn success_topic_path(&self) -> String {
        topic_path(&self.devshell_project_id, &self.streaming_success_topic)
    }

    /// `projects/{project}/topics/{error topic}`
    pub fn error_topic_path(&self) -> String {
        topic_path(&self.devshell_project_id, &self.streaming_error_topic)
    }
}
