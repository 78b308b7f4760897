//! Firestore Configuration Module
//!
//! Configuration for a client session: which project and database to talk
//! to, plus logging defaults. Values come from a TOML file and can be
//! overridden from the environment.
//!
//! ```toml
//! project_id = "my-project"
//! database_id = "(default)"
//!
//! [logging]
//! level = "debug"
//! ```

use firestore_core::{DatabaseName, DEFAULT_DATABASE_ID};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Project id override
pub const ENV_PROJECT_ID: &str = "FIRESTORE_PROJECT_ID";
/// Database id override
pub const ENV_DATABASE_ID: &str = "FIRESTORE_DATABASE_ID";
/// Fallback project id, shared with other Google Cloud tooling
pub const ENV_GOOGLE_CLOUD_PROJECT: &str = "GOOGLE_CLOUD_PROJECT";
/// Emulator address (`host:port`)
pub const ENV_EMULATOR_HOST: &str = "FIRESTORE_EMULATOR_HOST";

/// Default log filter
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is missing or malformed
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Logger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Google Cloud project id
    pub project_id: String,
    /// Database id within the project
    pub database_id: String,
    /// Emulator address, if the service should target one
    pub emulator_host: Option<String>,
    /// Logging defaults
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            database_id: DEFAULT_DATABASE_ID.to_string(),
            emulator_host: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Config for a project on its default database.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Self::default()
        }
    }

    /// Selects a database id.
    pub fn with_database_id(mut self, database_id: impl Into<String>) -> Self {
        self.database_id = database_id.into();
        self
    }

    /// Targets an emulator at `host` (`host:port`).
    pub fn with_emulator_host(mut self, host: impl Into<String>) -> Self {
        self.emulator_host = Some(host.into());
        self
    }

    /// Parses TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Loads a TOML file, applies environment overrides and validates.
    ///
    /// A missing file is not an error; the defaults plus environment are
    /// used instead.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml_str(&content)?
        } else {
            Self::default()
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`.
    ///
    /// `FIRESTORE_PROJECT_ID` wins over the file; `GOOGLE_CLOUD_PROJECT` is
    /// only used when no project id is set at all.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(project_id) = non_empty(ENV_PROJECT_ID) {
            self.project_id = project_id;
        } else if self.project_id.is_empty() {
            if let Some(project_id) = non_empty(ENV_GOOGLE_CLOUD_PROJECT) {
                self.project_id = project_id;
            }
        }
        if let Some(database_id) = non_empty(ENV_DATABASE_ID) {
            self.database_id = database_id;
        }
        if let Some(host) = non_empty(ENV_EMULATOR_HOST) {
            self.emulator_host = Some(host);
        }
    }

    /// Checks that the config names a usable database.
    pub fn validate(&self) -> Result<()> {
        if self.project_id.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "project_id is required (set it in the config file or {ENV_PROJECT_ID})"
            )));
        }
        self.database_name().map(|_| ())
    }

    /// The `projects/{p}/databases/{d}` name this config points at.
    pub fn database_name(&self) -> Result<DatabaseName> {
        DatabaseName::new(self.project_id.clone(), self.database_id.clone())
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.database_id, DEFAULT_DATABASE_ID);
        assert_eq!(config.logging.level, DEFAULT_LOG_LEVEL);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_precedence() {
        let env: HashMap<&str, &str> = [
            (ENV_PROJECT_ID, "from-env"),
            (ENV_GOOGLE_CLOUD_PROJECT, "from-gcloud"),
        ]
        .into_iter()
        .collect();

        let mut config = ClientConfig::new("from-file");
        config.apply_env_with(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.project_id, "from-env");
    }

    #[test]
    fn test_gcloud_fallback_only_when_unset() {
        let lookup = |k: &str| (k == ENV_GOOGLE_CLOUD_PROJECT).then(|| "gcloud".to_string());

        let mut unset = ClientConfig::default();
        unset.apply_env_with(lookup);
        assert_eq!(unset.project_id, "gcloud");

        let mut set = ClientConfig::new("file");
        set.apply_env_with(lookup);
        assert_eq!(set.project_id, "file");
    }
}
