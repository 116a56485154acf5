//! Core runtime configuration.
//!
//! # Responsibility
//! - Resolve the task store path and logging settings.
//! - Accept overrides from the environment or a JSON document.
//!
//! # Invariants
//! - Resolution never fails; unusable overrides fall back to defaults.
//! - Blank values count as unset.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "TODOLIST_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "TODOLIST_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TODOLIST_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "todolist.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Local task store file.
    pub db_path: PathBuf,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Rolling log directory; file logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Defaults overridden by `TODOLIST_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by values from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        config.apply_overrides(lookup);
        config
    }

    /// Parses a JSON document; missing keys keep their defaults.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(ConfigError::Parse)
    }

    /// Applies non-blank values from `lookup` on top of `self`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(path) = non_blank(ENV_DB_PATH) {
            self.db_path = PathBuf::from(path);
        }
        if let Some(level) = non_blank(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(dir) = non_blank(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(dir));
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid config document: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, ENV_DB_PATH, ENV_LOG_DIR, ENV_LOG_LEVEL};
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[test]
    fn lookup_overrides_defaults_and_ignores_blanks() {
        let values = HashMap::from([
            (ENV_DB_PATH, "/data/tasks.sqlite3"),
            (ENV_LOG_LEVEL, "  "),
            (ENV_LOG_DIR, "/data/logs"),
        ]);
        let config = CoreConfig::from_lookup(|key| values.get(key).map(|v| v.to_string()));

        assert_eq!(config.db_path, PathBuf::from("/data/tasks.sqlite3"));
        assert_eq!(config.log_level, CoreConfig::default().log_level);
        assert_eq!(config.log_dir, Some(PathBuf::from("/data/logs")));
    }

    #[test]
    fn json_document_fills_missing_keys_with_defaults() {
        let config = CoreConfig::from_json(r#"{"log_level":"warn"}"#).unwrap();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.db_path, CoreConfig::default().db_path);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(CoreConfig::from_json("{not json").is_err());
    }
}
