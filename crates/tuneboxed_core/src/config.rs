//! On-disk layout of the two backends.
//!
//! # Invariants
//! - `data_dir` is a non-empty absolute path.
//! - File and directory names are single path components.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Component, Path, PathBuf};

pub const DEFAULT_DB_FILE_NAME: &str = "tuneboxed.sqlite3";
pub const DEFAULT_KV_DIR_NAME: &str = "kv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyDataDir,
    RelativeDataDir(String),
    InvalidName { field: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDataDir => write!(f, "data_dir cannot be empty"),
            Self::RelativeDataDir(value) => {
                write!(f, "data_dir must be an absolute path, got `{value}`")
            }
            Self::InvalidName { field, value } => {
                write!(f, "{field} must be a single file name, got `{value}`")
            }
        }
    }
}

impl Error for ConfigError {}

/// Where the structured and simple stores live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    #[serde(default = "default_db_file_name")]
    pub db_file_name: String,
    #[serde(default = "default_kv_dir_name")]
    pub kv_dir_name: String,
}

impl StoreConfig {
    /// Builds a config with default file names under `data_dir`.
    pub fn new(data_dir: &str) -> Result<Self, ConfigError> {
        let config = Self {
            data_dir: PathBuf::from(data_dir.trim()),
            db_file_name: default_db_file_name(),
            kv_dir_name: default_kv_dir_name(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks a config built by hand or deserialized.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDataDir);
        }
        if !self.data_dir.is_absolute() {
            return Err(ConfigError::RelativeDataDir(
                self.data_dir.display().to_string(),
            ));
        }
        check_file_name("db_file_name", &self.db_file_name)?;
        check_file_name("kv_dir_name", &self.kv_dir_name)?;
        Ok(())
    }

    pub fn structured_db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file_name)
    }

    pub fn kv_dir(&self) -> PathBuf {
        self.data_dir.join(&self.kv_dir_name)
    }
}

fn check_file_name(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let mut components = Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(ConfigError::InvalidName {
            field,
            value: value.to_string(),
        }),
    }
}

fn default_db_file_name() -> String {
    DEFAULT_DB_FILE_NAME.to_string()
}

fn default_kv_dir_name() -> String {
    DEFAULT_KV_DIR_NAME.to_string()
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, StoreConfig};

    #[test]
    fn new_rejects_empty_and_relative_dirs() {
        assert_eq!(StoreConfig::new("  "), Err(ConfigError::EmptyDataDir));
        assert!(matches!(
            StoreConfig::new("data/dev"),
            Err(ConfigError::RelativeDataDir(_))
        ));
    }

    #[test]
    fn derived_paths_live_under_data_dir() {
        let dir = std::env::temp_dir().join("tuneboxed-config");
        let config = StoreConfig::new(dir.to_str().unwrap()).unwrap();
        assert_eq!(config.structured_db_path(), dir.join("tuneboxed.sqlite3"));
        assert_eq!(config.kv_dir(), dir.join("kv"));
    }

    #[test]
    fn deserialized_config_fills_defaults_and_validates_names() {
        let dir = std::env::temp_dir();
        let json = serde_json::json!({ "data_dir": dir, "kv_dir_name": "../escape" });
        let config: StoreConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.db_file_name, "tuneboxed.sqlite3");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidName { field: "kv_dir_name", .. })
        ));
    }
}
