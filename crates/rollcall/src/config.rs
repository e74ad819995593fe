//! Configuration management for rollcall.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::upload::{ProofKind, DEFAULT_MAX_FILE_SIZE};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "rollcall";

/// Default attendee table file name.
const TABLE_FILE_NAME: &str = "attendees.csv";

/// Default upload directory name.
const UPLOAD_DIR_NAME: &str = "uploads";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `ROLLCALL_`)
/// 2. TOML config file at `~/.config/rollcall/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Attendee table configuration.
    pub storage: StorageConfig,
    /// Upload configuration.
    pub uploads: UploadConfig,
}

/// Attendee table configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the CSV table.
    /// Defaults to `~/.local/share/rollcall/attendees.csv`
    pub table_path: Option<PathBuf>,
}

/// Upload configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Directory receiving proof-of-payment files.
    /// Defaults to `~/.local/share/rollcall/uploads`
    pub dir: Option<PathBuf>,
    /// Largest accepted upload in bytes.
    pub max_file_size: u64,
    /// Accepted file extensions.
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: None,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_extensions: ProofKind::ALL
                .iter()
                .map(|k| k.extension().to_string())
                .collect(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `ROLLCALL_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("ROLLCALL_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.uploads.max_file_size == 0 {
            return Err(Error::config_validation(
                "max_file_size must be greater than 0",
            ));
        }

        if self.uploads.allowed_extensions.is_empty() {
            return Err(Error::config_validation(
                "allowed_extensions must list at least one file type",
            ));
        }

        for ext in &self.uploads.allowed_extensions {
            if ProofKind::from_extension(ext).is_none() {
                return Err(Error::config_validation(format!(
                    "unsupported upload extension: {ext}"
                )));
            }
        }

        Ok(())
    }

    /// Get the table path, resolving defaults if not set.
    #[must_use]
    pub fn table_path(&self) -> PathBuf {
        self.storage
            .table_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(TABLE_FILE_NAME))
    }

    /// Get the upload directory, resolving defaults if not set.
    #[must_use]
    pub fn upload_dir(&self) -> PathBuf {
        self.uploads
            .dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(UPLOAD_DIR_NAME))
    }

    /// Get the accepted upload kinds, without duplicates.
    ///
    /// Unknown extensions are skipped; [`validate`](Self::validate) rejects
    /// them at load time.
    #[must_use]
    pub fn allowed_kinds(&self) -> Vec<ProofKind> {
        let mut kinds = Vec::new();
        for kind in self
            .uploads
            .allowed_extensions
            .iter()
            .filter_map(|ext| ProofKind::from_extension(ext))
        {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.storage.table_path.is_none());
        assert!(config.uploads.dir.is_none());
        assert_eq!(config.uploads.max_file_size, 2 * 1024 * 1024);
        assert_eq!(
            config.uploads.allowed_extensions,
            vec!["csv", "png", "jpg", "pdf"]
        );
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_max_file_size() {
        let mut config = Config::default();
        config.uploads.max_file_size = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("max_file_size"));
    }

    #[test]
    fn test_validate_empty_allow_list() {
        let mut config = Config::default();
        config.uploads.allowed_extensions.clear();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("allowed_extensions"));
    }

    #[test]
    fn test_validate_unknown_extension() {
        let mut config = Config::default();
        config.uploads.allowed_extensions.push("docx".to_string());

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("docx"));
    }

    #[test]
    fn test_table_path_default() {
        let config = Config::default();
        let path = config.table_path();

        assert!(path.to_string_lossy().contains("rollcall"));
        assert!(path.to_string_lossy().ends_with("attendees.csv"));
    }

    #[test]
    fn test_table_path_custom() {
        let mut config = Config::default();
        config.storage.table_path = Some(PathBuf::from("/srv/event/list.csv"));

        assert_eq!(config.table_path(), PathBuf::from("/srv/event/list.csv"));
    }

    #[test]
    fn test_upload_dir_default() {
        let config = Config::default();
        assert!(config.upload_dir().ends_with("uploads"));
    }

    #[test]
    fn test_allowed_kinds_dedupes_aliases() {
        let mut config = Config::default();
        config.uploads.allowed_extensions =
            vec!["jpg".to_string(), "JPEG".to_string(), "pdf".to_string()];

        assert_eq!(config.allowed_kinds(), vec![ProofKind::Jpg, ProofKind::Pdf]);
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("rollcall"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[storage]
table_path = "/srv/event/attendees.csv"

[uploads]
max_file_size = 1048576
allowed_extensions = ["pdf", "png"]
"#,
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(
            config.table_path(),
            PathBuf::from("/srv/event/attendees.csv")
        );
        assert_eq!(config.uploads.max_file_size, 1_048_576);
        assert_eq!(config.allowed_kinds(), vec![ProofKind::Pdf, ProofKind::Png]);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[uploads]\nmax_file_size = 0\n").unwrap();

        let err = Config::load_from(Some(path)).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
    }

    #[test]
    fn test_load_rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[uploads\nmax_file_size = \"big\"\n").unwrap();

        let err = Config::load_from(Some(path)).unwrap_err();
        assert!(matches!(err, Error::ConfigLoad(_)));
    }

    #[test]
    fn test_upload_config_deserialize_partial() {
        let json = r#"{"max_file_size": 5000}"#;
        let uploads: UploadConfig = serde_json::from_str(json).unwrap();
        assert_eq!(uploads.max_file_size, 5000);
        assert_eq!(uploads.allowed_extensions.len(), 4);
    }
}
