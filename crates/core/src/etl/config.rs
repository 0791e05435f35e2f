//! Configuration types for the ETL run

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use crate::store::{DEFAULT_PAGE_SIZE, StoreTarget};

/// How the log loader writes the `time` and `users` dimensions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadMode {
    /// One upsert statement per row
    #[default]
    PerRow,
    /// The whole row set of a file in paged multi-row statements
    Batched,
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadMode::PerRow => write!(f, "per-row"),
            LoadMode::Batched => write!(f, "batched"),
        }
    }
}

impl FromStr for LoadMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "per-row" | "perrow" | "row" => Ok(LoadMode::PerRow),
            "batched" | "batch" => Ok(LoadMode::Batched),
            _ => Err(format!(
                "Invalid load mode: {}. Expected: per-row, batched",
                s
            )),
        }
    }
}

/// What to do when one input file cannot be loaded
///
/// Store failures always stop the run; this only governs file-level errors
/// such as malformed JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileErrorPolicy {
    /// Roll the file back, record the error and continue with the next file
    #[default]
    Skip,
    /// Roll the file back and stop the run
    Abort,
}

impl fmt::Display for FileErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileErrorPolicy::Skip => write!(f, "skip"),
            FileErrorPolicy::Abort => write!(f, "abort"),
        }
    }
}

impl FromStr for FileErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" | "continue" => Ok(FileErrorPolicy::Skip),
            "abort" | "stop" => Ok(FileErrorPolicy::Abort),
            _ => Err(format!(
                "Invalid file error policy: {}. Expected: skip, abort",
                s
            )),
        }
    }
}

/// Configuration for one ETL run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    /// Root of the song metadata files
    pub song_data: PathBuf,
    /// Root of the activity log files
    pub log_data: PathBuf,
    /// File pattern, relative to each root
    pub pattern: String,
    /// Database to write to
    pub database: StoreTarget,
    /// Dimension write strategy for log files
    pub mode: LoadMode,
    /// Rows per statement in batched mode
    pub page_size: usize,
    /// Per-file error handling
    pub on_file_error: FileErrorPolicy,
    /// Create missing tables before loading
    pub create_tables: bool,
    /// Show progress bars
    pub progress: bool,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            song_data: PathBuf::from("data/song_data"),
            log_data: PathBuf::from("data/log_data"),
            pattern: "**/*.json".to_string(),
            database: StoreTarget::default(),
            mode: LoadMode::PerRow,
            page_size: DEFAULT_PAGE_SIZE,
            on_file_error: FileErrorPolicy::Skip,
            create_tables: true,
            progress: false,
        }
    }
}

impl EtlConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EtlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Set the song data root
    pub fn with_song_data(mut self, path: impl Into<PathBuf>) -> Self {
        self.song_data = path.into();
        self
    }

    /// Set the log data root
    pub fn with_log_data(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_data = path.into();
        self
    }

    /// Set the file pattern
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    /// Set the database target
    pub fn with_database(mut self, database: StoreTarget) -> Self {
        self.database = database;
        self
    }

    /// Set the load mode
    pub fn with_mode(mut self, mode: LoadMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the batched page size
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the file error policy
    pub fn with_on_file_error(mut self, policy: FileErrorPolicy) -> Self {
        self.on_file_error = policy;
        self
    }

    /// Create missing tables before loading
    pub fn with_create_tables(mut self, create_tables: bool) -> Self {
        self.create_tables = create_tables;
        self
    }

    /// Enable progress bars
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid(
                "page_size must be at least 1".to_string(),
            ));
        }
        if self.pattern.trim().is_empty() {
            return Err(ConfigError::Invalid("pattern must not be empty".to_string()));
        }
        if let StoreTarget::Postgres { url } = &self.database {
            if url.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "database url must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_mode_from_str() {
        assert_eq!("per-row".parse::<LoadMode>().unwrap(), LoadMode::PerRow);
        assert_eq!("Batched".parse::<LoadMode>().unwrap(), LoadMode::Batched);
        assert!("bulk".parse::<LoadMode>().is_err());
        assert_eq!(LoadMode::Batched.to_string(), "batched");
    }

    #[test]
    fn test_file_error_policy_from_str() {
        assert_eq!(
            "skip".parse::<FileErrorPolicy>().unwrap(),
            FileErrorPolicy::Skip
        );
        assert_eq!(
            "ABORT".parse::<FileErrorPolicy>().unwrap(),
            FileErrorPolicy::Abort
        );
        assert!("retry".parse::<FileErrorPolicy>().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = EtlConfig::new()
            .with_song_data("songs")
            .with_log_data("logs")
            .with_pattern("*.jsonl")
            .with_database(StoreTarget::Memory)
            .with_mode(LoadMode::Batched)
            .with_page_size(500)
            .with_on_file_error(FileErrorPolicy::Abort);

        assert_eq!(config.song_data, PathBuf::from("songs"));
        assert_eq!(config.pattern, "*.jsonl");
        assert_eq!(config.mode, LoadMode::Batched);
        assert_eq!(config.page_size, 500);
        assert_eq!(config.on_file_error, FileErrorPolicy::Abort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let config = EtlConfig::new().with_page_size(0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_from_toml_str() {
        let config = EtlConfig::from_toml_str(
            r#"
log_data = "events"
mode = "batched"
on_file_error = "abort"

[database]
kind = "postgres"
url = "host=127.0.0.1 dbname=sparkifydb user=student password=student"
"#,
        )
        .unwrap();

        assert_eq!(config.log_data, PathBuf::from("events"));
        assert_eq!(config.song_data, PathBuf::from("data/song_data"));
        assert_eq!(config.mode, LoadMode::Batched);
        assert_eq!(config.on_file_error, FileErrorPolicy::Abort);
        assert!(matches!(config.database, StoreTarget::Postgres { .. }));
    }

    #[test]
    fn test_from_toml_str_rejects_unknown_mode() {
        assert!(EtlConfig::from_toml_str(r#"mode = "bulk""#).is_err());
    }
}
