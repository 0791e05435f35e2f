//! Error types for ETL operations

use std::path::PathBuf;
use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur while loading input files
#[derive(Error, Debug)]
pub enum EtlError {
    /// Malformed line or field in an input file
    #[error("Parse error in {path} at line {line}: {reason}")]
    Parse {
        path: PathBuf,
        /// 1-based line number
        line: usize,
        reason: String,
    },

    /// Input directory not found
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    /// Pattern matching error
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Store error wrapper
    #[error(transparent)]
    Store(#[from] StoreError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while building or loading a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Config file could not be read
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ConfigError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::Invalid(msg) => {
                format!("Invalid configuration: {msg}\n\nHint: Check your config file and flags.")
            }
            ConfigError::Read { path, source } => {
                format!(
                    "Cannot read config file {}: {source}\n\nHint: Pass an existing file to --config.",
                    path.display()
                )
            }
            ConfigError::Toml(e) => format!(
                "Invalid config file:\n{e}\n\n\
                Hint: Known keys are song_data, log_data, pattern, mode, page_size, \
                on_file_error, create_tables, progress and a [database] table."
            ),
        }
    }
}

impl EtlError {
    /// Whether the error must stop the run whatever the file error policy
    ///
    /// Store failures are fatal; problems confined to one input file are not.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EtlError::Store(_)
                | EtlError::Config(_)
                | EtlError::DirectoryNotFound(_)
                | EtlError::InvalidPattern(_)
        )
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            EtlError::Parse { path, line, reason } => {
                format!(
                    "Parse error in {} at line {line}:\n{reason}\n\n\
                    Hint: Check the JSON syntax of that line.",
                    path.display()
                )
            }
            EtlError::DirectoryNotFound(path) => {
                format!(
                    "Directory not found: {}\n\nHint: Check the song_data/log_data paths.",
                    path.display()
                )
            }
            EtlError::InvalidPattern(pattern) => {
                format!(
                    "Invalid glob pattern: {pattern}\n\n\
                    Hint: Use standard glob syntax like '*.json' or '**/*.json'."
                )
            }
            EtlError::Config(e) => e.user_message(),
            EtlError::Store(e) => e.user_message(),
            _ => self.to_string(),
        }
    }
}
