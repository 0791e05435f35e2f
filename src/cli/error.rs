//! CLI error type

use thiserror::Error;

use songplay_core::etl::{ConfigError, EtlError};
use songplay_core::store::StoreError;

/// Errors returned by the command handlers
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Etl(#[from] EtlError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            CliError::Etl(e) => e.user_message(),
            CliError::Store(e) => e.user_message(),
            CliError::Config(e) => e.user_message(),
            _ => self.to_string(),
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgument(_) | CliError::Config(_) => 2,
            _ => 1,
        }
    }
}
