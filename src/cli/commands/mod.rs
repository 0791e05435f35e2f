//! CLI command implementations

pub mod run;
pub mod schema;
pub mod stats;

use std::path::Path;

use songplay_core::etl::EtlConfig;

use super::error::CliError;

/// Load the config file if one was given, else the defaults
pub fn load_config(path: Option<&Path>) -> Result<EtlConfig, CliError> {
    match path {
        Some(path) => Ok(EtlConfig::from_file(path)?),
        None => Ok(EtlConfig::default()),
    }
}
