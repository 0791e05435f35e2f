//! `run` command

use std::path::PathBuf;

use tracing::info;

use songplay_core::etl::{EtlConfig, EtlRunner, FileErrorPolicy, LoadMode};
use songplay_core::store::StoreTarget;

use crate::cli::error::CliError;
use crate::cli::output::{format_run_report, to_json};

/// Arguments for the `run` command
///
/// Every `Some` field overrides the matching config value.
#[derive(Debug, Default)]
pub struct RunArgs {
    pub song_data: Option<PathBuf>,
    pub log_data: Option<PathBuf>,
    pub pattern: Option<String>,
    pub database: Option<StoreTarget>,
    pub mode: Option<LoadMode>,
    pub page_size: Option<usize>,
    pub on_file_error: Option<FileErrorPolicy>,
    /// Show progress bars; `None` keeps the config value
    pub progress: Option<bool>,
    /// Do not create missing tables
    pub no_create_tables: bool,
    /// Print the report as JSON
    pub json: bool,
}

impl RunArgs {
    /// Apply these overrides to `config`
    pub fn apply(&self, mut config: EtlConfig) -> EtlConfig {
        if let Some(path) = &self.song_data {
            config = config.with_song_data(path.clone());
        }
        if let Some(path) = &self.log_data {
            config = config.with_log_data(path.clone());
        }
        if let Some(pattern) = &self.pattern {
            config = config.with_pattern(pattern.clone());
        }
        if let Some(database) = &self.database {
            config = config.with_database(database.clone());
        }
        if let Some(mode) = self.mode {
            config = config.with_mode(mode);
        }
        if let Some(page_size) = self.page_size {
            config = config.with_page_size(page_size);
        }
        if let Some(policy) = self.on_file_error {
            config = config.with_on_file_error(policy);
        }
        if let Some(progress) = self.progress {
            config = config.with_progress(progress);
        }
        if self.no_create_tables {
            config = config.with_create_tables(false);
        }
        config
    }
}

/// Handle the `run` command
pub fn handle_run(config: EtlConfig, args: &RunArgs) -> Result<(), CliError> {
    let config = args.apply(config);
    let runner = EtlRunner::new(config)?;

    info!(
        run_id = runner.run_id(),
        song_data = %runner.config().song_data.display(),
        log_data = %runner.config().log_data.display(),
        "Loading"
    );

    let report = runner.run()?;

    if args.json {
        println!("{}", to_json(&report)?);
    } else {
        print!("{}", format_run_report(&report));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply_on_top_of_config() {
        let config = EtlConfig::new()
            .with_mode(LoadMode::Batched)
            .with_page_size(50);
        let args = RunArgs {
            log_data: Some(PathBuf::from("events")),
            database: Some(StoreTarget::Memory),
            page_size: Some(500),
            no_create_tables: true,
            ..RunArgs::default()
        };

        let config = args.apply(config);
        assert_eq!(config.log_data, PathBuf::from("events"));
        assert_eq!(config.song_data, PathBuf::from("data/song_data"));
        assert_eq!(config.database, StoreTarget::Memory);
        assert_eq!(config.mode, LoadMode::Batched);
        assert_eq!(config.page_size, 500);
        assert!(!config.create_tables);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let args = RunArgs {
            page_size: Some(0),
            ..RunArgs::default()
        };
        let result = handle_run(EtlConfig::new(), &args);
        assert!(matches!(result, Err(CliError::Etl(_))));
    }
}
