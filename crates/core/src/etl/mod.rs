//! Song and log file loading
//!
//! A run makes two directory passes over a static file set:
//!
//! 1. **Songs**: each song file upserts one `songs` row and one `artists` row
//! 2. **Logs**: each log file writes the `time` and `users` rows of its
//!    `NextSong` events, then one `songplays` row per event with the song and
//!    artist resolved against the tables loaded in pass 1
//!
//! Every file runs in its own transaction. Re-running over the same files
//! leaves the tables unchanged.
//!
//! # Example
//!
//! ```rust,ignore
//! use songplay_core::etl::{EtlConfig, EtlRunner, LoadMode};
//! use songplay_core::store::StoreTarget;
//!
//! let config = EtlConfig::new()
//!     .with_song_data("data/song_data")
//!     .with_log_data("data/log_data")
//!     .with_database(StoreTarget::parse("sparkify.duckdb"))
//!     .with_mode(LoadMode::Batched);
//!
//! let report = EtlRunner::new(config)?.run()?;
//! println!("{} songplays", report.counts.songplays);
//! ```
//!
//! # Load modes
//!
//! - [`LoadMode::PerRow`]: one upsert per `time` row and per `users` row
//! - [`LoadMode::Batched`]: the rows of a file go out in paged multi-row
//!   statements
//!
//! Both leave identical table contents.

pub mod config;
pub mod error;
pub mod loader;
pub mod parse;
pub mod progress;
pub mod resolver;
pub mod stats;
pub mod time;
pub mod timing;
pub mod walker;

pub use config::{EtlConfig, FileErrorPolicy, LoadMode};
pub use error::{ConfigError, EtlError};
pub use loader::{
    EligibleEvent, FileStats, LogBatch, load_log_batch, process_log_file, process_song_file,
};
pub use parse::{ParsedRecord, parse_log_file, parse_song_file};
pub use progress::{LoadProgress, format_bytes, format_number};
pub use resolver::{Resolution, resolve};
pub use stats::LoadStats;
pub use time::{TimestampError, derive_time_rows, time_row};
pub use timing::ScopedTimer;
pub use walker::{DirectoryPass, DiscoveredFile, FileKind, discover_files, process_directory};

use tracing::{info, info_span};
use uuid::Uuid;

use crate::store::{Store, TableCounts, open_store};

/// Result type for ETL operations
pub type EtlResult<T> = Result<T, EtlError>;

/// Runs the song pass then the log pass against one store
pub struct EtlRunner {
    config: EtlConfig,
    run_id: String,
}

impl EtlRunner {
    /// Create a runner; the config is validated here
    pub fn new(config: EtlConfig) -> EtlResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            run_id: Uuid::new_v4().to_string(),
        })
    }

    pub fn config(&self) -> &EtlConfig {
        &self.config
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Open the configured store and run against it
    pub fn run(&self) -> EtlResult<RunReport> {
        let mut store = open_store(&self.config.database)?;
        self.run_with(&mut store)
    }

    /// Run against an already open store
    pub fn run_with<S: Store + ?Sized>(&self, store: &mut S) -> EtlResult<RunReport> {
        let _span = info_span!(
            "etl_run",
            run_id = %self.run_id,
            backend = store.backend(),
            mode = %self.config.mode
        )
        .entered();

        let timer = ScopedTimer::new("etl_run");
        info!(
            run_id = %self.run_id,
            database = %self.config.database.display(),
            "Starting ETL run"
        );

        if self.config.create_tables {
            store.create_tables()?;
        }

        let songs = {
            let _pass = ScopedTimer::new("song_data");
            process_directory(&mut *store, &self.pass(FileKind::Song))?
        };
        let logs = {
            let _pass = ScopedTimer::new("log_data");
            process_directory(&mut *store, &self.pass(FileKind::Log))?
        };

        let counts = store.table_counts()?;
        let duration = timer.stop();

        info!(
            run_id = %self.run_id,
            duration_ms = duration.as_millis() as u64,
            songplays = counts.songplays,
            "ETL run completed"
        );

        Ok(RunReport {
            run_id: self.run_id.clone(),
            backend: store.backend().to_string(),
            songs,
            logs,
            counts,
            duration_ms: duration.as_millis() as u64,
        })
    }

    fn pass(&self, kind: FileKind) -> DirectoryPass<'_> {
        let root = match kind {
            FileKind::Song => self.config.song_data.as_path(),
            FileKind::Log => self.config.log_data.as_path(),
        };
        DirectoryPass {
            root,
            pattern: &self.config.pattern,
            kind,
            mode: self.config.mode,
            page_size: self.config.page_size,
            on_file_error: self.config.on_file_error,
            progress: self.config.progress,
        }
    }
}

/// Report from one ETL run
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: String,
    /// Store backend name
    pub backend: String,
    /// Song pass statistics
    pub songs: LoadStats,
    /// Log pass statistics
    pub logs: LoadStats,
    /// Row counts after the run
    pub counts: TableCounts,
    /// Total duration in milliseconds
    pub duration_ms: u64,
}

impl RunReport {
    /// Both passes folded together
    pub fn total(&self) -> LoadStats {
        let mut total = self.songs.clone();
        total.merge(&self.logs);
        total
    }

    /// Whether every discovered file was committed
    pub fn is_clean(&self) -> bool {
        self.songs.files_failed == 0 && self.logs.files_failed == 0
    }

    /// Get formatted duration
    pub fn duration_formatted(&self) -> String {
        let secs = self.duration_ms / 1000;
        let mins = secs / 60;
        let remaining_secs = secs % 60;

        if mins > 0 {
            format!("{}m {}s", mins, remaining_secs)
        } else {
            format!("{}.{:03}s", secs, self.duration_ms % 1000)
        }
    }
}
