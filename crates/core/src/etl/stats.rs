//! Run report counters

use std::time::Duration;

use serde::Serialize;

use super::loader::FileStats;

/// Errors kept in the report; the count keeps going past it
pub const MAX_RECORDED_ERRORS: usize = 100;

/// Statistics from one directory pass or one whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadStats {
    /// Files matched by the pattern
    pub files_found: usize,
    /// Files loaded and committed
    pub files_processed: usize,
    /// Files rolled back and skipped
    pub files_failed: usize,
    /// Bytes of the processed files
    pub bytes_processed: u64,
    /// Records read from processed files
    pub records_read: usize,
    /// `NextSong` events in processed log files
    pub eligible_events: usize,
    pub time_rows: usize,
    pub user_rows: usize,
    pub songplays_inserted: usize,
    pub duplicate_songplays: usize,
    pub unresolved_songplays: usize,
    /// Number of errors encountered
    pub errors_count: usize,
    /// First errors, see [`MAX_RECORDED_ERRORS`]
    pub errors: Vec<String>,
    #[serde(skip)]
    pub duration: Duration,
}

impl LoadStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one committed file
    pub fn add_file(&mut self, file: &FileStats, bytes: u64) {
        self.files_processed += 1;
        self.bytes_processed += bytes;
        self.records_read += file.events_read;
        self.eligible_events += file.eligible;
        self.time_rows += file.time_rows;
        self.user_rows += file.user_rows;
        self.songplays_inserted += file.songplays_inserted;
        self.duplicate_songplays += file.duplicates;
        self.unresolved_songplays += file.unresolved;
    }

    /// Add an error (limited to 100)
    pub fn add_error(&mut self, error: String) {
        self.errors_count += 1;
        if self.errors.len() < MAX_RECORDED_ERRORS {
            self.errors.push(error);
        }
    }

    /// Fold another pass into this one; durations add up
    pub fn merge(&mut self, other: &LoadStats) {
        self.files_found += other.files_found;
        self.files_processed += other.files_processed;
        self.files_failed += other.files_failed;
        self.bytes_processed += other.bytes_processed;
        self.records_read += other.records_read;
        self.eligible_events += other.eligible_events;
        self.time_rows += other.time_rows;
        self.user_rows += other.user_rows;
        self.songplays_inserted += other.songplays_inserted;
        self.duplicate_songplays += other.duplicate_songplays;
        self.unresolved_songplays += other.unresolved_songplays;
        self.errors_count += other.errors_count;
        let room = MAX_RECORDED_ERRORS.saturating_sub(self.errors.len());
        self.errors.extend(other.errors.iter().take(room).cloned());
        self.duration += other.duration;
    }

    /// Get records per second throughput
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.records_read as f64 / secs
        }
    }
}
