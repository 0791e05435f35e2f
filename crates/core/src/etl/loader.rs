//! Loaders for one song file or one log file
//!
//! A log file goes through the same steps in both [`LoadMode`]s:
//!
//! 1. parse every line into an [`ActivityEvent`]
//! 2. keep the `NextSong` events
//! 3. write the `time` rows of their distinct timestamps
//! 4. write one `users` row per event
//! 5. resolve each event's song and insert its songplay, in file order
//!
//! Only steps 3 and 4 differ between the modes. Everything that can fail on
//! bad input (steps 1, 2 and the timestamp conversion) happens before the
//! first write. Transactions belong to the caller.

use std::path::Path;

use serde::Serialize;
use tracing::debug;

use super::config::LoadMode;
use super::error::EtlError;
use super::parse::{ParsedRecord, parse_log_file, parse_song_file};
use super::resolver::resolve;
use super::time::derive_time_rows;
use crate::models::{ActivityEvent, SongplayFact, TimeRow, UserRow};
use crate::store::{Store, StoreError};

/// A `NextSong` event with its required fields checked
#[derive(Debug, Clone, PartialEq)]
pub struct EligibleEvent {
    /// Line index within the file (0-based)
    pub index: usize,
    pub start_time: i64,
    pub user_id: i64,
    pub event: ActivityEvent,
}

impl EligibleEvent {
    /// The `users` row this event carries
    pub fn user_row(&self) -> UserRow {
        UserRow {
            user_id: self.user_id,
            first_name: self.event.first_name.clone(),
            last_name: self.event.last_name.clone(),
            gender: self.event.gender.clone(),
            level: self.event.level.clone(),
        }
    }

    /// The songplay fact for this event, given the resolved ids
    pub fn fact(&self, song_id: Option<String>, artist_id: Option<String>) -> SongplayFact {
        SongplayFact {
            start_time: self.start_time,
            user_id: self.user_id,
            level: self.event.level.clone(),
            song_id,
            artist_id,
            session_id: self.event.session_id,
            location: self.event.location.clone(),
            user_agent: self.event.user_agent.clone(),
        }
    }
}

/// Everything derived from one log file before anything is written
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogBatch {
    /// Records read from the file
    pub events_read: usize,
    /// `NextSong` events in file order
    pub events: Vec<EligibleEvent>,
    /// Distinct time rows, first-seen order
    pub time_rows: Vec<TimeRow>,
    /// One user row per eligible event, file order
    pub user_rows: Vec<UserRow>,
}

impl LogBatch {
    /// Filter and validate the parsed records of `path`
    pub fn from_records(
        path: &Path,
        records: Vec<ParsedRecord<ActivityEvent>>,
    ) -> Result<Self, EtlError> {
        let events_read = records.len();
        let mut events = Vec::new();

        for ParsedRecord { index, record } in records {
            if !record.is_eligible() {
                continue;
            }

            let missing = |field: &str| EtlError::Parse {
                path: path.to_path_buf(),
                line: index + 1,
                reason: format!("NextSong event without {field}"),
            };
            let start_time = record.ts.ok_or_else(|| missing("ts"))?;
            let user_id = record.user_id.ok_or_else(|| missing("userId"))?;

            events.push(EligibleEvent {
                index,
                start_time,
                user_id,
                event: record,
            });
        }

        let time_rows =
            derive_time_rows(events.iter().map(|e| e.start_time)).map_err(|e| {
                let line = events
                    .iter()
                    .find(|ev| ev.start_time == e.0)
                    .map(|ev| ev.index + 1)
                    .unwrap_or(0);
                EtlError::Parse {
                    path: path.to_path_buf(),
                    line,
                    reason: e.to_string(),
                }
            })?;
        let user_rows = events.iter().map(EligibleEvent::user_row).collect();

        Ok(Self {
            events_read,
            events,
            time_rows,
            user_rows,
        })
    }

    /// Whether the file has nothing to write
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Counters for one loaded file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStats {
    pub events_read: usize,
    pub eligible: usize,
    pub time_rows: usize,
    pub user_rows: usize,
    /// Songplays written
    pub songplays_inserted: usize,
    /// Songplays dropped because their key already existed
    pub duplicates: usize,
    /// Songplays written with no song/artist match
    pub unresolved: usize,
}

/// Write a prepared log batch
pub fn load_log_batch<S: Store + ?Sized>(
    store: &mut S,
    batch: &LogBatch,
    mode: LoadMode,
    page_size: usize,
) -> Result<FileStats, StoreError> {
    let mut stats = FileStats {
        events_read: batch.events_read,
        eligible: batch.events.len(),
        time_rows: batch.time_rows.len(),
        user_rows: batch.user_rows.len(),
        ..FileStats::default()
    };

    if batch.is_empty() {
        return Ok(stats);
    }

    match mode {
        LoadMode::PerRow => {
            for row in &batch.time_rows {
                store.upsert_time(row)?;
            }
            for row in &batch.user_rows {
                store.upsert_user(row)?;
            }
        }
        LoadMode::Batched => {
            store.upsert_times(&batch.time_rows, page_size)?;
            store.upsert_users(&batch.user_rows, page_size)?;
        }
    }
    debug!(
        time_rows = stats.time_rows,
        user_rows = stats.user_rows,
        %mode,
        "Dimensions written"
    );

    for event in &batch.events {
        let resolution = resolve(
            &*store,
            event.event.song.as_deref(),
            event.event.artist.as_deref(),
        )?;
        let resolved = resolution.is_resolved();

        let (song_id, artist_id) = resolution.into_ids();
        if store.insert_songplay(&event.fact(song_id, artist_id))? {
            stats.songplays_inserted += 1;
            if !resolved {
                stats.unresolved += 1;
            }
        } else {
            stats.duplicates += 1;
        }
    }
    debug!(
        inserted = stats.songplays_inserted,
        duplicates = stats.duplicates,
        unresolved = stats.unresolved,
        "Songplays written"
    );

    Ok(stats)
}

/// Parse and load one log file
pub fn process_log_file<S: Store + ?Sized>(
    store: &mut S,
    path: &Path,
    mode: LoadMode,
    page_size: usize,
) -> Result<FileStats, EtlError> {
    let records = parse_log_file(path)?;
    let batch = LogBatch::from_records(path, records)?;
    Ok(load_log_batch(store, &batch, mode, page_size)?)
}

/// Parse one song file and upsert its song and artist
///
/// Only the first record is used.
pub fn process_song_file<S: Store + ?Sized>(
    store: &mut S,
    path: &Path,
) -> Result<FileStats, EtlError> {
    let records = parse_song_file(path)?;
    let first = records.into_iter().next().ok_or_else(|| EtlError::Parse {
        path: path.to_path_buf(),
        line: 1,
        reason: "song file has no records".to_string(),
    })?;

    store.upsert_song(&first.record.song_row())?;
    store.upsert_artist(&first.record.artist_row())?;

    Ok(FileStats {
        events_read: 1,
        ..FileStats::default()
    })
}
