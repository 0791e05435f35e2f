//! Row types for the songplay star schema

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A row of the `time` dimension table
///
/// `start_time` is the event instant in epoch milliseconds (UTC). The calendar
/// fields are derived from it, see [`crate::etl::time`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRow {
    /// Primary key, epoch milliseconds
    pub start_time: i64,
    pub hour: i32,
    pub day: i32,
    /// ISO-8601 week of year
    pub week: i32,
    pub month: i32,
    pub year: i32,
    /// Day of week, Monday = 0
    pub weekday: i32,
}

/// A row of the `users` dimension table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRow {
    /// Primary key
    pub user_id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    /// Subscription level ("free" / "paid")
    pub level: Option<String>,
}

impl UserRow {
    /// Collapse a sequence of user rows to one row per `user_id`.
    ///
    /// The result is what applying every row as an upsert in order would
    /// leave behind for a fresh key: names from the first occurrence, level
    /// from the last. First-seen order is preserved.
    pub fn collapse(rows: &[UserRow]) -> Vec<UserRow> {
        let mut positions: HashMap<i64, usize> = HashMap::with_capacity(rows.len());
        let mut collapsed: Vec<UserRow> = Vec::with_capacity(rows.len());

        for row in rows {
            match positions.get(&row.user_id) {
                Some(&pos) => collapsed[pos].level = row.level.clone(),
                None => {
                    positions.insert(row.user_id, collapsed.len());
                    collapsed.push(row.clone());
                }
            }
        }

        collapsed
    }
}

/// A row of the `songplays` fact table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongplayFact {
    /// Epoch milliseconds, references `time.start_time`
    pub start_time: i64,
    pub user_id: i64,
    pub level: Option<String>,
    /// `None` when the song could not be resolved
    pub song_id: Option<String>,
    /// `None` when the song could not be resolved
    pub artist_id: Option<String>,
    pub session_id: Option<i64>,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

/// Uniqueness key of a songplay: `(start_time, user_id, song_id)`
///
/// Two absent song ids compare equal, so replaying a file never duplicates an
/// unresolved songplay.
pub type SongplayKey = (i64, i64, Option<String>);

impl SongplayFact {
    /// The uniqueness key of this fact
    pub fn key(&self) -> SongplayKey {
        (self.start_time, self.user_id, self.song_id.clone())
    }
}

/// A row of the `songs` reference table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongRow {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: Option<i32>,
    pub duration: Option<f64>,
}

/// A row of the `artists` reference table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistRow {
    pub artist_id: String,
    pub name: String,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A `(song_id, artist_id)` pair found by the song/artist lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongMatch {
    pub song_id: String,
    pub artist_id: String,
}
