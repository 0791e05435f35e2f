//! In-process store
//!
//! Keeps every table in ordered maps and applies the same conflict policies as
//! the SQL backends. Transactions snapshot the tables on `begin` and restore
//! them on `rollback`.

use std::collections::{BTreeMap, HashSet};

use super::{Store, StoreError, TableCounts, TableSnapshot};
use crate::models::{
    ArtistRow, SongMatch, SongRow, SongplayFact, SongplayKey, TimeRow, UserRow,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    created: bool,
    time: BTreeMap<i64, TimeRow>,
    users: BTreeMap<i64, UserRow>,
    songs: BTreeMap<String, SongRow>,
    artists: BTreeMap<String, ArtistRow>,
    songplays: Vec<SongplayFact>,
    songplay_keys: HashSet<SongplayKey>,
}

/// Store backed by in-process maps
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Tables,
    saved: Option<Tables>,
}

impl MemoryStore {
    /// Create an empty store. Call [`Store::create_tables`] before writing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a transaction is open
    pub fn in_transaction(&self) -> bool {
        self.saved.is_some()
    }

    fn ensure_created(&self) -> Result<(), StoreError> {
        if self.tables.created {
            Ok(())
        } else {
            Err(StoreError::Database(
                "tables do not exist, create them first".to_string(),
            ))
        }
    }
}

impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn create_tables(&mut self) -> Result<(), StoreError> {
        self.tables.created = true;
        Ok(())
    }

    fn drop_tables(&mut self) -> Result<(), StoreError> {
        self.tables = Tables::default();
        Ok(())
    }

    fn begin(&mut self) -> Result<(), StoreError> {
        if self.saved.is_some() {
            return Err(StoreError::TransactionActive);
        }
        self.saved = Some(self.tables.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.saved.take().ok_or(StoreError::NoTransaction)?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.tables = self.saved.take().ok_or(StoreError::NoTransaction)?;
        Ok(())
    }

    fn upsert_song(&mut self, song: &SongRow) -> Result<(), StoreError> {
        self.ensure_created()?;
        self.tables
            .songs
            .entry(song.song_id.clone())
            .or_insert_with(|| song.clone());
        Ok(())
    }

    fn upsert_artist(&mut self, artist: &ArtistRow) -> Result<(), StoreError> {
        self.ensure_created()?;
        self.tables
            .artists
            .entry(artist.artist_id.clone())
            .or_insert_with(|| artist.clone());
        Ok(())
    }

    fn upsert_time(&mut self, row: &TimeRow) -> Result<(), StoreError> {
        self.ensure_created()?;
        self.tables
            .time
            .entry(row.start_time)
            .or_insert_with(|| row.clone());
        Ok(())
    }

    fn upsert_user(&mut self, row: &UserRow) -> Result<(), StoreError> {
        self.ensure_created()?;
        self.tables
            .users
            .entry(row.user_id)
            .and_modify(|existing| existing.level = row.level.clone())
            .or_insert_with(|| row.clone());
        Ok(())
    }

    fn insert_songplay(&mut self, fact: &SongplayFact) -> Result<bool, StoreError> {
        self.ensure_created()?;
        if !self.tables.songplay_keys.insert(fact.key()) {
            return Ok(false);
        }
        self.tables.songplays.push(fact.clone());
        Ok(true)
    }

    fn find_song(&self, title: &str, artist_name: &str) -> Result<Option<SongMatch>, StoreError> {
        self.ensure_created()?;
        let found = self.tables.songs.values().find(|song| {
            song.title == title
                && self
                    .tables
                    .artists
                    .get(&song.artist_id)
                    .is_some_and(|artist| artist.name == artist_name)
        });

        Ok(found.map(|song| SongMatch {
            song_id: song.song_id.clone(),
            artist_id: song.artist_id.clone(),
        }))
    }

    fn table_counts(&self) -> Result<TableCounts, StoreError> {
        self.ensure_created()?;
        Ok(TableCounts {
            songplays: self.tables.songplays.len() as i64,
            users: self.tables.users.len() as i64,
            songs: self.tables.songs.len() as i64,
            artists: self.tables.artists.len() as i64,
            time: self.tables.time.len() as i64,
        })
    }

    fn snapshot(&self) -> Result<TableSnapshot, StoreError> {
        self.ensure_created()?;
        let mut songplays = self.tables.songplays.clone();
        songplays.sort_by(|a, b| a.key().cmp(&b.key()));

        Ok(TableSnapshot {
            time: self.tables.time.values().cloned().collect(),
            users: self.tables.users.values().cloned().collect(),
            songplays,
        })
    }
}
