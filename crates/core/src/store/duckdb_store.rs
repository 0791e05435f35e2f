//! DuckDB store implementation

use duckdb::types::Value;
use duckdb::{Connection, params, params_from_iter};

use super::schema::{SongplaySchema, values_list};
use super::{Store, StoreError, TableCounts, TableSnapshot};
use crate::models::{ArtistRow, SongMatch, SongRow, SongplayFact, TimeRow, UserRow};

const INSERT_SONG: &str = "INSERT INTO songs (song_id, title, artist_id, year, duration)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT (song_id) DO NOTHING";

const INSERT_ARTIST: &str = "INSERT INTO artists (artist_id, name, location, latitude, longitude)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT (artist_id) DO NOTHING";

const INSERT_SONGPLAY: &str = "INSERT INTO songplays
     (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)
     SELECT epoch_ms(CAST(?1 AS BIGINT)), ?2, ?3, ?4, ?5, ?6, ?7, ?8
     WHERE NOT EXISTS (
         SELECT 1 FROM songplays
         WHERE start_time = epoch_ms(CAST(?1 AS BIGINT))
           AND user_id = ?2
           AND song_id IS NOT DISTINCT FROM ?4
     )
     ON CONFLICT (start_time, user_id, song_id) DO NOTHING";

const SELECT_SONG: &str = "SELECT s.song_id, s.artist_id
     FROM songs s
     JOIN artists a ON s.artist_id = a.artist_id
     WHERE s.title = ?1 AND a.name = ?2
     ORDER BY s.song_id
     LIMIT 1";

fn time_tuple(p: usize) -> String {
    format!(
        "(epoch_ms(CAST(?{} AS BIGINT)), ?{}, ?{}, ?{}, ?{}, ?{}, ?{})",
        p,
        p + 1,
        p + 2,
        p + 3,
        p + 4,
        p + 5,
        p + 6
    )
}

fn user_tuple(p: usize) -> String {
    format!("(?{}, ?{}, ?{}, ?{}, ?{})", p, p + 1, p + 2, p + 3, p + 4)
}

fn time_values(row: &TimeRow) -> [Value; 7] {
    [
        Value::BigInt(row.start_time),
        Value::Int(row.hour),
        Value::Int(row.day),
        Value::Int(row.week),
        Value::Int(row.month),
        Value::Int(row.year),
        Value::Int(row.weekday),
    ]
}

fn text(value: &Option<String>) -> Value {
    value.clone().map(Value::Text).unwrap_or(Value::Null)
}

fn user_values(row: &UserRow) -> [Value; 5] {
    [
        Value::BigInt(row.user_id),
        text(&row.first_name),
        text(&row.last_name),
        text(&row.gender),
        text(&row.level),
    ]
}

/// Store backed by an embedded DuckDB database
pub struct DuckDbStore {
    conn: Connection,
    in_transaction: bool,
}

impl DuckDbStore {
    /// Open or create a database at the given path
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn,
            in_transaction: false,
        })
    }

    /// Open an in-memory database (for testing)
    pub fn memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn,
            in_transaction: false,
        })
    }

    fn count(&self, table: &str) -> Result<i64, StoreError> {
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count)
    }
}

impl Store for DuckDbStore {
    fn backend(&self) -> &'static str {
        "duckdb"
    }

    fn create_tables(&mut self) -> Result<(), StoreError> {
        self.conn
            .execute_batch(SongplaySchema::create_tables_duckdb())?;
        Ok(())
    }

    fn drop_tables(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch(SongplaySchema::drop_tables_duckdb())?;
        Ok(())
    }

    fn begin(&mut self) -> Result<(), StoreError> {
        if self.in_transaction {
            return Err(StoreError::TransactionActive);
        }
        self.conn.execute_batch("BEGIN TRANSACTION")?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if !self.in_transaction {
            return Err(StoreError::NoTransaction);
        }
        self.in_transaction = false;
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        if !self.in_transaction {
            return Err(StoreError::NoTransaction);
        }
        self.in_transaction = false;
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn upsert_song(&mut self, song: &SongRow) -> Result<(), StoreError> {
        self.conn.execute(
            INSERT_SONG,
            params![
                song.song_id,
                song.title,
                song.artist_id,
                song.year,
                song.duration
            ],
        )?;
        Ok(())
    }

    fn upsert_artist(&mut self, artist: &ArtistRow) -> Result<(), StoreError> {
        self.conn.execute(
            INSERT_ARTIST,
            params![
                artist.artist_id,
                artist.name,
                artist.location.as_deref(),
                artist.latitude,
                artist.longitude
            ],
        )?;
        Ok(())
    }

    fn upsert_time(&mut self, row: &TimeRow) -> Result<(), StoreError> {
        self.upsert_times(std::slice::from_ref(row), 1)
    }

    fn upsert_times(&mut self, rows: &[TimeRow], page_size: usize) -> Result<(), StoreError> {
        // Duplicate keys inside one statement are rejected, keep the first
        let mut seen = std::collections::HashSet::with_capacity(rows.len());
        let rows: Vec<&TimeRow> = rows.iter().filter(|r| seen.insert(r.start_time)).collect();

        for page in rows.chunks(page_size.max(1)) {
            let sql = format!(
                "INSERT INTO \"time\" (start_time, hour, day, week, month, year, weekday)
                 VALUES {}
                 ON CONFLICT (start_time) DO NOTHING",
                values_list(page.len(), 7, time_tuple)
            );
            let values: Vec<Value> = page.iter().flat_map(|r| time_values(r)).collect();
            self.conn.execute(&sql, params_from_iter(values.iter()))?;
        }
        Ok(())
    }

    fn upsert_user(&mut self, row: &UserRow) -> Result<(), StoreError> {
        self.upsert_users(std::slice::from_ref(row), 1)
    }

    fn upsert_users(&mut self, rows: &[UserRow], page_size: usize) -> Result<(), StoreError> {
        // One row per key per statement, so the level update is applied once
        let rows = UserRow::collapse(rows);

        for page in rows.chunks(page_size.max(1)) {
            let sql = format!(
                "INSERT INTO users (user_id, first_name, last_name, gender, level)
                 VALUES {}
                 ON CONFLICT (user_id) DO UPDATE SET level = excluded.level",
                values_list(page.len(), 5, user_tuple)
            );
            let values: Vec<Value> = page.iter().flat_map(user_values).collect();
            self.conn.execute(&sql, params_from_iter(values.iter()))?;
        }
        Ok(())
    }

    fn insert_songplay(&mut self, fact: &SongplayFact) -> Result<bool, StoreError> {
        let inserted = self.conn.execute(
            INSERT_SONGPLAY,
            params![
                fact.start_time,
                fact.user_id,
                fact.level.as_deref(),
                fact.song_id.as_deref(),
                fact.artist_id.as_deref(),
                fact.session_id,
                fact.location.as_deref(),
                fact.user_agent.as_deref()
            ],
        )?;
        Ok(inserted > 0)
    }

    fn find_song(&self, title: &str, artist_name: &str) -> Result<Option<SongMatch>, StoreError> {
        let result = self.conn.query_row(SELECT_SONG, [title, artist_name], |row| {
            Ok(SongMatch {
                song_id: row.get(0)?,
                artist_id: row.get(1)?,
            })
        });

        match result {
            Ok(found) => Ok(Some(found)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn table_counts(&self) -> Result<TableCounts, StoreError> {
        Ok(TableCounts {
            songplays: self.count("songplays")?,
            users: self.count("users")?,
            songs: self.count("songs")?,
            artists: self.count("artists")?,
            time: self.count("\"time\"")?,
        })
    }

    fn snapshot(&self) -> Result<TableSnapshot, StoreError> {
        let mut snapshot = TableSnapshot::default();

        let mut stmt = self.conn.prepare(
            "SELECT epoch_ms(start_time), hour, day, week, month, year, weekday
             FROM \"time\" ORDER BY start_time",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(TimeRow {
                start_time: row.get(0)?,
                hour: row.get(1)?,
                day: row.get(2)?,
                week: row.get(3)?,
                month: row.get(4)?,
                year: row.get(5)?,
                weekday: row.get(6)?,
            })
        })?;
        for row in rows {
            snapshot.time.push(row?);
        }

        let mut stmt = self.conn.prepare(
            "SELECT user_id, first_name, last_name, gender, level FROM users ORDER BY user_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(UserRow {
                user_id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
                gender: row.get(3)?,
                level: row.get(4)?,
            })
        })?;
        for row in rows {
            snapshot.users.push(row?);
        }

        let mut stmt = self.conn.prepare(
            "SELECT epoch_ms(start_time), user_id, level, song_id, artist_id,
                    session_id, location, user_agent
             FROM songplays
             ORDER BY start_time, user_id, song_id NULLS FIRST",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(SongplayFact {
                start_time: row.get(0)?,
                user_id: row.get(1)?,
                level: row.get(2)?,
                song_id: row.get(3)?,
                artist_id: row.get(4)?,
                session_id: row.get(5)?,
                location: row.get(6)?,
                user_agent: row.get(7)?,
            })
        })?;
        for row in rows {
            snapshot.songplays.push(row?);
        }

        Ok(snapshot)
    }
}

impl From<duckdb::Error> for StoreError {
    fn from(err: duckdb::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> DuckDbStore {
        let mut store = DuckDbStore::memory().unwrap();
        store.create_tables().unwrap();
        store
    }

    fn time_row(start_time: i64) -> TimeRow {
        TimeRow {
            start_time,
            hour: 20,
            day: 1,
            week: 44,
            month: 11,
            year: 2018,
            weekday: 3,
        }
    }

    fn user(id: i64, first: &str, level: &str) -> UserRow {
        UserRow {
            user_id: id,
            first_name: Some(first.to_string()),
            last_name: Some("Summers".to_string()),
            gender: Some("F".to_string()),
            level: Some(level.to_string()),
        }
    }

    fn fact(song_id: Option<&str>) -> SongplayFact {
        SongplayFact {
            start_time: 1541106106796,
            user_id: 8,
            level: Some("free".to_string()),
            song_id: song_id.map(str::to_string),
            artist_id: song_id.map(|_| "AR1".to_string()),
            session_id: Some(139),
            location: Some("Phoenix-Mesa-Scottsdale, AZ".to_string()),
            user_agent: None,
        }
    }

    #[test]
    fn test_create_tables_is_idempotent() {
        let mut store = store();
        store.create_tables().unwrap();
        assert_eq!(store.table_counts().unwrap(), TableCounts::default());
    }

    #[test]
    fn test_time_round_trips_epoch_millis() {
        let mut store = store();
        store.upsert_time(&time_row(1541105830796)).unwrap();
        store.upsert_time(&time_row(1541105830796)).unwrap();

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.time, vec![time_row(1541105830796)]);
    }

    #[test]
    fn test_batched_times_skip_duplicates() {
        let mut store = store();
        store.upsert_time(&time_row(3)).unwrap();
        let rows: Vec<TimeRow> = [1, 2, 2, 3, 4].into_iter().map(time_row).collect();
        store.upsert_times(&rows, 2).unwrap();

        assert_eq!(store.table_counts().unwrap().time, 4);
    }

    #[test]
    fn test_user_upsert_overwrites_level_only() {
        let mut store = store();
        store.upsert_user(&user(10, "Kaylee", "free")).unwrap();
        store
            .upsert_users(&[user(10, "Other", "paid"), user(11, "Lily", "free")], 100)
            .unwrap();

        let users = store.snapshot().unwrap().users;
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].first_name.as_deref(), Some("Kaylee"));
        assert_eq!(users[0].level.as_deref(), Some("paid"));
    }

    #[test]
    fn test_songplay_duplicates_are_dropped() {
        let mut store = store();
        assert!(store.insert_songplay(&fact(Some("SO1"))).unwrap());
        assert!(!store.insert_songplay(&fact(Some("SO1"))).unwrap());
        assert!(store.insert_songplay(&fact(None)).unwrap());
        assert!(!store.insert_songplay(&fact(None)).unwrap());

        assert_eq!(store.table_counts().unwrap().songplays, 2);
        let songplays = store.snapshot().unwrap().songplays;
        assert_eq!(songplays[0].song_id, None);
        assert_eq!(songplays[1].song_id.as_deref(), Some("SO1"));
    }

    #[test]
    fn test_rollback_discards_writes() {
        let mut store = store();
        store.begin().unwrap();
        store.upsert_user(&user(1, "A", "free")).unwrap();
        store.rollback().unwrap();

        assert_eq!(store.table_counts().unwrap().users, 0);
        assert!(matches!(store.rollback(), Err(StoreError::NoTransaction)));
    }

    #[test]
    fn test_find_song_joins_artist_name() {
        let mut store = store();
        store
            .upsert_artist(&ArtistRow {
                artist_id: "AR1".to_string(),
                name: "Casual".to_string(),
                location: Some("California - LA".to_string()),
                latitude: None,
                longitude: None,
            })
            .unwrap();
        store
            .upsert_song(&SongRow {
                song_id: "SO1".to_string(),
                title: "I Didn't Mean To".to_string(),
                artist_id: "AR1".to_string(),
                year: Some(0),
                duration: Some(218.93179),
            })
            .unwrap();

        let found = store.find_song("I Didn't Mean To", "Casual").unwrap();
        assert_eq!(
            found,
            Some(SongMatch {
                song_id: "SO1".to_string(),
                artist_id: "AR1".to_string(),
            })
        );
        assert!(store.find_song("I Didn't Mean To", "casual").unwrap().is_none());
    }
}
