//! PostgreSQL store implementation
//!
//! `tokio-postgres` is driven from a private current-thread runtime so the
//! store keeps the same blocking interface as the embedded backends.

use tokio::runtime::{Builder, Runtime};
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Row};

use super::schema::{SongplaySchema, values_list};
use super::{Store, StoreError, TableCounts, TableSnapshot};
use crate::models::{ArtistRow, SongMatch, SongRow, SongplayFact, TimeRow, UserRow};

/// Epoch milliseconds parameter `$n` as a `TIMESTAMP`
fn ts_param(p: usize) -> String {
    format!("(TIMESTAMP 'epoch' + ${p}::bigint * INTERVAL '1 millisecond')")
}

/// `TIMESTAMP` column back to epoch milliseconds
const TS_MILLIS: &str = "(EXTRACT(EPOCH FROM start_time) * 1000)::bigint";

const INSERT_SONG: &str = "INSERT INTO songs (song_id, title, artist_id, year, duration)
     VALUES ($1::varchar, $2::varchar, $3::varchar, $4::integer, $5::double precision)
     ON CONFLICT (song_id) DO NOTHING";

const INSERT_ARTIST: &str = "INSERT INTO artists (artist_id, name, location, latitude, longitude)
     VALUES ($1::varchar, $2::varchar, $3::varchar, $4::double precision, $5::double precision)
     ON CONFLICT (artist_id) DO NOTHING";

const SELECT_SONG: &str = "SELECT s.song_id, s.artist_id
     FROM songs s
     JOIN artists a ON s.artist_id = a.artist_id
     WHERE s.title = $1::varchar AND a.name = $2::varchar
     ORDER BY s.song_id COLLATE \"C\"
     LIMIT 1";

fn time_tuple(p: usize) -> String {
    format!(
        "({}, ${}::integer, ${}::integer, ${}::integer, ${}::integer, ${}::integer, ${}::integer)",
        ts_param(p),
        p + 1,
        p + 2,
        p + 3,
        p + 4,
        p + 5,
        p + 6
    )
}

fn user_tuple(p: usize) -> String {
    format!(
        "(${}::bigint, ${}::varchar, ${}::varchar, ${}::varchar, ${}::varchar)",
        p,
        p + 1,
        p + 2,
        p + 3,
        p + 4
    )
}

fn db_err(err: tokio_postgres::Error) -> StoreError {
    StoreError::Database(err.to_string())
}

/// Store backed by a PostgreSQL server
pub struct PostgresStore {
    runtime: Runtime,
    client: Client,
    in_transaction: bool,
}

impl PostgresStore {
    /// Connect to a PostgreSQL database
    pub fn connect(connection_string: &str) -> Result<Self, StoreError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let (client, connection) = runtime
            .block_on(tokio_postgres::connect(connection_string, NoTls))
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        // Polled whenever the runtime is driven by a client call
        runtime.spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "PostgreSQL connection error");
            }
        });

        Ok(Self {
            runtime,
            client,
            in_transaction: false,
        })
    }

    fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64, StoreError> {
        self.runtime
            .block_on(self.client.execute(sql, params))
            .map_err(db_err)
    }

    fn batch_execute(&self, sql: &str) -> Result<(), StoreError> {
        self.runtime
            .block_on(self.client.batch_execute(sql))
            .map_err(db_err)
    }

    fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>, StoreError> {
        self.runtime
            .block_on(self.client.query(sql, params))
            .map_err(db_err)
    }

    fn count(&self, table: &str) -> Result<i64, StoreError> {
        let rows = self.query(&format!("SELECT COUNT(*) FROM {table}"), &[])?;
        rows.first()
            .map(|row| row.try_get::<_, i64>(0).map_err(db_err))
            .unwrap_or(Ok(0))
    }
}

impl Store for PostgresStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    fn create_tables(&mut self) -> Result<(), StoreError> {
        self.batch_execute(SongplaySchema::create_tables_postgres())
    }

    fn drop_tables(&mut self) -> Result<(), StoreError> {
        self.batch_execute(SongplaySchema::drop_tables_postgres())
    }

    fn begin(&mut self) -> Result<(), StoreError> {
        if self.in_transaction {
            return Err(StoreError::TransactionActive);
        }
        self.batch_execute("BEGIN")?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if !self.in_transaction {
            return Err(StoreError::NoTransaction);
        }
        self.in_transaction = false;
        self.batch_execute("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        if !self.in_transaction {
            return Err(StoreError::NoTransaction);
        }
        self.in_transaction = false;
        self.batch_execute("ROLLBACK")
    }

    fn upsert_song(&mut self, song: &SongRow) -> Result<(), StoreError> {
        self.execute(
            INSERT_SONG,
            &[
                &song.song_id,
                &song.title,
                &song.artist_id,
                &song.year,
                &song.duration,
            ],
        )?;
        Ok(())
    }

    fn upsert_artist(&mut self, artist: &ArtistRow) -> Result<(), StoreError> {
        self.execute(
            INSERT_ARTIST,
            &[
                &artist.artist_id,
                &artist.name,
                &artist.location,
                &artist.latitude,
                &artist.longitude,
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
            let params: Vec<&(dyn ToSql + Sync)> = page
                .iter()
                .flat_map(|r| {
                    [
                        &r.start_time as &(dyn ToSql + Sync),
                        &r.hour,
                        &r.day,
                        &r.week,
                        &r.month,
                        &r.year,
                        &r.weekday,
                    ]
                })
                .collect();
            self.execute(&sql, &params)?;
        }
        Ok(())
    }

    fn upsert_user(&mut self, row: &UserRow) -> Result<(), StoreError> {
        self.upsert_users(std::slice::from_ref(row), 1)
    }

    fn upsert_users(&mut self, rows: &[UserRow], page_size: usize) -> Result<(), StoreError> {
        // ON CONFLICT DO UPDATE cannot touch the same row twice in one statement
        let rows = UserRow::collapse(rows);

        for page in rows.chunks(page_size.max(1)) {
            let sql = format!(
                "INSERT INTO users (user_id, first_name, last_name, gender, level)
                 VALUES {}
                 ON CONFLICT (user_id) DO UPDATE SET level = excluded.level",
                values_list(page.len(), 5, user_tuple)
            );
            let params: Vec<&(dyn ToSql + Sync)> = page
                .iter()
                .flat_map(|r| {
                    [
                        &r.user_id as &(dyn ToSql + Sync),
                        &r.first_name,
                        &r.last_name,
                        &r.gender,
                        &r.level,
                    ]
                })
                .collect();
            self.execute(&sql, &params)?;
        }
        Ok(())
    }

    fn insert_songplay(&mut self, fact: &SongplayFact) -> Result<bool, StoreError> {
        let sql = format!(
            "INSERT INTO songplays
             (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)
             SELECT {ts}, $2::bigint, $3::varchar, $4::varchar, $5::varchar,
                    $6::bigint, $7::varchar, $8::varchar
             WHERE NOT EXISTS (
                 SELECT 1 FROM songplays
                 WHERE start_time = {ts}
                   AND user_id = $2::bigint
                   AND song_id IS NOT DISTINCT FROM $4::varchar
             )
             ON CONFLICT (start_time, user_id, song_id) DO NOTHING",
            ts = ts_param(1)
        );
        let inserted = self.execute(
            &sql,
            &[
                &fact.start_time,
                &fact.user_id,
                &fact.level,
                &fact.song_id,
                &fact.artist_id,
                &fact.session_id,
                &fact.location,
                &fact.user_agent,
            ],
        )?;
        Ok(inserted > 0)
    }

    fn find_song(&self, title: &str, artist_name: &str) -> Result<Option<SongMatch>, StoreError> {
        let rows = self.query(SELECT_SONG, &[&title, &artist_name])?;
        rows.first()
            .map(|row| {
                Ok(SongMatch {
                    song_id: row.try_get(0).map_err(db_err)?,
                    artist_id: row.try_get(1).map_err(db_err)?,
                })
            })
            .transpose()
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

        let sql = format!(
            "SELECT {TS_MILLIS}, hour, day, week, month, year, weekday
             FROM \"time\" ORDER BY start_time"
        );
        for row in self.query(&sql, &[])? {
            snapshot.time.push(TimeRow {
                start_time: row.try_get(0).map_err(db_err)?,
                hour: row.try_get(1).map_err(db_err)?,
                day: row.try_get(2).map_err(db_err)?,
                week: row.try_get(3).map_err(db_err)?,
                month: row.try_get(4).map_err(db_err)?,
                year: row.try_get(5).map_err(db_err)?,
                weekday: row.try_get(6).map_err(db_err)?,
            });
        }

        let sql = "SELECT user_id, first_name, last_name, gender, level FROM users ORDER BY user_id";
        for row in self.query(sql, &[])? {
            snapshot.users.push(UserRow {
                user_id: row.try_get(0).map_err(db_err)?,
                first_name: row.try_get(1).map_err(db_err)?,
                last_name: row.try_get(2).map_err(db_err)?,
                gender: row.try_get(3).map_err(db_err)?,
                level: row.try_get(4).map_err(db_err)?,
            });
        }

        let sql = format!(
            "SELECT {TS_MILLIS}, user_id, level, song_id, artist_id,
                    session_id, location, user_agent
             FROM songplays
             ORDER BY start_time, user_id, song_id COLLATE \"C\" NULLS FIRST"
        );
        for row in self.query(&sql, &[])? {
            snapshot.songplays.push(SongplayFact {
                start_time: row.try_get(0).map_err(db_err)?,
                user_id: row.try_get(1).map_err(db_err)?,
                level: row.try_get(2).map_err(db_err)?,
                song_id: row.try_get(3).map_err(db_err)?,
                artist_id: row.try_get(4).map_err(db_err)?,
                session_id: row.try_get(5).map_err(db_err)?,
                location: row.try_get(6).map_err(db_err)?,
                user_agent: row.try_get(7).map_err(db_err)?,
            });
        }

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ts_param_converts_epoch_millis() {
        assert_eq!(
            ts_param(3),
            "(TIMESTAMP 'epoch' + $3::bigint * INTERVAL '1 millisecond')"
        );
    }

    #[test]
    fn test_time_tuples_number_seven_params_per_row() {
        let sql = values_list(2, 7, time_tuple);
        assert_eq!(
            sql,
            "((TIMESTAMP 'epoch' + $1::bigint * INTERVAL '1 millisecond'), \
             $2::integer, $3::integer, $4::integer, $5::integer, $6::integer, $7::integer), \
             ((TIMESTAMP 'epoch' + $8::bigint * INTERVAL '1 millisecond'), \
             $9::integer, $10::integer, $11::integer, $12::integer, $13::integer, $14::integer)"
        );
    }

    #[test]
    fn test_user_tuples_number_five_params_per_row() {
        let sql = values_list(3, 5, user_tuple);
        assert_eq!(
            sql,
            "($1::bigint, $2::varchar, $3::varchar, $4::varchar, $5::varchar), \
             ($6::bigint, $7::varchar, $8::varchar, $9::varchar, $10::varchar), \
             ($11::bigint, $12::varchar, $13::varchar, $14::varchar, $15::varchar)"
        );
    }

    #[test]
    fn test_song_lookup_orders_by_byte_collation() {
        assert!(SELECT_SONG.contains("ORDER BY s.song_id COLLATE \"C\""));
        assert!(SELECT_SONG.ends_with("LIMIT 1"));
    }

    #[test]
    fn test_connect_to_unreachable_server_fails() {
        let result = PostgresStore::connect("host=127.0.0.1 port=1 user=nobody connect_timeout=1");
        assert!(matches!(result, Err(StoreError::Connection(_))));
    }
}
