//! Schema definitions for the songplay star schema

/// Schema for the songplay tables
pub struct SongplaySchema;

impl SongplaySchema {
    /// Get the DDL for creating all tables (DuckDB syntax)
    #[cfg(feature = "duckdb-backend")]
    pub fn create_tables_duckdb() -> &'static str {
        r#"
-- Surrogate key for the fact table
CREATE SEQUENCE IF NOT EXISTS songplays_id_seq START 1;

-- Fact table
CREATE TABLE IF NOT EXISTS songplays (
    songplay_id BIGINT PRIMARY KEY DEFAULT nextval('songplays_id_seq'),
    start_time TIMESTAMP NOT NULL,
    user_id BIGINT NOT NULL,
    level VARCHAR,
    song_id VARCHAR,
    artist_id VARCHAR,
    session_id BIGINT,
    location VARCHAR,
    user_agent VARCHAR,
    UNIQUE (start_time, user_id, song_id)
);

-- Dimension tables
CREATE TABLE IF NOT EXISTS users (
    user_id BIGINT PRIMARY KEY,
    first_name VARCHAR,
    last_name VARCHAR,
    gender VARCHAR,
    level VARCHAR
);

CREATE TABLE IF NOT EXISTS songs (
    song_id VARCHAR PRIMARY KEY,
    title VARCHAR,
    artist_id VARCHAR,
    year INTEGER,
    duration DOUBLE
);

CREATE TABLE IF NOT EXISTS artists (
    artist_id VARCHAR PRIMARY KEY,
    name VARCHAR,
    location VARCHAR,
    latitude DOUBLE,
    longitude DOUBLE
);

CREATE TABLE IF NOT EXISTS "time" (
    start_time TIMESTAMP PRIMARY KEY,
    hour INTEGER,
    day INTEGER,
    week INTEGER,
    month INTEGER,
    year INTEGER,
    weekday INTEGER
);

-- Lookup index for the song/artist resolver
CREATE INDEX IF NOT EXISTS idx_songs_title ON songs(title);
"#
    }

    /// Get the DDL for dropping all tables (DuckDB syntax)
    #[cfg(feature = "duckdb-backend")]
    pub fn drop_tables_duckdb() -> &'static str {
        r#"
DROP TABLE IF EXISTS songplays;
DROP TABLE IF EXISTS users;
DROP TABLE IF EXISTS songs;
DROP TABLE IF EXISTS artists;
DROP TABLE IF EXISTS "time";
DROP SEQUENCE IF EXISTS songplays_id_seq;
"#
    }

    /// Get the DDL for creating all tables (PostgreSQL syntax)
    #[cfg(feature = "postgres-backend")]
    pub fn create_tables_postgres() -> &'static str {
        r#"
-- Fact table
CREATE TABLE IF NOT EXISTS songplays (
    songplay_id BIGSERIAL PRIMARY KEY,
    start_time TIMESTAMP NOT NULL,
    user_id BIGINT NOT NULL,
    level VARCHAR,
    song_id VARCHAR,
    artist_id VARCHAR,
    session_id BIGINT,
    location VARCHAR,
    user_agent VARCHAR,
    UNIQUE (start_time, user_id, song_id)
);

-- Dimension tables
CREATE TABLE IF NOT EXISTS users (
    user_id BIGINT PRIMARY KEY,
    first_name VARCHAR,
    last_name VARCHAR,
    gender VARCHAR,
    level VARCHAR
);

CREATE TABLE IF NOT EXISTS songs (
    song_id VARCHAR PRIMARY KEY,
    title VARCHAR,
    artist_id VARCHAR,
    year INTEGER,
    duration DOUBLE PRECISION
);

CREATE TABLE IF NOT EXISTS artists (
    artist_id VARCHAR PRIMARY KEY,
    name VARCHAR,
    location VARCHAR,
    latitude DOUBLE PRECISION,
    longitude DOUBLE PRECISION
);

CREATE TABLE IF NOT EXISTS "time" (
    start_time TIMESTAMP PRIMARY KEY,
    hour INTEGER,
    day INTEGER,
    week INTEGER,
    month INTEGER,
    year INTEGER,
    weekday INTEGER
);

-- Lookup index for the song/artist resolver
CREATE INDEX IF NOT EXISTS idx_songs_title ON songs(title);
"#
    }

    /// Get the DDL for dropping all tables (PostgreSQL syntax)
    #[cfg(feature = "postgres-backend")]
    pub fn drop_tables_postgres() -> &'static str {
        r#"
DROP TABLE IF EXISTS songplays;
DROP TABLE IF EXISTS users;
DROP TABLE IF EXISTS songs;
DROP TABLE IF EXISTS artists;
DROP TABLE IF EXISTS "time";
"#
    }
}

/// Build the `VALUES` list of a multi-row insert
///
/// `row` renders one parenthesised tuple given the 1-based index of its first
/// parameter; parameters are numbered consecutively, `columns` per row.
pub fn values_list<F>(rows: usize, columns: usize, row: F) -> String
where
    F: Fn(usize) -> String,
{
    (0..rows)
        .map(|i| row(i * columns + 1))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_list_numbers_parameters() {
        let sql = values_list(2, 3, |p| format!("(${}, ${}, ${})", p, p + 1, p + 2));
        assert_eq!(sql, "($1, $2, $3), ($4, $5, $6)");
    }

    #[cfg(feature = "duckdb-backend")]
    #[test]
    fn test_duckdb_schema_contains_tables() {
        let ddl = SongplaySchema::create_tables_duckdb();
        for table in ["songplays", "users", "songs", "artists"] {
            assert!(ddl.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")));
        }
        assert!(ddl.contains(r#"CREATE TABLE IF NOT EXISTS "time""#));
        assert!(ddl.contains("UNIQUE (start_time, user_id, song_id)"));
    }
}
