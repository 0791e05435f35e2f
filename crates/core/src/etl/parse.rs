//! Newline-delimited JSON readers for the song and log files

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::de::DeserializeOwned;

use super::error::EtlError;
use crate::models::{ActivityEvent, SongRecord};

/// A typed record read from an input file
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord<T> {
    /// Line index within the file (0-based)
    pub index: usize,
    pub record: T,
}

/// Read every non-blank line of `path` as one `T`
///
/// The first malformed line fails the whole file.
pub fn parse_ndjson_file<T: DeserializeOwned>(
    path: &Path,
) -> Result<Vec<ParsedRecord<T>>, EtlError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let record = serde_json::from_str::<T>(trimmed).map_err(|e| EtlError::Parse {
            path: path.to_path_buf(),
            line: index + 1,
            reason: e.to_string(),
        })?;

        records.push(ParsedRecord { index, record });
    }

    Ok(records)
}

/// Read a user-activity log file
pub fn parse_log_file(path: &Path) -> Result<Vec<ParsedRecord<ActivityEvent>>, EtlError> {
    parse_ndjson_file(path)
}

/// Read a song metadata file
pub fn parse_song_file(path: &Path) -> Result<Vec<ParsedRecord<SongRecord>>, EtlError> {
    parse_ndjson_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_parse_log_file_skips_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.json");
        let mut file = File::create(&path).unwrap();
        writeln!(file, r#"{{"page":"NextSong","ts":1541105830796,"userId":"39"}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"page":"Home","ts":1541106106796,"userId":""}}"#).unwrap();

        let records = parse_log_file(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].index, 0);
        assert_eq!(records[1].index, 2);
        assert_eq!(records[0].record.user_id, Some(39));
        assert_eq!(records[1].record.user_id, None);
    }

    #[test]
    fn test_parse_error_reports_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        let mut file = File::create(&path).unwrap();
        writeln!(file, r#"{{"page":"NextSong","ts":1}}"#).unwrap();
        writeln!(file, r#"{{"page":"NextSong","ts":"#).unwrap();

        match parse_log_file(&path) {
            Err(EtlError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_song_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("TRAAAAW128F429D538.json");
        std::fs::write(
            &path,
            r#"{"num_songs": 1, "artist_id": "ARD7TVE1187B99BFB1", "artist_latitude": null, "artist_longitude": null, "artist_location": "California - LA", "artist_name": "Casual", "song_id": "SOMZWCG12A8C13C480", "title": "I Didn't Mean To", "duration": 218.93179, "year": 0}"#,
        )
        .unwrap();

        let records = parse_song_file(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record.song_id, "SOMZWCG12A8C13C480");
        assert_eq!(records[0].record.artist_name, "Casual");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = parse_log_file(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(EtlError::Io(_))));
    }
}
