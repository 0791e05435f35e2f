//! Raw input records as they appear in the song and log files

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::rows::{ArtistRow, SongRow};

/// Page tag of the events that feed the songplay tables
pub const NEXT_SONG_PAGE: &str = "NextSong";

/// One line of a user-activity log file
///
/// Keys the pipeline does not use (`auth`, `itemInSession`, `length`, `method`,
/// `registration`, `status`, ...) are accepted and ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    #[serde(default)]
    pub page: Option<String>,
    /// Event instant in epoch milliseconds
    #[serde(default, deserialize_with = "lenient_i64")]
    pub ts: Option<i64>,
    /// Numeric id, or a numeric string; empty for logged-out events
    #[serde(default, deserialize_with = "lenient_i64")]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    /// Song title
    #[serde(default)]
    pub song: Option<String>,
    /// Artist name
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub session_id: Option<i64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl ActivityEvent {
    /// Whether this event feeds the songplay tables
    pub fn is_eligible(&self) -> bool {
        self.page.as_deref() == Some(NEXT_SONG_PAGE)
    }
}

/// One record of a song metadata file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongRecord {
    #[serde(default)]
    pub num_songs: Option<i64>,
    pub song_id: String,
    pub title: String,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub year: Option<i32>,
    #[serde(default)]
    pub duration: Option<f64>,
    pub artist_id: String,
    pub artist_name: String,
    #[serde(default)]
    pub artist_location: Option<String>,
    #[serde(default)]
    pub artist_latitude: Option<f64>,
    #[serde(default)]
    pub artist_longitude: Option<f64>,
}

impl SongRecord {
    /// The `songs` row carried by this record
    pub fn song_row(&self) -> SongRow {
        SongRow {
            song_id: self.song_id.clone(),
            title: self.title.clone(),
            artist_id: self.artist_id.clone(),
            year: self.year,
            duration: self.duration,
        }
    }

    /// The `artists` row carried by this record
    pub fn artist_row(&self) -> ArtistRow {
        ArtistRow {
            artist_id: self.artist_id.clone(),
            name: self.artist_name.clone(),
            location: self.artist_location.clone(),
            latitude: self.artist_latitude,
            longitude: self.artist_longitude,
        }
    }
}

/// Accept an integer, an integral float, or a numeric string. `null` and the
/// empty string map to `None`.
fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Ok(Some(i));
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Ok(Some(f as i64)),
                _ => Err(D::Error::custom(format!("expected an integer, found {n}"))),
            }
        }
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<i64>()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("expected an integer, found {s:?}")))
        }
        Some(other) => Err(D::Error::custom(format!(
            "expected an integer, found {other}"
        ))),
    }
}

fn lenient_i32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    match lenient_i64(deserializer)? {
        None => Ok(None),
        Some(v) => i32::try_from(v)
            .map(Some)
            .map_err(|_| D::Error::custom(format!("integer {v} out of range"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEXT_SONG: &str = r#"{"artist":"Des'ree","auth":"Logged In","firstName":"Kaylee","gender":"F","itemInSession":1,"lastName":"Summers","length":246.30812,"level":"free","location":"Phoenix-Mesa-Scottsdale, AZ","method":"PUT","page":"NextSong","registration":1540344794796.0,"sessionId":139,"song":"You Gotta Be","status":200,"ts":1541106106796,"userAgent":"Mozilla/5.0","userId":"8"}"#;

    #[test]
    fn test_parse_next_song_event() {
        let event: ActivityEvent = serde_json::from_str(NEXT_SONG).unwrap();
        assert!(event.is_eligible());
        assert_eq!(event.ts, Some(1541106106796));
        assert_eq!(event.user_id, Some(8));
        assert_eq!(event.session_id, Some(139));
        assert_eq!(event.song.as_deref(), Some("You Gotta Be"));
        assert_eq!(event.artist.as_deref(), Some("Des'ree"));
        assert_eq!(event.user_agent.as_deref(), Some("Mozilla/5.0"));
    }

    #[test]
    fn test_logged_out_event_has_no_user() {
        let event: ActivityEvent = serde_json::from_str(
            r#"{"auth":"Logged Out","page":"Home","ts":1541105830796,"userId":"","sessionId":52}"#,
        )
        .unwrap();
        assert!(!event.is_eligible());
        assert_eq!(event.user_id, None);
        assert_eq!(event.first_name, None);
    }

    #[test]
    fn test_integral_float_timestamp_is_accepted() {
        let event: ActivityEvent =
            serde_json::from_str(r#"{"page":"NextSong","ts":1541106106796.0,"userId":8}"#)
                .unwrap();
        assert_eq!(event.ts, Some(1541106106796));
        assert_eq!(event.user_id, Some(8));
    }

    #[test]
    fn test_non_numeric_timestamp_is_rejected() {
        let result =
            serde_json::from_str::<ActivityEvent>(r#"{"page":"NextSong","ts":"yesterday"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_song_record() {
        let record: SongRecord = serde_json::from_str(
            r#"{"num_songs": 1, "artist_id": "ARD7TVE1187B99BFB1", "artist_latitude": null, "artist_longitude": null, "artist_location": "California - LA", "artist_name": "Casual", "song_id": "SOMZWCG12A8C13C480", "title": "I Didn't Mean To", "duration": 218.93179, "year": 0}"#,
        )
        .unwrap();

        let song = record.song_row();
        assert_eq!(song.song_id, "SOMZWCG12A8C13C480");
        assert_eq!(song.artist_id, "ARD7TVE1187B99BFB1");
        assert_eq!(song.year, Some(0));

        let artist = record.artist_row();
        assert_eq!(artist.name, "Casual");
        assert_eq!(artist.location.as_deref(), Some("California - LA"));
        assert_eq!(artist.latitude, None);
    }
}
