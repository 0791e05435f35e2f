//! Song/artist resolution against the reference tables

use crate::models::SongMatch;
use crate::store::{Store, StoreError};

/// Outcome of looking up an event's song
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(SongMatch),
    Unresolved,
}

impl Resolution {
    /// Split into the `(song_id, artist_id)` columns of a songplay
    pub fn into_ids(self) -> (Option<String>, Option<String>) {
        match self {
            Resolution::Resolved(m) => (Some(m.song_id), Some(m.artist_id)),
            Resolution::Unresolved => (None, None),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

/// Resolve a `(title, artist name)` pair to its song and artist ids
///
/// An event without a title or artist cannot match and is `Unresolved`
/// without touching the store.
pub fn resolve<S: Store + ?Sized>(
    store: &S,
    title: Option<&str>,
    artist_name: Option<&str>,
) -> Result<Resolution, StoreError> {
    let (Some(title), Some(artist_name)) = (title, artist_name) else {
        return Ok(Resolution::Unresolved);
    };

    Ok(match store.find_song(title, artist_name)? {
        Some(found) => Resolution::Resolved(found),
        None => Resolution::Unresolved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArtistRow, SongRow};
    use crate::store::MemoryStore;

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.create_tables().unwrap();
        store
            .upsert_artist(&ArtistRow {
                artist_id: "AR5KOSW1187FB35FF4".to_string(),
                name: "Elena".to_string(),
                location: Some("Dubai UAE".to_string()),
                latitude: Some(49.80388),
                longitude: Some(15.47491),
            })
            .unwrap();
        store
            .upsert_song(&SongRow {
                song_id: "SOZCTXZ12AB0182364".to_string(),
                title: "Setanta matins".to_string(),
                artist_id: "AR5KOSW1187FB35FF4".to_string(),
                year: Some(0),
                duration: Some(269.58322),
            })
            .unwrap();
        store
    }

    #[test]
    fn test_resolved() {
        let store = store();
        let resolution = resolve(&store, Some("Setanta matins"), Some("Elena")).unwrap();
        assert_eq!(
            resolution.into_ids(),
            (
                Some("SOZCTXZ12AB0182364".to_string()),
                Some("AR5KOSW1187FB35FF4".to_string())
            )
        );
    }

    #[test]
    fn test_unresolved_is_not_an_error() {
        let store = store();
        let resolution = resolve(&store, Some("Unknown"), Some("Elena")).unwrap();
        assert_eq!(resolution, Resolution::Unresolved);
        assert_eq!(resolution.into_ids(), (None, None));
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let store = store();
        let resolution = resolve(&store, Some("setanta matins"), Some("Elena")).unwrap();
        assert!(!resolution.is_resolved());
    }

    #[test]
    fn test_missing_title_skips_lookup() {
        // No tables: any lookup would fail.
        let store = MemoryStore::new();
        assert_eq!(
            resolve(&store, None, Some("Elena")).unwrap(),
            Resolution::Unresolved
        );
    }
}
