//! Data model for the songplay pipeline
//!
//! - [`events`]: raw records read from the song and log files
//! - [`rows`]: rows of the `songplays`, `users`, `time`, `songs` and `artists` tables

pub mod events;
pub mod rows;

pub use events::{ActivityEvent, NEXT_SONG_PAGE, SongRecord};
pub use rows::{ArtistRow, SongMatch, SongRow, SongplayFact, SongplayKey, TimeRow, UserRow};
