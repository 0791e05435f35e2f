//! Songplay ETL - loads song metadata and user-activity logs into a
//! songplay star schema
//!
//! Re-exports [`songplay_core`] and, with the `cli` feature, the command
//! handlers behind the `songplay` binary.

pub use songplay_core::*;

#[cfg(feature = "cli")]
pub mod cli;
