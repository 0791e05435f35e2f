//! Songplay Core - ETL library for the songplay star schema
//!
//! Provides:
//! - Typed song and activity-log records, and the rows they become
//! - The [`store::Store`] trait with in-memory, DuckDB and PostgreSQL backends
//! - Song/artist resolution, per-row and batched loaders
//! - Directory passes with per-file transactions and a run report

pub mod etl;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use etl::{
    EtlConfig, EtlError, EtlRunner, FileErrorPolicy, LoadMode, LoadStats, RunReport,
};
pub use models::{ActivityEvent, SongRecord, SongplayFact, TimeRow, UserRow};
#[cfg(feature = "duckdb-backend")]
pub use store::DuckDbStore;
#[cfg(feature = "postgres-backend")]
pub use store::PostgresStore;
pub use store::{MemoryStore, Store, StoreError, StoreTarget, open_store};
