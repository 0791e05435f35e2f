//! `stats` command

use songplay_core::store::{Store, StoreTarget, open_store};

use crate::cli::error::CliError;
use crate::cli::output::{format_table_counts, to_json};

/// Arguments for the `stats` command
pub struct StatsArgs {
    /// Database to inspect
    pub database: StoreTarget,
    /// Print JSON instead of text
    pub json: bool,
}

/// Handle the `stats` command
pub fn handle_stats(args: &StatsArgs) -> Result<(), CliError> {
    let store = open_store(&args.database)?;
    let counts = store.table_counts()?;

    if args.json {
        println!("{}", to_json(&counts)?);
    } else {
        println!("Database: {} ({})", args.database.display(), store.backend());
        print!("{}", format_table_counts(&counts));
    }

    Ok(())
}
