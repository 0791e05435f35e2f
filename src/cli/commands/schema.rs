//! `init` and `reset` commands

use songplay_core::store::{Store, StoreTarget, open_store};

use crate::cli::error::CliError;
use crate::cli::output::format_table_counts;

/// Arguments for the `init` command
pub struct InitArgs {
    /// Database to create the tables in
    pub database: StoreTarget,
}

/// Arguments for the `reset` command
pub struct ResetArgs {
    /// Database to reset
    pub database: StoreTarget,
}

/// Handle the `init` command
pub fn handle_init(args: &InitArgs) -> Result<(), CliError> {
    let mut store = open_store(&args.database)?;
    store.create_tables()?;

    println!("Tables ready in: {}", args.database.display());
    print!("{}", format_table_counts(&store.table_counts()?));

    Ok(())
}

/// Handle the `reset` command: drop every table and create it again, empty
pub fn handle_reset(args: &ResetArgs) -> Result<(), CliError> {
    let mut store = open_store(&args.database)?;
    store.drop_tables()?;
    store.create_tables()?;

    println!("Tables dropped and recreated in: {}", args.database.display());

    Ok(())
}
