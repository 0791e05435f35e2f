//! songplay - load song and activity-log files into a songplay star schema

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use songplay_etl::cli::CliError;
use songplay_etl::cli::commands::run::{RunArgs, handle_run};
use songplay_etl::cli::commands::schema::{InitArgs, ResetArgs, handle_init, handle_reset};
use songplay_etl::cli::commands::stats::{StatsArgs, handle_stats};
use songplay_etl::cli::commands::load_config;
use songplay_etl::etl::{FileErrorPolicy, LoadMode};
use songplay_etl::store::StoreTarget;

#[derive(Parser, Debug)]
#[command(name = "songplay")]
#[command(version)]
#[command(about = "Load song metadata and user-activity logs into a songplay star schema", long_about = None)]
struct Cli {
    /// Config file (TOML)
    #[arg(long, short = 'c', global = true, env = "SONGPLAY_CONFIG")]
    config: Option<PathBuf>,

    /// Database: DuckDB file path, `:memory:`, or a PostgreSQL connection string
    #[arg(long, short = 'd', global = true, env = "SONGPLAY_DATABASE")]
    database: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the songplays, users, songs, artists and time tables
    Init,

    /// Drop every table and create it again, empty
    Reset {
        /// Confirm dropping existing data
        #[arg(long)]
        yes: bool,
    },

    /// Load song_data then log_data
    Run {
        /// Song metadata root
        #[arg(long)]
        song_data: Option<PathBuf>,

        /// Activity log root
        #[arg(long)]
        log_data: Option<PathBuf>,

        /// File pattern below each root
        #[arg(long)]
        pattern: Option<String>,

        /// Dimension write strategy (per-row, batched)
        #[arg(long, short = 'm')]
        mode: Option<LoadMode>,

        /// Rows per statement in batched mode
        #[arg(long)]
        page_size: Option<usize>,

        /// What to do with a file that fails (skip, abort)
        #[arg(long)]
        on_file_error: Option<FileErrorPolicy>,

        /// Do not draw progress bars
        #[arg(long)]
        no_progress: bool,

        /// Fail instead of creating missing tables
        #[arg(long)]
        no_create_tables: bool,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show row counts per table
    Stats {
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let database = cli
        .database
        .as_deref()
        .map(StoreTarget::parse)
        .unwrap_or_else(|| config.database.clone());

    match cli.command {
        Commands::Init => handle_init(&InitArgs { database })?,
        Commands::Reset { yes } => {
            if !yes {
                return Err(CliError::InvalidArgument(
                    "reset drops all loaded data, pass --yes to confirm".to_string(),
                )
                .into());
            }
            handle_reset(&ResetArgs { database })?
        }
        Commands::Run {
            song_data,
            log_data,
            pattern,
            mode,
            page_size,
            on_file_error,
            no_progress,
            no_create_tables,
            json,
        } => {
            let progress = !no_progress && (config.progress || std::io::stderr().is_terminal());
            let args = RunArgs {
                song_data,
                log_data,
                pattern,
                database: Some(database),
                mode,
                page_size,
                on_file_error,
                progress: Some(progress),
                no_create_tables,
                json,
            };
            handle_run(config, &args)?
        }
        Commands::Stats { json } => handle_stats(&StatsArgs { database, json })?,
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli) {
        match err.downcast_ref::<CliError>() {
            Some(cli_err) => {
                eprintln!("Error: {}", cli_err.user_message());
                process::exit(cli_err.exit_code());
            }
            None => {
                eprintln!("Error: {:#}", err);
                process::exit(1);
            }
        }
    }
}
