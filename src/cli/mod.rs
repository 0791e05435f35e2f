//! CLI module for the songplay binary

pub mod commands;
pub mod error;
pub mod output;

pub use error::CliError;
