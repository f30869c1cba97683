//! Command-line argument parsing and handling.

pub mod commands;
pub mod definition;

pub use commands::{CliError, run};
pub use definition::{Args, determine_log_level};
