//! Small shared helpers: `key = value` file parsing and directory locations.

pub mod config;
pub mod paths;

pub use paths::{config_dir, logs_dir, settings_path};
