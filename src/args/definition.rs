//! Command-line argument definition.

use std::path::PathBuf;

use clap::Parser;

/// loctable - resolve localized text tables from the command line
#[derive(Parser, Debug)]
#[command(name = "loctable")]
#[command(version)]
#[command(about = "Resolve localized text tables from the command line", long_about = None)]
pub struct Args {
    /// Path to i18n.yml (default: bundled or installed config)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding <locale>/<table>.json (overrides the config)
    #[arg(long)]
    pub locales_dir: Option<PathBuf>,

    /// Settings file that remembers the selected locale (default: ~/.config/loctable/settings.conf)
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Set the logging level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Enable verbose output (equivalent to --log-level debug)
    #[arg(short, long)]
    pub verbose: bool,

    /// List supported locales, marking the active one
    #[arg(short = 'l', long)]
    pub list_locales: bool,

    /// Resolve one key (e.g., loctable --resolve UI Greeting)
    #[arg(short = 'r', long, num_args = 2, value_names = ["TABLE", "KEY"])]
    pub resolve: Vec<String>,

    /// Named argument for --resolve, repeatable (e.g., --arg name=Alice)
    #[arg(short = 'a', long = "arg", value_parser = parse_key_value)]
    pub args: Vec<(String, String)>,

    /// Resolve in this locale without remembering it (use with --resolve)
    #[arg(long)]
    pub locale: Option<String>,

    /// Switch to and remember a locale
    #[arg(short = 's', long)]
    pub set_locale: Option<String>,
}

/// What: Parse a `key=value` pair for `--arg`.
///
/// Inputs:
/// - `raw`: Argument text as typed
///
/// Output:
/// - Trimmed `(key, value)`; the value may be empty
///
/// # Errors
/// - Returns `Err` when there is no `=` or the key is blank
fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{raw}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// What: Determine the log level based on command-line arguments.
///
/// Inputs:
/// - `args`: Parsed command-line arguments
///
/// Output:
/// - Log level directive (trace, debug, info, warn, error)
///
/// Details:
/// - Verbose flag overrides `--log-level`
#[must_use]
pub fn determine_log_level(args: &Args) -> String {
    if args.verbose {
        "debug".to_string()
    } else {
        args.log_level.clone()
    }
}
