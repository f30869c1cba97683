//! Command-line actions run against the localization service.

use std::path::PathBuf;
use std::sync::Arc;

use loctable::i18n::{
    CancelToken, ConfigError, I18nConfig, IdError, LocaleId, LocalePersistence,
    LocalizationError, LocalizationService, MemoryLocaleStore, SettingsFileStore, TextArgs,
    find_config_file, find_locales_dir, text_args,
};
use thiserror::Error;

use crate::args::Args;

/// Table holding the CLI's own messages.
const CLI_TABLE: &str = "Cli";

/// Failures that end the CLI with a non-zero exit code.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be read.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A locale, table or key given on the command line or in config was blank.
    #[error(transparent)]
    Id(#[from] IdError),
    /// The service failed to initialize or switch.
    #[error(transparent)]
    Localization(#[from] LocalizationError),
    /// No locales directory was given or found.
    #[error("no locales directory found; pass --locales-dir or set locales_dir in i18n.yml")]
    NoLocalesDir,
}

/// What: Load `i18n.yml` from `--config` or the standard locations.
///
/// Output:
/// - Parsed config, or defaults when no file exists
///
/// # Errors
/// - Returns `Err` when an existing file cannot be read or parsed
fn load_config(args: &Args) -> Result<I18nConfig, CliError> {
    let Some(path) = args.config.clone().or_else(|| find_config_file("i18n.yml")) else {
        tracing::debug!("i18n.yml not found, using defaults");
        return Ok(I18nConfig::default());
    };
    tracing::debug!(path = %path.display(), "Loading i18n config");
    Ok(I18nConfig::load(&path)?)
}

fn locales_dir(args: &Args, config: &I18nConfig) -> Result<PathBuf, CliError> {
    args.locales_dir
        .clone()
        .or_else(|| config.locales_dir.clone())
        .or_else(find_locales_dir)
        .ok_or(CliError::NoLocalesDir)
}

/// What: Build the service described by the arguments.
///
/// Details:
/// - `--locale` swaps persistence for an in-memory store seeded with that
///   locale, so it wins initialization without being remembered
fn build_service(args: &Args) -> Result<LocalizationService, CliError> {
    let config = load_config(args)?;
    let dir = locales_dir(args, &config)?;
    let persistence: Arc<dyn LocalePersistence> = match &args.locale {
        Some(locale) => Arc::new(MemoryLocaleStore::with_saved(locale.as_str())),
        None => Arc::new(
            args.settings
                .clone()
                .map_or_else(SettingsFileStore::default_location, SettingsFileStore::new),
        ),
    };
    Ok(LocalizationService::from_config(&config, dir, persistence)?)
}

/// What: Run the action selected on the command line.
///
/// Inputs:
/// - `args`: Parsed command-line arguments
///
/// Output:
/// - `Ok(())` after printing the result to stdout
///
/// # Errors
/// - Returns `Err` when config, initialization or the switch fails
pub async fn run(args: &Args) -> Result<(), CliError> {
    let service = build_service(args)?;
    let cancel = CancelToken::never();
    let initial = service.initialize(&cancel).await?;
    tracing::info!(locale = %initial, "Localization ready");

    if let Some(raw) = &args.set_locale {
        let locale = LocaleId::new(raw.as_str())?;
        service.set_locale(&locale, &cancel).await?;
        let msg_args = text_args([("locale", locale.as_str())]);
        println!("{}", service.resolve(CLI_TABLE, "SetLocale.Done", Some(&msg_args)));
    }

    if args.list_locales {
        list_locales(&service);
    }

    if let [table, key] = args.resolve.as_slice() {
        let msg_args: TextArgs = args.args.iter().cloned().collect();
        println!("{}", service.resolve(table, key, Some(&msg_args)));
    }

    if args.set_locale.is_none() && !args.list_locales && args.resolve.is_empty() {
        let msg_args = text_args([("locale", initial.as_str())]);
        println!("{}", service.resolve(CLI_TABLE, "Status.Current", Some(&msg_args)));
    }

    service.dispose();
    Ok(())
}

fn list_locales(service: &LocalizationService) {
    let current = service.current_locale();
    println!("{}", service.resolve(CLI_TABLE, "Locales.Header", None));
    for locale in service.supported_locales() {
        let marker = if current.as_ref() == Some(&locale) { '*' } else { ' ' };
        println!("{marker} {locale}");
    }
}
