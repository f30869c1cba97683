//! `i18n.yml` configuration and file discovery.
//!
//! ```yaml
//! default_locale: en-US
//! locales: [en-US, ru-RU]
//! startup_tables: [UI]
//! fallbacks:
//!   de-CH: de-DE
//! locales_dir: /usr/share/loctable/locales
//! detect_system_locale: false
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

/// Default locale when the config does not name one.
pub const DEFAULT_LOCALE: &str = "en-US";

/// Failure reading `i18n.yml`.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Config path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The YAML is malformed.
    #[error("failed to parse config: {0}")]
    Yaml(String),
}

/// Parsed `i18n.yml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct I18nConfig {
    /// Locale used when nothing is persisted or detected.
    pub default_locale: String,
    /// Supported locales in display order; discovered from `locales_dir` when empty.
    pub locales: Vec<String>,
    /// Tables that must load before a locale is installed.
    pub startup_tables: Vec<String>,
    /// Per-locale fallback overrides.
    pub fallbacks: HashMap<String, String>,
    /// Directory holding `<locale>/<table>.json` files.
    pub locales_dir: Option<PathBuf>,
    /// Whether startup considers `LC_ALL`/`LC_MESSAGES`/`LANG`.
    pub detect_system_locale: bool,
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            default_locale: DEFAULT_LOCALE.to_string(),
            locales: Vec::new(),
            startup_tables: Vec::new(),
            fallbacks: HashMap::new(),
            locales_dir: None,
            detect_system_locale: false,
        }
    }
}

impl I18nConfig {
    /// What: Parse configuration from YAML text.
    ///
    /// Inputs:
    /// - `yaml`: File contents
    ///
    /// Output:
    /// - Parsed config; missing fields take their defaults
    ///
    /// # Errors
    /// - Returns `Err` when the YAML cannot be parsed
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_norway::from_str(yaml).map_err(|e| ConfigError::Yaml(e.to_string()))
    }

    /// What: Load configuration from a file.
    ///
    /// Inputs:
    /// - `path`: Path to `i18n.yml`
    ///
    /// Output:
    /// - Parsed config; a relative `locales_dir` is resolved against the file's directory
    ///
    /// # Errors
    /// - Returns `Err` when the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: Arc::new(e),
        })?;
        let mut config = Self::from_yaml_str(&contents)?;
        if let Some(dir) = config.locales_dir.as_mut()
            && dir.is_relative()
            && let Some(parent) = path.parent()
        {
            *dir = parent.join(&*dir);
        }
        tracing::debug!(
            path = %path.display(),
            default_locale = %config.default_locale,
            locales = config.locales.len(),
            fallbacks = config.fallbacks.len(),
            "Loaded i18n config"
        );
        Ok(config)
    }
}

/// What: Find a config file in development and installed locations.
///
/// Inputs:
/// - `relative_path`: Relative path from config directory (e.g., "i18n.yml")
///
/// Output:
/// - `Some(PathBuf)` pointing to the first existing file found, or `None` if not found
///
/// Details:
/// - Tries locations in order:
///   1. Development location: `CARGO_MANIFEST_DIR/config/{relative_path}`
///   2. Installed location: `/usr/share/loctable/config/{relative_path}`
#[must_use]
pub fn find_config_file(relative_path: &str) -> Option<PathBuf> {
    let dev_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("config")
        .join(relative_path);
    if dev_path.is_file() {
        return Some(dev_path);
    }

    let installed_path = PathBuf::from("/usr/share/loctable/config").join(relative_path);
    if installed_path.is_file() {
        return Some(installed_path);
    }

    None
}

/// What: Find the locales directory in development and installed locations.
///
/// Output:
/// - `Some(PathBuf)` pointing to the first existing locales directory found, or `None`
///
/// Details:
/// - Development location `CARGO_MANIFEST_DIR/config/locales` wins over
///   the installed `/usr/share/loctable/locales`
#[must_use]
pub fn find_locales_dir() -> Option<PathBuf> {
    let dev_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("config")
        .join("locales");
    if dev_path.is_dir() {
        return Some(dev_path);
    }

    let installed_path = PathBuf::from("/usr/share/loctable/locales");
    if installed_path.is_dir() {
        return Some(installed_path);
    }

    None
}
