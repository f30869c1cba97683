//! Catalogs map (locale, table) pairs to loadable addresses.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::i18n::config::I18nConfig;
use crate::i18n::error::IdError;
use crate::i18n::ids::{LocaleId, TextTableId};

/// Knows which locales exist and where each table lives.
pub trait Catalog: Send + Sync {
    /// Supported locales in display order.
    fn supported_locales(&self) -> Vec<LocaleId>;

    /// Tables that must be loaded for every locale.
    fn startup_tables(&self) -> BTreeSet<TextTableId>;

    /// Address of `table` for `locale`, or `None` if the catalog has no entry.
    fn address_for(&self, locale: &LocaleId, table: &TextTableId) -> Option<String>;
}

/// Catalog over a directory laid out as `<root>/<locale>/<table>.json`.
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    root: PathBuf,
    locales: Vec<LocaleId>,
    startup_tables: BTreeSet<TextTableId>,
}

impl DirectoryCatalog {
    /// What: Catalog with an explicit locale list.
    ///
    /// Inputs:
    /// - `root`: Locales directory
    /// - `locales`: Supported locales in display order
    /// - `startup_tables`: Tables every locale must provide
    #[must_use]
    pub fn new(
        root: PathBuf,
        locales: Vec<LocaleId>,
        startup_tables: impl IntoIterator<Item = TextTableId>,
    ) -> Self {
        Self {
            root,
            locales,
            startup_tables: startup_tables.into_iter().collect(),
        }
    }

    /// What: Catalog whose locales are the subdirectories of `root`.
    ///
    /// Inputs:
    /// - `root`: Locales directory
    /// - `startup_tables`: Tables every locale must provide
    ///
    /// Output:
    /// - Catalog listing every subdirectory name as a locale, sorted
    ///
    /// Details:
    /// - An unreadable `root` yields a catalog with no locales (logged)
    #[must_use]
    pub fn discover(root: PathBuf, startup_tables: impl IntoIterator<Item = TextTableId>) -> Self {
        let locales = discover_locales(&root);
        tracing::debug!(
            root = %root.display(),
            locales = locales.len(),
            "Discovered locale directories"
        );
        Self::new(root, locales, startup_tables)
    }

    /// What: Catalog described by `i18n.yml`.
    ///
    /// Inputs:
    /// - `config`: Parsed configuration
    /// - `root`: Locales directory (the config's `locales_dir` or a discovered one)
    ///
    /// Output:
    /// - Catalog using the configured locales, or discovered ones when none are listed
    ///
    /// # Errors
    /// - Returns `Err` when a configured locale or table is blank
    pub fn from_config(config: &I18nConfig, root: PathBuf) -> Result<Self, IdError> {
        let tables = config
            .startup_tables
            .iter()
            .map(|t| TextTableId::new(t.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        if config.locales.is_empty() {
            return Ok(Self::discover(root, tables));
        }
        let locales = config
            .locales
            .iter()
            .map(|l| LocaleId::new(l.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(root, locales, tables))
    }

    /// Locales directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Catalog for DirectoryCatalog {
    fn supported_locales(&self) -> Vec<LocaleId> {
        self.locales.clone()
    }

    fn startup_tables(&self) -> BTreeSet<TextTableId> {
        self.startup_tables.clone()
    }

    fn address_for(&self, locale: &LocaleId, table: &TextTableId) -> Option<String> {
        if !self.locales.contains(locale) {
            return None;
        }
        let path = self
            .root
            .join(locale.as_str())
            .join(format!("{}.json", table.as_str()));
        Some(path.to_string_lossy().into_owned())
    }
}

/// Sorted subdirectory names of `root` that are valid locale codes.
fn discover_locales(root: &Path) -> Vec<LocaleId> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(root = %root.display(), error = %e, "Failed to read locales directory");
            return Vec::new();
        }
    };
    let mut locales: Vec<LocaleId> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .filter(|name| !name.starts_with('.'))
        .filter_map(|name| LocaleId::new(name).ok())
        .collect();
    locales.sort();
    locales
}

/// In-memory catalog whose addresses are `"<locale>/<table>"`.
///
/// Pairs naturally with [`BundleLoader`](crate::i18n::BundleLoader).
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    locales: Vec<LocaleId>,
    startup_tables: BTreeSet<TextTableId>,
}

impl StaticCatalog {
    /// Catalog over `locales` requiring `startup_tables`.
    #[must_use]
    pub fn new(
        locales: impl IntoIterator<Item = LocaleId>,
        startup_tables: impl IntoIterator<Item = TextTableId>,
    ) -> Self {
        Self {
            locales: locales.into_iter().collect(),
            startup_tables: startup_tables.into_iter().collect(),
        }
    }

    /// Address used for (`locale`, `table`).
    #[must_use]
    pub fn address(locale: &str, table: &str) -> String {
        format!("{locale}/{table}")
    }
}

impl Catalog for StaticCatalog {
    fn supported_locales(&self) -> Vec<LocaleId> {
        self.locales.clone()
    }

    fn startup_tables(&self) -> BTreeSet<TextTableId> {
        self.startup_tables.clone()
    }

    fn address_for(&self, locale: &LocaleId, table: &TextTableId) -> Option<String> {
        self.locales
            .contains(locale)
            .then(|| Self::address(locale.as_str(), table.as_str()))
    }
}
