//! Persistence of the last selected locale.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use futures::future::BoxFuture;

use crate::i18n::ids::LocaleId;
use crate::util::config::{read_key, upsert_key};

/// Settings key under which the locale is stored.
const LOCALE_KEY: &str = "locale";

/// Storage for the user's last selected locale.
pub trait LocalePersistence: Send + Sync {
    /// What: Read the saved locale.
    ///
    /// Output:
    /// - `Ok(None)` when nothing, an empty or a whitespace-only value is stored
    ///
    /// # Errors
    /// - Returns `Err` when the backing storage cannot be read
    fn load(&self) -> BoxFuture<'_, io::Result<Option<LocaleId>>>;

    /// What: Save `locale` as the last selected locale.
    ///
    /// # Errors
    /// - Returns `Err` when the backing storage cannot be written
    fn save<'a>(&'a self, locale: &'a LocaleId) -> BoxFuture<'a, io::Result<()>>;
}

/// Stores the locale as a `locale = <code>` line in a settings file.
///
/// Other lines in the file are preserved on save.
#[derive(Debug, Clone)]
pub struct SettingsFileStore {
    path: PathBuf,
}

impl SettingsFileStore {
    /// Store backed by the settings file at `path`.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store backed by the default settings file in the user config directory.
    #[must_use]
    pub fn default_location() -> Self {
        Self::new(crate::util::settings_path())
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LocalePersistence for SettingsFileStore {
    fn load(&self) -> BoxFuture<'_, io::Result<Option<LocaleId>>> {
        Box::pin(async move {
            let contents = match tokio::fs::read_to_string(&self.path).await {
                Ok(contents) => contents,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(e),
            };
            Ok(read_key(&contents, LOCALE_KEY).and_then(|v| LocaleId::new(v).ok()))
        })
    }

    fn save<'a>(&'a self, locale: &'a LocaleId) -> BoxFuture<'a, io::Result<()>> {
        Box::pin(async move {
            let existing = match tokio::fs::read_to_string(&self.path).await {
                Ok(contents) => contents,
                Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
                Err(e) => return Err(e),
            };
            if let Some(parent) = self.path.parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent).await?;
            }
            let updated = upsert_key(&existing, LOCALE_KEY, locale.as_str());
            tokio::fs::write(&self.path, updated).await?;
            tracing::debug!(
                path = %self.path.display(),
                locale = %locale,
                "[Persist] Locale saved"
            );
            Ok(())
        })
    }
}

/// Keeps the locale in memory only; useful for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryLocaleStore {
    value: Mutex<Option<String>>,
}

impl MemoryLocaleStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a raw value (not validated).
    #[must_use]
    pub fn with_saved(raw: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(raw.into())),
        }
    }

    /// Raw stored value.
    #[must_use]
    pub fn saved(&self) -> Option<String> {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LocalePersistence for MemoryLocaleStore {
    fn load(&self) -> BoxFuture<'_, io::Result<Option<LocaleId>>> {
        let value = self.saved().and_then(|v| LocaleId::new(v).ok());
        Box::pin(async move { Ok(value) })
    }

    fn save<'a>(&'a self, locale: &'a LocaleId) -> BoxFuture<'a, io::Result<()>> {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(locale.to_string());
        Box::pin(async { Ok(()) })
    }
}
