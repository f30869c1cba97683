//! Active text store with atomic snapshot replacement.
//!
//! The store holds one immutable [`LoadedLocaleSet`] behind an
//! [`ArcSwapOption`]. Readers load the pointer without locking and keep a
//! consistent snapshot for as long as they hold it; writers build a complete
//! new set off to the side and publish it with a single pointer swap.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::i18n::ids::{LocaleId, TextKey, TextTableId};

/// Key -> template entries of one table for one locale.
pub type TextTable = HashMap<TextKey, String>;

/// Every required table for one locale, plus an optional fallback set.
#[derive(Debug, Clone)]
pub struct LoadedLocaleSet {
    locale: LocaleId,
    tables: HashMap<TextTableId, Arc<TextTable>>,
    fallback: Option<Arc<LoadedLocaleSet>>,
}

impl LoadedLocaleSet {
    /// Build a set for `locale` from fully parsed tables, without a fallback.
    #[must_use]
    pub fn new(locale: LocaleId, tables: HashMap<TextTableId, Arc<TextTable>>) -> Self {
        Self {
            locale,
            tables,
            fallback: None,
        }
    }

    /// Attach (or clear) the fallback set consulted for keys this set lacks.
    ///
    /// The fallback's own fallback is dropped so lookups stay single-level.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Option<Arc<Self>>) -> Self {
        self.fallback = fallback.map(|fb| {
            if fb.fallback.is_some() {
                Arc::new(fb.detached())
            } else {
                fb
            }
        });
        self
    }

    /// Copy of this set without its fallback. Tables are shared, not cloned.
    #[must_use]
    pub fn detached(&self) -> Self {
        Self {
            locale: self.locale.clone(),
            tables: self.tables.clone(),
            fallback: None,
        }
    }

    /// Locale every table in this set belongs to.
    #[must_use]
    pub const fn locale(&self) -> &LocaleId {
        &self.locale
    }

    /// Fallback set, if any.
    #[must_use]
    pub fn fallback(&self) -> Option<&Arc<Self>> {
        self.fallback.as_ref()
    }

    /// Table by name, without consulting the fallback.
    #[must_use]
    pub fn table(&self, table: &str) -> Option<&TextTable> {
        self.tables.get(table).map(Arc::as_ref)
    }

    /// Names of every table held by this set.
    pub fn table_ids(&self) -> impl Iterator<Item = &TextTableId> {
        self.tables.keys()
    }

    /// Whether this set holds every table in `required`.
    #[must_use]
    pub fn covers(&self, required: &BTreeSet<TextTableId>) -> bool {
        required.iter().all(|t| self.tables.contains_key(t))
    }

    /// What: Look up a template, consulting the fallback set when needed.
    ///
    /// Inputs:
    /// - `table`: Table name
    /// - `key`: Key inside the table
    ///
    /// Output:
    /// - Template from this set, else from the fallback set, else `None`
    #[must_use]
    pub fn lookup(&self, table: &str, key: &str) -> Option<&str> {
        self.lookup_own(table, key).or_else(|| {
            let fallback = self.fallback.as_deref()?;
            let found = fallback.lookup_own(table, key);
            if found.is_some() {
                tracing::trace!(
                    locale = %self.locale,
                    fallback = %fallback.locale,
                    table,
                    key,
                    "Text key served from fallback locale"
                );
            }
            found
        })
    }

    fn lookup_own(&self, table: &str, key: &str) -> Option<&str> {
        self.tables
            .get(table)
            .and_then(|t| t.get(key))
            .map(String::as_str)
    }
}

/// Holder of the currently visible [`LoadedLocaleSet`].
#[derive(Debug, Default)]
pub struct TextStore {
    active: ArcSwapOption<LoadedLocaleSet>,
}

impl TextStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot. Never blocks; stays consistent while held.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<LoadedLocaleSet>> {
        self.active.load_full()
    }

    /// Whether any set has been installed.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.active.load().is_some()
    }

    /// Locale of the installed set, if any.
    #[must_use]
    pub fn active_locale(&self) -> Option<LocaleId> {
        self.snapshot().map(|s| s.locale.clone())
    }

    /// What: Look up a template in the current snapshot.
    ///
    /// Inputs:
    /// - `table`: Table name
    /// - `key`: Key inside the table
    ///
    /// Output:
    /// - Owned template, or `None` when neither the active nor the fallback set has it
    #[must_use]
    pub fn lookup(&self, table: &str, key: &str) -> Option<String> {
        let guard = self.active.load();
        (*guard)
            .as_ref()
            .and_then(|set| set.lookup(table, key))
            .map(str::to_string)
    }

    /// What: Atomically publish a new active set.
    ///
    /// Inputs:
    /// - `active`: Fully assembled set for the new locale
    /// - `fallback`: Fully assembled fallback set, if the policy has one
    ///
    /// Output:
    /// - The previously visible set
    ///
    /// Details:
    /// - Readers see either the whole previous set or the whole new one
    pub fn replace(
        &self,
        active: LoadedLocaleSet,
        fallback: Option<Arc<LoadedLocaleSet>>,
    ) -> Option<Arc<LoadedLocaleSet>> {
        let next = Arc::new(active.with_fallback(fallback));
        tracing::debug!(
            locale = %next.locale,
            tables = next.tables.len(),
            fallback = ?next.fallback.as_ref().map(|f| f.locale.as_str()),
            "Publishing text set"
        );
        self.active.swap(Some(next))
    }
}
